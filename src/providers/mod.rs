pub mod montevideo;
pub mod orion;
