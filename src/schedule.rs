//! Static timetable source: a semicolon-delimited CSV with a header row
//! (the `uptu_pasada_circular` open dataset). Rows are filtered by exact
//! integer match on the `cod_variante` column.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// One timetable row for a line variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScheduleEntry {
    pub tipo_dia: i64,
    pub cod_variante: i64,
    pub frecuencia: i64,
    pub cod_ubic_parada: i64,
    pub ordinal: i64,
    /// Departure time encoded as HHMM.
    pub hora: i64,
    /// "S" when the trip belongs to the previous service day.
    pub dia_anterior: String,
}

/// Loads the timetable rows of one variant from the schedule file.
pub fn schedules_for_variant(
    path: &Path,
    variant: i64,
) -> Result<Vec<ScheduleEntry>, ScheduleError> {
    let file = std::fs::File::open(path)?;
    read_schedules(file, variant)
}

fn read_schedules<R: Read>(reader: R, variant: i64) -> Result<Vec<ScheduleEntry>, ScheduleError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(reader);

    let mut entries = Vec::new();
    for record in rdr.deserialize::<ScheduleEntry>() {
        let entry = record?;
        if entry.cod_variante == variant {
            entries.push(entry);
        }
    }
    Ok(entries)
}
