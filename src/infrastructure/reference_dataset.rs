// CSV reference dataset (historical readings per location)
use crate::application::flow_repository::ReferenceRepository;
use crate::domain::analytics::HistoricalRecord;
use crate::domain::error::DatasetError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;

/// Day comes before month in every accepted layout except ISO.
const TIMESTAMP_FORMATS: [&str; 7] = [
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"];

/// Blank or non-numeric cells read as `None` instead of failing the row.
#[derive(Debug, Deserialize)]
struct ReferenceRow {
    location_name: String,
    timestamp: String,
    #[serde(rename = "currentSpeed", deserialize_with = "csv::invalid_option")]
    current_speed: Option<f64>,
    #[serde(rename = "currentTravelTime", deserialize_with = "csv::invalid_option")]
    current_travel_time: Option<f64>,
    #[serde(rename = "freeFlowTravelTime", deserialize_with = "csv::invalid_option")]
    free_flow_travel_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LocationRow {
    location_name: String,
}

#[derive(Debug, Clone)]
pub struct CsvReferenceRepository {
    path: PathBuf,
}

impl CsvReferenceRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CsvReferenceRepository {
    fn open(&self) -> Result<std::fs::File, DatasetError> {
        std::fs::File::open(&self.path).map_err(|source| DatasetError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl ReferenceRepository for CsvReferenceRepository {
    fn load_records(&self) -> Result<Vec<HistoricalRecord>, DatasetError> {
        let records = read_records(self.open()?)?;
        tracing::debug!("Read {} reference rows from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn load_location_names(&self) -> Result<Vec<String>, DatasetError> {
        read_location_names(self.open()?)
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader)
}

/// Every non-empty `location_name`, in file order, duplicates included.
pub fn read_location_names<R: Read>(reader: R) -> Result<Vec<String>, DatasetError> {
    let mut names = Vec::new();
    for result in csv_reader(reader).deserialize() {
        let row: LocationRow = result?;
        if !row.location_name.is_empty() {
            names.push(row.location_name);
        }
    }
    Ok(names)
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<HistoricalRecord>, DatasetError> {
    let mut rdr = csv_reader(reader);

    let mut records = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        let row: ReferenceRow = result?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| DatasetError::Timestamp {
            row: i + 1,
            value: row.timestamp.clone(),
        })?;
        records.push(HistoricalRecord {
            location_name: row.location_name,
            timestamp,
            current_speed: row.current_speed,
            current_travel_time: row.current_travel_time,
            free_flow_travel_time: row.free_flow_travel_time,
        });
    }
    Ok(records)
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
