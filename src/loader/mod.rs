//! Flow table loading and normalization.
//!
//! This module reads the census flow CSV and returns a fresh, trimmed
//! sequence of [`FlowRecord`]s. The aggregator never sees raw rows.

use crate::config::DataConfig;
use crate::error::FlowError;
use crate::models::FlowRecord;
use csv::{ByteRecord, ReaderBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Positions of the required columns in the header row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    origin: usize,
    destination: usize,
    population: usize,
}

impl ColumnIndex {
    fn resolve(headers: &ByteRecord, config: &DataConfig) -> Result<Self, FlowError> {
        let names: Vec<String> = headers.iter().map(|h| decode(h).trim().to_string()).collect();

        let find = |column: &str| {
            names
                .iter()
                .position(|name| name == column)
                .ok_or_else(|| FlowError::MissingColumn {
                    column: column.to_string(),
                })
        };

        Ok(Self {
            origin: find(&config.origin_column)?,
            destination: find(&config.destination_column)?,
            population: find(&config.population_column)?,
        })
    }
}

/// Load and normalize the flow table at `path`.
pub fn load_flows(
    path: &Path,
    config: &DataConfig,
    show_progress: bool,
) -> Result<Vec<FlowRecord>, FlowError> {
    info!("Loading flows from: {}", path.display());

    let spinner = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Reading {}", path.display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = File::open(path)
        .map_err(FlowError::from)
        .and_then(|file| read_flows(file, config));

    if let Some(pb) = spinner {
        match &result {
            Ok(records) => pb.finish_with_message(format!("Loaded {} flow records", records.len())),
            Err(_) => pb.finish_and_clear(),
        }
    }

    result
}

/// Read and normalize flow records from any reader.
///
/// Text columns are trimmed and populations parsed. Rows with an empty or
/// non-numeric population are kept and marked with their line number;
/// the aggregator rejects them for their own zone only.
pub fn read_flows<R: Read>(reader: R, config: &DataConfig) -> Result<Vec<FlowRecord>, FlowError> {
    let delimiter = delimiter_byte(config.delimiter)?;

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let columns = ColumnIndex::resolve(csv_reader.byte_headers()?, config)?;
    debug!("Resolved columns: {:?}", columns);

    let mut records = Vec::new();
    let mut row = ByteRecord::new();

    while csv_reader.read_byte_record(&mut row)? {
        let line = row
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(records.len() + 2);

        let field = |i: usize| row.get(i).map(decode).unwrap_or(Cow::Borrowed(""));

        let origin_zone = field(columns.origin).trim().to_string();
        let destination_region = field(columns.destination).trim().to_string();
        let raw_population = field(columns.population);

        let record = match parse_population(&raw_population) {
            Some(population) => FlowRecord::new(origin_zone, destination_region, population),
            None => {
                warn!(
                    "Row {} ('{}'): non-numeric population '{}'",
                    line,
                    origin_zone,
                    raw_population.trim()
                );
                FlowRecord::with_invalid_population(
                    origin_zone,
                    destination_region,
                    line,
                    raw_population.trim(),
                )
            }
        };
        records.push(record);
    }

    debug!("Read {} flow records", records.len());
    Ok(records)
}

/// Parse a population cell.
///
/// Accepts integers and integral decimals such as `"120.0"`, which
/// spreadsheet exports often produce.
pub fn parse_population(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }

    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn delimiter_byte(delimiter: char) -> Result<u8, FlowError> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(FlowError::InvalidInput(format!(
            "delimiter '{}' must be a single ASCII character",
            delimiter
        )))
    }
}

/// Census exports are not always valid UTF-8; decode lossily.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "macrozona_origen;depart_destino;pob_c\n\
                          Macrozona Norte ; Piura ;120\n\
                          Macrozona Norte;Tumbes;  35\n\
                          Macrozona Sur;Arequipa;400.0\n";

    #[test]
    fn test_read_and_trim() {
        let records = read_flows(SAMPLE.as_bytes(), &DataConfig::default()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], FlowRecord::new("Macrozona Norte", "Piura", 120));
        assert_eq!(records[1].employed_population, 35);
        assert_eq!(records[2], FlowRecord::new("Macrozona Sur", "Arequipa", 400));
    }

    #[test]
    fn test_extra_columns_and_order() {
        let csv = "id;pob_c;depart_destino;macrozona_origen;extra\n1;10;Lima;Lima - Callao;x\n";
        let records = read_flows(csv.as_bytes(), &DataConfig::default()).unwrap();

        assert_eq!(records, vec![FlowRecord::new("Lima - Callao", "Lima", 10)]);
    }

    #[test]
    fn test_missing_column() {
        let csv = "macrozona_origen;depart_destino;poblacion\nX;A;1\n";
        let err = read_flows(csv.as_bytes(), &DataConfig::default()).unwrap_err();

        assert!(err.is_invalid_input());
        assert!(matches!(err, FlowError::MissingColumn { ref column } if column == "pob_c"));
    }

    #[test]
    fn test_non_numeric_population_is_marked() {
        let csv = "macrozona_origen;depart_destino;pob_c\nX;A;1\nY;B; abc \nX;C;\n";
        let records = read_flows(csv.as_bytes(), &DataConfig::default()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], FlowRecord::new("X", "A", 1));
        assert_eq!(records[1], FlowRecord::with_invalid_population("Y", "B", 3, "abc"));
        assert_eq!(records[2], FlowRecord::with_invalid_population("X", "C", 4, ""));
    }

    #[test]
    fn test_negative_population_passes_through() {
        let csv = "macrozona_origen;depart_destino;pob_c\nX;A;-5\n";
        let records = read_flows(csv.as_bytes(), &DataConfig::default()).unwrap();
        assert_eq!(records[0].employed_population, -5);
    }

    #[test]
    fn test_custom_delimiter_and_columns() {
        let config = DataConfig {
            delimiter: ',',
            origin_column: "from".to_string(),
            destination_column: "to".to_string(),
            population_column: "n".to_string(),
            ..DataConfig::default()
        };
        let csv = "from,to,n\nX,A,7\n";
        let records = read_flows(csv.as_bytes(), &config).unwrap();
        assert_eq!(records, vec![FlowRecord::new("X", "A", 7)]);
    }

    #[test]
    fn test_parse_population() {
        assert_eq!(parse_population("42"), Some(42));
        assert_eq!(parse_population(" 42 "), Some(42));
        assert_eq!(parse_population("42.0"), Some(42));
        assert_eq!(parse_population("-3"), Some(-3));
        assert_eq!(parse_population("42.5"), None);
        assert_eq!(parse_population(""), None);
        assert_eq!(parse_population("NaN"), None);
        assert_eq!(parse_population("doce"), None);
    }

    #[test]
    fn test_load_fixture_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/flujos_muestra.csv");
        let records = load_flows(&path, &DataConfig::default(), false).unwrap();

        assert!(!records.is_empty());
        assert!(records
            .iter()
            .all(|r| r.origin_zone == r.origin_zone.trim()
                && r.destination_region == r.destination_region.trim()));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_flows(&dir.path().join("nope.csv"), &DataConfig::default(), false)
            .unwrap_err();
        assert!(matches!(err, FlowError::Io(_)));
    }
}
