//! Tabular export of committed readings

use tracing::info;

use crate::errors::RecorderError;
use crate::models::Reading;

/// Downloadable snapshot of the readings table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns ordered readings into a file
pub trait TableExporter: Send + Sync {
    fn export(&self, readings: &[Reading]) -> Result<ExportFile, RecorderError>;
}

/// Comma separated values with a header row; absent values are empty cells
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExporter;

impl TableExporter for CsvExporter {
    fn export(&self, readings: &[Reading]) -> Result<ExportFile, RecorderError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if readings.is_empty() {
            writer.write_record(COLUMNS)?;
        }
        for reading in readings {
            writer.serialize(reading)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| RecorderError::IoError(e.into_error()))?;

        info!(rows = readings.len(), "Exported readings");
        Ok(ExportFile {
            file_name: "data.csv".to_string(),
            content_type: "text/csv",
            bytes,
        })
    }
}

/// Header used when there are no rows to derive it from
const COLUMNS: [&str; 14] = [
    "id",
    "motor_name",
    "captured_at",
    "power",
    "duty",
    "erpm",
    "i_batt",
    "i_motor",
    "t_fet",
    "t_motor",
    "volts_in",
    "normal_erpm",
    "rpm_48v",
    "image_url",
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(id: i64, motor: &str, power: Option<f64>) -> Reading {
        Reading {
            id,
            motor_name: motor.to_string(),
            captured_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            power,
            duty: None,
            erpm: Some(700.0),
            i_batt: None,
            i_motor: None,
            t_fet: None,
            t_motor: None,
            volts_in: Some(10.0),
            normal_erpm: Some(100.0),
            rpm_48v: Some(480.0),
            image_url: format!("/uploads/{motor}.png"),
        }
    }

    #[test]
    fn writes_header_and_rows_in_order() {
        let file = CsvExporter
            .export(&[reading(1, "M1", Some(120.0)), reading(2, "M2", None)])
            .unwrap();
        let text = String::from_utf8(file.bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], COLUMNS.join(","));
        assert!(lines[1].starts_with("1,M1,2024-05-01T12:00:00Z,120.0,,700.0,"));
        assert!(lines[2].starts_with("2,M2,"));
        assert!(lines[2].ends_with(",/uploads/M2.png"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_table_has_header_only() {
        let file = CsvExporter.export(&[]).unwrap();
        let text = String::from_utf8(file.bytes).unwrap();
        assert_eq!(text.trim_end(), COLUMNS.join(","));
        assert_eq!(file.content_type, "text/csv");
    }
}
