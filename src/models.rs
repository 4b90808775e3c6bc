//! Data models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telemetry field printed on a motor-controller screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Power,
    Duty,
    Erpm,
    IBatt,
    IMotor,
    TFet,
    TMotor,
    VoltsIn,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Power,
        Field::Duty,
        Field::Erpm,
        Field::IBatt,
        Field::IMotor,
        Field::TFet,
        Field::TMotor,
        Field::VoltsIn,
    ];

    /// Label as it appears on the controller screen
    pub fn label(&self) -> &'static str {
        match self {
            Field::Power => "power",
            Field::Duty => "duty",
            Field::Erpm => "erpm",
            Field::IBatt => "i batt",
            Field::IMotor => "i motor",
            Field::TFet => "t fet",
            Field::TMotor => "t motor",
            Field::VoltsIn => "volts in",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The eight fields read from a screen, each absent when not found
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorFields {
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub duty: Option<f64>,
    #[serde(default)]
    pub erpm: Option<f64>,
    #[serde(default)]
    pub i_batt: Option<f64>,
    #[serde(default)]
    pub i_motor: Option<f64>,
    #[serde(default)]
    pub t_fet: Option<f64>,
    #[serde(default)]
    pub t_motor: Option<f64>,
    #[serde(default)]
    pub volts_in: Option<f64>,
}

impl MotorFields {
    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Power => self.power,
            Field::Duty => self.duty,
            Field::Erpm => self.erpm,
            Field::IBatt => self.i_batt,
            Field::IMotor => self.i_motor,
            Field::TFet => self.t_fet,
            Field::TMotor => self.t_motor,
            Field::VoltsIn => self.volts_in,
        }
    }

    pub fn set(&mut self, field: Field, value: Option<f64>) {
        let slot = match field {
            Field::Power => &mut self.power,
            Field::Duty => &mut self.duty,
            Field::Erpm => &mut self.erpm,
            Field::IBatt => &mut self.i_batt,
            Field::IMotor => &mut self.i_motor,
            Field::TFet => &mut self.t_fet,
            Field::TMotor => &mut self.t_motor,
            Field::VoltsIn => &mut self.volts_in,
        };
        *slot = value;
    }

    /// Number of fields holding a value
    pub fn present_count(&self) -> usize {
        Field::ALL
            .iter()
            .filter(|field| self.get(**field).is_some())
            .count()
    }
}

/// Metrics computed from `erpm` and `volts_in`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    #[serde(default)]
    pub normal_erpm: Option<f64>,
    #[serde(default, rename = "rpm48v")]
    pub rpm_48v: Option<f64>,
}

/// Opaque handle to an uploaded image awaiting commit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagingToken(String);

impl StagingToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StagingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Committed image: file name inside the artifact directory and its public URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub file_name: String,
    pub url: String,
}

/// Result of the extraction entry point, returned for human review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    pub motor_name: String,
    #[serde(flatten)]
    pub fields: MotorFields,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
    pub staging_token: StagingToken,
}

/// Reviewed values submitted to the commit entry point
///
/// Derived values are optional and only checked against the recomputed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub motor_name: String,
    #[serde(flatten)]
    pub fields: MotorFields,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
    pub staging_token: StagingToken,
}

/// Reading about to be inserted; the repository assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub motor_name: String,
    pub captured_at: DateTime<Utc>,
    pub fields: MotorFields,
    pub derived: DerivedMetrics,
    pub image_url: String,
}

/// Committed telemetry reading
///
/// Flat on purpose: the export writes one column per attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub motor_name: String,
    pub captured_at: DateTime<Utc>,
    pub power: Option<f64>,
    pub duty: Option<f64>,
    pub erpm: Option<f64>,
    pub i_batt: Option<f64>,
    pub i_motor: Option<f64>,
    pub t_fet: Option<f64>,
    pub t_motor: Option<f64>,
    pub volts_in: Option<f64>,
    pub normal_erpm: Option<f64>,
    pub rpm_48v: Option<f64>,
    pub image_url: String,
}

impl Reading {
    pub fn from_new(id: i64, new: NewReading) -> Self {
        let NewReading {
            motor_name,
            captured_at,
            fields,
            derived,
            image_url,
        } = new;
        Self {
            id,
            motor_name,
            captured_at,
            power: fields.power,
            duty: fields.duty,
            erpm: fields.erpm,
            i_batt: fields.i_batt,
            i_motor: fields.i_motor,
            t_fet: fields.t_fet,
            t_motor: fields.t_motor,
            volts_in: fields.volts_in,
            normal_erpm: derived.normal_erpm,
            rpm_48v: derived.rpm_48v,
            image_url,
        }
    }

    pub fn fields(&self) -> MotorFields {
        MotorFields {
            power: self.power,
            duty: self.duty,
            erpm: self.erpm,
            i_batt: self.i_batt,
            i_motor: self.i_motor,
            t_fet: self.t_fet,
            t_motor: self.t_motor,
            volts_in: self.volts_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_get_set_cover_every_field() {
        let mut fields = MotorFields::default();
        for (i, field) in Field::ALL.iter().enumerate() {
            fields.set(*field, Some(i as f64));
        }
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(fields.get(*field), Some(i as f64));
        }
        assert_eq!(fields.present_count(), 8);
    }

    #[test]
    fn commit_request_accepts_flat_camel_case_json() {
        let payload = r#"{
            "motorName": "M1",
            "power": 120,
            "iBatt": 3.5,
            "voltsIn": 48,
            "rpm48v": 7142.857,
            "stagingToken": "temp_abc_screen.png"
        }"#;

        let request: CommitRequest = serde_json::from_str(payload).unwrap();
        assert_eq!(request.motor_name, "M1");
        assert_eq!(request.fields.power, Some(120.0));
        assert_eq!(request.fields.i_batt, Some(3.5));
        assert_eq!(request.fields.erpm, None);
        assert_eq!(request.derived.rpm_48v, Some(7142.857));
        assert_eq!(request.derived.normal_erpm, None);
        assert_eq!(request.staging_token.as_str(), "temp_abc_screen.png");
    }

    #[test]
    fn extraction_outcome_serializes_absent_fields_as_null() {
        let outcome = ExtractionOutcome {
            motor_name: "M1".to_string(),
            fields: MotorFields {
                power: Some(42.5),
                ..Default::default()
            },
            derived: DerivedMetrics::default(),
            staging_token: StagingToken::new("temp_x_a.png"),
        };

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["power"], 42.5);
        assert!(value["tFet"].is_null());
        assert!(value["rpm48v"].is_null());
        assert_eq!(value["stagingToken"], "temp_x_a.png");
    }
}
