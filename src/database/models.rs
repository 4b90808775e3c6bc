// src/database/models.rs
use chrono::{DateTime, Utc};

use crate::models::Reading;

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ReadingRow {
    id: i64,
    motor_name: String,
    date_time: DateTime<Utc>,
    power: Option<f64>,
    duty: Option<f64>,
    erpm: Option<f64>,
    i_batt: Option<f64>,
    i_motor: Option<f64>,
    t_fet: Option<f64>,
    t_motor: Option<f64>,
    volts_in: Option<f64>,
    normal_erpm: Option<f64>,
    rpm_48v: Option<f64>,
    image_url: String,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Reading {
            id: row.id,
            motor_name: row.motor_name,
            captured_at: row.date_time,
            power: row.power,
            duty: row.duty,
            erpm: row.erpm,
            i_batt: row.i_batt,
            i_motor: row.i_motor,
            t_fet: row.t_fet,
            t_motor: row.t_motor,
            volts_in: row.volts_in,
            normal_erpm: row.normal_erpm,
            rpm_48v: row.rpm_48v,
            image_url: row.image_url,
        }
    }
}
