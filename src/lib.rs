//! Motor-controller telemetry recorder
//!
//! Photographed controller screens are OCR-scanned for labelled values, the
//! values are reviewed by a person and then committed together with the
//! image. Committed readings can be exported as a table.

pub mod artifacts;
pub mod commit;
pub mod config;
pub mod database;
pub mod errors;
pub mod export;
pub mod extractor;
pub mod metrics;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod server;
pub mod staging;
