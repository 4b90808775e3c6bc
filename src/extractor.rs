//! Field extraction from raw OCR text.
//!
//! Extraction is best effort: a field that cannot be found is absent, never
//! an error. Labels are not anchored to word boundaries, so a label embedded
//! in other text (e.g. "curren**t motor**") is matched as well. This is an
//! accepted imprecision of the pattern parser.

use regex::Regex;
use tracing::debug;

use crate::errors::RecorderError;
use crate::models::{Field, MotorFields};

/// Strategy turning OCR text into a sparse set of fields
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, text: &str) -> MotorFields;
}

/// Case-insensitive `label [:=] number` matcher, first match wins
pub struct PatternExtractor {
    patterns: Vec<(Field, Regex)>,
}

impl PatternExtractor {
    pub fn new() -> Result<Self, RecorderError> {
        let mut patterns = Vec::with_capacity(Field::ALL.len());
        for field in Field::ALL {
            patterns.push((field, Regex::new(&Self::pattern_for(field))?));
        }
        Ok(Self { patterns })
    }

    /// Words of the label may be separated by any whitespace, OCR often
    /// drops or doubles spaces.
    fn pattern_for(field: Field) -> String {
        let label = field
            .label()
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s*");
        format!(r"(?i){label}\s*[:=]?\s*(\d+\.?\d*)")
    }
}

impl FieldExtractor for PatternExtractor {
    fn extract(&self, text: &str) -> MotorFields {
        let mut fields = MotorFields::default();
        for (field, regex) in &self.patterns {
            let value = regex
                .captures(text)
                .and_then(|captures| captures.get(1))
                .and_then(|capture| capture.as_str().parse::<f64>().ok());
            if value.is_none() {
                debug!(field = %field, "No value found");
            }
            fields.set(*field, value);
        }
        fields
    }
}
