//! Derived motor metrics

use crate::models::DerivedMetrics;

/// Pole count used to turn electrical RPM into mechanical RPM
pub const POLES: u32 = 7;

/// Reference pack voltage `rpm_48v` is scaled to
pub const REFERENCE_VOLTS: f64 = 48.0;

/// Relative tolerance when comparing submitted derived values
const TOLERANCE: f64 = 1e-6;

/// Compute derived metrics with the fixed pole count
pub fn derive(erpm: Option<f64>, volts_in: Option<f64>) -> DerivedMetrics {
    derive_with_poles(erpm, volts_in, POLES)
}

/// - `normal_erpm = erpm / poles`
/// - `rpm_48v = erpm / poles / volts_in * 48`, absent when `volts_in` is zero
pub fn derive_with_poles(erpm: Option<f64>, volts_in: Option<f64>, poles: u32) -> DerivedMetrics {
    let normal_erpm = erpm.map(|erpm| erpm / f64::from(poles));
    let rpm_48v = match (normal_erpm, volts_in) {
        (Some(normal), Some(volts)) if volts != 0.0 => Some(normal / volts * REFERENCE_VOLTS),
        _ => None,
    };
    DerivedMetrics {
        normal_erpm,
        rpm_48v,
    }
}

impl DerivedMetrics {
    /// Whether submitted values agree with these; absent submitted values are ignored
    pub fn agrees_with(&self, submitted: &DerivedMetrics) -> bool {
        fn close(expected: Option<f64>, submitted: Option<f64>) -> bool {
            match (expected, submitted) {
                (_, None) => true,
                (Some(a), Some(b)) => (a - b).abs() <= TOLERANCE * a.abs().max(1.0),
                (None, Some(_)) => false,
            }
        }
        close(self.normal_erpm, submitted.normal_erpm) && close(self.rpm_48v, submitted.rpm_48v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_both_metrics() {
        let derived = derive(Some(700.0), Some(10.0));
        assert_eq!(derived.normal_erpm, Some(100.0));
        assert_eq!(derived.rpm_48v, Some(480.0));
    }

    #[test]
    fn zero_volts_leaves_rpm_48v_absent() {
        let derived = derive(Some(700.0), Some(0.0));
        assert_eq!(derived.normal_erpm, Some(100.0));
        assert_eq!(derived.rpm_48v, None);
    }

    #[test]
    fn missing_erpm_leaves_both_absent() {
        assert_eq!(derive(None, Some(10.0)), DerivedMetrics::default());
    }

    #[test]
    fn missing_volts_keeps_normal_erpm() {
        let derived = derive(Some(70.0), None);
        assert_eq!(derived.normal_erpm, Some(10.0));
        assert_eq!(derived.rpm_48v, None);
    }

    #[test]
    fn zero_erpm_is_a_value() {
        let derived = derive(Some(0.0), Some(48.0));
        assert_eq!(derived.normal_erpm, Some(0.0));
        assert_eq!(derived.rpm_48v, Some(0.0));
    }

    #[test]
    fn at_reference_voltage_rpm_48v_equals_normal_erpm() {
        let derived = derive(Some(50000.0), Some(48.0));
        let normal = derived.normal_erpm.unwrap();
        assert!((normal - 7142.857).abs() < 1e-3);
        assert!((derived.rpm_48v.unwrap() - normal).abs() < 1e-9);
    }

    #[test]
    fn custom_pole_count() {
        let derived = derive_with_poles(Some(1400.0), Some(25.0), 14);
        assert_eq!(derived.normal_erpm, Some(100.0));
        assert_eq!(derived.rpm_48v, Some(192.0));
    }

    #[test]
    fn agreement_check() {
        let derived = derive(Some(700.0), Some(10.0));
        assert!(derived.agrees_with(&DerivedMetrics::default()));
        assert!(derived.agrees_with(&DerivedMetrics {
            normal_erpm: Some(100.0),
            rpm_48v: Some(480.0),
        }));
        assert!(!derived.agrees_with(&DerivedMetrics {
            normal_erpm: Some(101.0),
            rpm_48v: None,
        }));
        assert!(!derive(None, None).agrees_with(&DerivedMetrics {
            normal_erpm: Some(1.0),
            rpm_48v: None,
        }));
    }
}
