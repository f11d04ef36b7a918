//! # Pulse Analytics
//!
//! Pure metric computations over event rows already in the store. Nothing
//! here performs I/O; callers load rows and pass them in.
//!
//! Every rate is a fraction in `[0, 1]` and is `0` when its denominator is
//! zero.

pub mod breakdown;
pub mod frustration;
pub mod guide;
pub mod report;
pub mod rows;
pub mod series;

pub use breakdown::{device_breakdown, geographic_breakdown, UNKNOWN_COUNTRY};
pub use frustration::frustration_metrics;
pub use guide::{guide_metrics, step_funnel};
pub use report::{frustration_report, guide_report};
pub use rows::EventRow;
pub use series::daily_series;

/// `numerator / denominator` clamped to `[0, 1]`, zero for an empty denominator
pub(crate) fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::rate;

    #[test]
    fn test_rate_bounds() {
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(5, 0), 0.0);
        assert_eq!(rate(1, 4), 0.25);
        assert_eq!(rate(9, 3), 1.0);
    }
}
