//! Sample-size policy.
//!
//! Tiered targets bound scan cost on huge tables while taking small tables
//! whole; the percentage helper keeps every `TABLESAMPLE (p PERCENT)` clause
//! inside the range all dialects accept.

/// Smallest percentage ever emitted
pub const MIN_SAMPLE_PERCENTAGE: f64 = 0.01;

/// Largest percentage ever emitted
pub const MAX_SAMPLE_PERCENTAGE: f64 = 100.0;

/// Percentage of `total_rows` needed to obtain `desired_rows`.
///
/// Returns 100 for an empty (or unknown) table, otherwise the ratio clamped
/// to `[0.01, 100]`.
///
/// # Example
/// ```rust
/// use dbscout_core::sampling::sizing::calculate_sample_percentage;
///
/// assert_eq!(calculate_sample_percentage(100, 0), 100.0);
/// assert_eq!(calculate_sample_percentage(1_000, 10_000), 10.0);
/// assert_eq!(calculate_sample_percentage(1, u64::MAX), 0.01);
/// ```
pub fn calculate_sample_percentage(desired_rows: u64, total_rows: u64) -> f64 {
    if total_rows == 0 {
        return MAX_SAMPLE_PERCENTAGE;
    }
    let percentage = desired_rows as f64 / total_rows as f64 * 100.0;
    percentage.clamp(MIN_SAMPLE_PERCENTAGE, MAX_SAMPLE_PERCENTAGE)
}

/// Target sample size for a table of `total_rows` rows.
///
/// | rows | target |
/// |---|---|
/// | 0 | 1 |
/// | ≤ 100,000 | all rows |
/// | ≤ 1,000,000 | 100,000 |
/// | ≤ 10,000,000 | 250,000 |
/// | larger | 500,000 |
pub fn get_dynamic_sample_size(total_rows: u64) -> u64 {
    match total_rows {
        0 => 1,
        1..=100_000 => total_rows,
        100_001..=1_000_000 => 100_000,
        1_000_001..=10_000_000 => 250_000,
        _ => 500_000,
    }
}
