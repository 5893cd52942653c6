// src/utils/stats.rs

/// Median of the samples, sorting them in place.
///
/// Even-sized samples average the two middle values. Returns `None` for
/// an empty slice. Callers are expected to have dropped NaNs already.
pub fn median_in_place(samples: &mut [f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable_by(f64::total_cmp);

    let mid = samples.len() / 2;
    if samples.len() % 2 == 0 {
        Some((samples[mid - 1] + samples[mid]) / 2.0)
    } else {
        Some(samples[mid])
    }
}
