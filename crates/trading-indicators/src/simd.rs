//! SIMD window kernels shared by the indicators.
//!
//! These use the `wide` crate for portable SIMD. Every windowed kernel
//! returns a vector aligned with its input, zero before the window fills.

use wide::f64x4;

/// SIMD-optimized sum of a slice.
pub fn sum_simd(data: &[f64]) -> f64 {
    let chunks = data.len() / 4;
    let mut simd_sum = f64x4::splat(0.0);

    for i in 0..chunks {
        let idx = i * 4;
        let values = f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
        simd_sum += values;
    }

    let mut result = simd_sum.reduce_add();

    // Handle remaining elements
    for &value in &data[(chunks * 4)..] {
        result += value;
    }

    result
}

/// Rolling arithmetic mean over `period` points.
pub fn rolling_mean(data: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![0.0; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    let period_f64 = period as f64;
    let mut sum = sum_simd(&data[..period]);
    result[period - 1] = sum / period_f64;

    // Sliding window
    for i in period..data.len() {
        sum = sum - data[i - period] + data[i];
        result[i] = sum / period_f64;
    }

    result
}

/// Rolling population standard deviation around precomputed window means.
///
/// `means[i]` must be the mean of the window ending at `i`.
pub fn rolling_std_dev(data: &[f64], means: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![0.0; data.len()];
    if period == 0 || data.len() < period || means.len() != data.len() {
        return result;
    }

    let period_f64 = period as f64;
    let chunks = period / 4;

    for end in (period - 1)..data.len() {
        let window = &data[end + 1 - period..=end];
        let mean = means[end];
        let mean_vec = f64x4::splat(mean);

        // SIMD sum of squared differences
        let mut sum_sq = 0.0;
        for i in 0..chunks {
            let idx = i * 4;
            let values = f64x4::new([
                window[idx],
                window[idx + 1],
                window[idx + 2],
                window[idx + 3],
            ]);
            let diff = values - mean_vec;
            sum_sq += (diff * diff).reduce_add();
        }

        for &value in &window[(chunks * 4)..] {
            let diff = value - mean;
            sum_sq += diff * diff;
        }

        result[end] = (sum_sq / period_f64).sqrt();
    }

    result
}

/// Split period-over-period changes into gains and loss magnitudes.
///
/// Both outputs have `data.len() - 1` entries.
pub fn gains_losses(data: &[f64]) -> (Vec<f64>, Vec<f64>) {
    if data.len() < 2 {
        return (Vec::new(), Vec::new());
    }

    let n = data.len() - 1;
    let mut gains = Vec::with_capacity(n);
    let mut losses = Vec::with_capacity(n);

    let chunks = n / 4;
    let zero = f64x4::splat(0.0);

    for i in 0..chunks {
        let idx = i * 4;
        let prev = f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
        let curr = f64x4::new([
            data[idx + 1],
            data[idx + 2],
            data[idx + 3],
            data[idx + 4],
        ]);

        let diff = curr - prev;
        gains.extend(diff.max(zero).to_array());
        losses.extend((-diff).max(zero).to_array());
    }

    // Handle remaining elements
    for i in (chunks * 4)..n {
        let change = data[i + 1] - data[i];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    (gains, losses)
}
