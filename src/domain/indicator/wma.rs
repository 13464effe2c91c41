//! Weighted Moving Average.
//!
//! O(n) sliding window: each step adds n*P[i] and subtracts the previous
//! window sum, so older prices lose one unit of weight.
//! WMA(n) = (1*P[i-n+1] + 2*P[i-n+2] + ... + n*P[i]) / (n*(n+1)/2)
//! Warmup: first (n-1) values are `None`.

pub fn calculate_wma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len());
    let divisor = (period * (period + 1)) as f64 / 2.0;
    let mut weighted_sum: f64 = 0.0;
    let mut window_sum: f64 = 0.0;

    for (i, &price) in values.iter().enumerate() {
        if i < period {
            weighted_sum += (i + 1) as f64 * price;
            window_sum += price;
        } else {
            weighted_sum += period as f64 * price - window_sum;
            window_sum += price - values[i - period];
        }

        out.push((i + 1 >= period).then(|| weighted_sum / divisor));
    }

    out
}
