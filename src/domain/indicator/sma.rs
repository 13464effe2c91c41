//! Simple Moving Average.
//!
//! Rolling-sum window. Warmup: first (n-1) values are `None`.

pub fn calculate_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, &value) in values.iter().enumerate() {
        sum += value;
        if i >= period {
            sum -= values[i - period];
        }
        out.push((i + 1 >= period).then(|| sum / period as f64));
    }

    out
}
