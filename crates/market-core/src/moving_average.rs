/// Trailing SMA for every position of `values`.
///
/// Positions with fewer than `min_periods` values are `None`; once reached,
/// the mean covers up to `period` trailing values.
pub fn rolling_sma(values: &[f64], period: usize, min_periods: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if period == 0 {
        out.resize(values.len(), None);
        return out;
    }

    let mut window_sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        window_sum += value;
        if i >= period {
            window_sum -= values[i - period];
        }
        let count = (i + 1).min(period);
        if count >= min_periods.max(1) {
            out.push(Some(window_sum / count as f64));
        } else {
            out.push(None);
        }
    }
    out
}
