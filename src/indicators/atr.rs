/// Average True Range (ATR) indicator
///
/// Measures market volatility by calculating the average of true ranges
/// over a period. True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// Uses Wilder's smoothing for the moving average.
use crate::models::Bar;

/// Calculate the ATR series, aligned with the input bars
///
/// Entries before index `period` are `None`: true ranges start at the
/// second bar and the first ATR value is the simple average of the first
/// `period` true ranges, Wilder-smoothed afterwards.
pub fn atr_series(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if period == 0 || bars.len() <= period {
        return out;
    }

    // Calculate true ranges
    let mut true_ranges = Vec::with_capacity(bars.len() - 1);
    for i in 1..bars.len() {
        let high = bars[i].high;
        let low = bars[i].low;
        let prev_close = bars[i - 1].close;

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());

        true_ranges.push(tr);
    }

    // First ATR is simple average of the first 'period' true ranges
    let mut atr = true_ranges.iter().take(period).sum::<f64>() / period as f64;
    out[period] = Some(atr);

    // Apply Wilder's smoothing for subsequent values
    for i in period..true_ranges.len() {
        atr = (atr * (period as f64 - 1.0) + true_ranges[i]) / period as f64;
        out[i + 1] = Some(atr);
    }

    out
}
