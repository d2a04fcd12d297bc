/// Supertrend indicator
///
/// Builds volatility bands around the bar midpoint (hl2 ± multiplier * ATR)
/// and tracks which side of them price is on. The trend flips up when close
/// crosses above the previous upper band and down when it crosses below the
/// previous lower band; otherwise bands only ratchet in the direction of
/// the current trend. The trend line doubles as the stop level: the lower
/// band in an uptrend, the upper band in a downtrend.
use crate::indicators::atr_series;
use crate::models::{Bar, TrendDirection, TrendPoint};

/// Compute the Supertrend annotation for a full bar series
///
/// The result is aligned with `bars`; the first `length` entries are
/// `None` while the ATR warms up. The annotation is a function of the
/// whole history, not incremental.
pub fn supertrend(bars: &[Bar], length: usize, multiplier: f64) -> Vec<Option<TrendPoint>> {
    let m = bars.len();
    let mut out = vec![None; m];
    if length == 0 || m <= length {
        return out;
    }

    let atr = atr_series(bars, length);

    // Basic bands around the bar midpoint, where ATR exists
    let mut upper = vec![f64::NAN; m];
    let mut lower = vec![f64::NAN; m];
    for i in length..m {
        if let Some(a) = atr[i] {
            let hl2 = (bars[i].high + bars[i].low) / 2.0;
            upper[i] = hl2 + multiplier * a;
            lower[i] = hl2 - multiplier * a;
        }
    }

    let mut direction = vec![TrendDirection::Up; m];
    let mut trend = vec![f64::NAN; m];

    // A new trend starts long; the first annotated bar rides the lower band
    trend[length] = lower[length];

    for i in (length + 1)..m {
        let close = bars[i].close;
        if close > upper[i - 1] {
            direction[i] = TrendDirection::Up;
        } else if close < lower[i - 1] {
            direction[i] = TrendDirection::Down;
        } else {
            direction[i] = direction[i - 1];
            // Bands only tighten while the trend holds
            if direction[i] == TrendDirection::Up && lower[i] < lower[i - 1] {
                lower[i] = lower[i - 1];
            }
            if direction[i] == TrendDirection::Down && upper[i] > upper[i - 1] {
                upper[i] = upper[i - 1];
            }
        }
        trend[i] = match direction[i] {
            TrendDirection::Up => lower[i],
            TrendDirection::Down => upper[i],
        };
    }

    for i in length..m {
        out[i] = Some(TrendPoint {
            direction: direction[i],
            stop: trend[i],
        });
    }

    out
}
