use crate::models::{AnnotatedSeries, OrderIntent, TrendDirection};
use crate::strategy::SymbolState;

/// Configuration for the trend-following evaluator
#[derive(Debug, Clone)]
pub struct TrendFollowConfig {
    /// Supertrend lookback length
    pub length: usize,
    /// Supertrend band multiplier
    pub multiplier: f64,
    /// Shares per order
    pub quantity: u32,
}

impl Default for TrendFollowConfig {
    fn default() -> Self {
        Self {
            length: 10,
            multiplier: 3.0,
            quantity: 1,
        }
    }
}

/// Sells on the bar where the trend turns down and pairs every sell with a
/// protective stop-loss buy at the trend stop level
///
/// A new sell must improve on (be strictly below) the last executed sell
/// price, unless price has since recovered above the protective stop, which
/// re-arms the symbol.
pub struct TrendFollowStrategy {
    config: TrendFollowConfig,
}

impl TrendFollowStrategy {
    pub fn new(config: TrendFollowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrendFollowConfig {
        &self.config
    }

    /// Evaluate one symbol's annotated series against its state
    ///
    /// Pure given state in and state out: returns the orders to place and
    /// never performs I/O. A series with fewer than 2 bars yields nothing.
    pub fn evaluate(&self, series: &AnnotatedSeries, state: &mut SymbolState) -> Vec<OrderIntent> {
        let Some([prev, last]) = series.last_two() else {
            tracing::debug!("insufficient data ({} bars), skipping", series.len());
            return Vec::new();
        };
        let (last_bar, last_trend) = last;
        let (_, prev_trend) = prev;

        // Price recovered above the protective stop: re-arm selling,
        // even at or above the previous sell price
        if let Some(stop) = state.stoploss_price {
            if last_bar.close > stop {
                state.last_sell_price = None;
                state.stoploss_price = None;
            }
        }

        // Edge-triggered: only the bar on which the trend flips down.
        // Unannotated warmup bars never participate.
        let (Some(prev_point), Some(last_point)) = (prev_trend, last_trend) else {
            return Vec::new();
        };
        if prev_point.direction != TrendDirection::Up
            || last_point.direction != TrendDirection::Down
        {
            return Vec::new();
        }

        let close = last_bar.close;
        if let Some(last_sell) = state.last_sell_price {
            if close >= last_sell {
                tracing::debug!(
                    close,
                    last_sell,
                    "sell suppressed: would not improve on last executed sell"
                );
                return Vec::new();
            }
        }

        let stop = last_point.stop;
        state.stoploss_price = Some(stop);
        state.last_sell_price = Some(close);

        vec![
            OrderIntent::MarketSell {
                quantity: self.config.quantity,
            },
            OrderIntent::StopLossBuy {
                quantity: self.config.quantity,
                trigger_price: stop,
            },
        ]
    }
}
