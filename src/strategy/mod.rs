// Trading strategy module
pub mod trend_follow;

pub use trend_follow::{TrendFollowConfig, TrendFollowStrategy};

/// Mutable per-symbol trading memory
///
/// Owned by the poll loop and passed by reference into the evaluator. This
/// is the entire persistent state of the system; it lives for the process
/// lifetime only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolState {
    /// Close price of the last executed sell, if any
    pub last_sell_price: Option<f64>,
    /// Trigger price of the protective stop-loss buy placed with that sell
    pub stoploss_price: Option<f64>,
}
