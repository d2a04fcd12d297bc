use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A trading symbol resolved to its broker-specific instrument token
///
/// Resolution happens once at startup; the token is immutable for the
/// process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub token: String,
    pub exchange: String,
}

/// One minute-interval price observation
///
/// Bars for a symbol form an ordered sequence keyed by time, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Trend direction flag: positive means uptrend, negative means downtrend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
}

impl TrendDirection {
    /// Signed representation (+1 / -1), used in the snapshot files
    pub fn as_i8(self) -> i8 {
        match self {
            TrendDirection::Up => 1,
            TrendDirection::Down => -1,
        }
    }
}

/// Per-bar trend annotation: direction plus the trend line price level
///
/// The stop level on a downtrend bar is the upper band, which the strategy
/// uses as the protective stop-loss trigger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub direction: TrendDirection,
    pub stop: f64,
}

/// A bar series with its trend annotation
///
/// `trend` is aligned with `bars`; entries are `None` during the indicator
/// warmup where no trend value exists yet.
#[derive(Debug, Clone)]
pub struct AnnotatedSeries {
    pub bars: Vec<Bar>,
    pub trend: Vec<Option<TrendPoint>>,
}

impl AnnotatedSeries {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The two most recent (bar, annotation) pairs, newest last
    ///
    /// Returns `None` when the series holds fewer than 2 bars.
    pub fn last_two(&self) -> Option<[(&Bar, Option<TrendPoint>); 2]> {
        let n = self.bars.len();
        if n < 2 {
            return None;
        }
        Some([
            (&self.bars[n - 2], self.trend[n - 2]),
            (&self.bars[n - 1], self.trend[n - 1]),
        ])
    }
}

/// Order side as the broker encodes it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn code(self) -> &'static str {
        match self {
            OrderSide::Buy => "B",
            OrderSide::Sell => "S",
        }
    }
}

/// Price type for order placement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PriceType {
    Market,
    StopLossMarket,
}

impl PriceType {
    pub fn code(self) -> &'static str {
        match self {
            PriceType::Market => "MKT",
            PriceType::StopLossMarket => "SL-MKT",
        }
    }
}

/// An order the strategy wants placed
///
/// Intents carry only what varies per order; the instrument and exchange
/// travel alongside when the dispatcher submits them.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderIntent {
    MarketSell { quantity: u32 },
    StopLossBuy { quantity: u32, trigger_price: f64 },
}
