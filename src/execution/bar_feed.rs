use crate::api::{NorenClient, TimePriceRow};
use crate::indicators::supertrend;
use crate::models::{AnnotatedSeries, Bar, Instrument};
use crate::Result;
use chrono::{Local, NaiveDateTime, NaiveTime, TimeZone};

const BAR_INTERVAL_MINUTES: u32 = 1;
const TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Retrieves and annotates the day's minute bars for one instrument
///
/// Each fetch covers the window from the daily session start through now
/// and recomputes the trend annotation over the full series.
pub struct BarFeed {
    client: NorenClient,
    session_start: NaiveTime,
    trend_length: usize,
    trend_multiplier: f64,
}

impl BarFeed {
    pub fn new(
        client: NorenClient,
        session_start: NaiveTime,
        trend_length: usize,
        trend_multiplier: f64,
    ) -> Self {
        Self {
            client,
            session_start,
            trend_length,
            trend_multiplier,
        }
    }

    /// Fetch the day's bars for `instrument`, oldest first, with the trend
    /// annotation appended
    ///
    /// Any upstream failure is an `Err` the caller logs and skips; the
    /// tick continues with the next symbol.
    pub async fn fetch(&self, instrument: &Instrument) -> Result<AnnotatedSeries> {
        let now = Local::now();
        let start = now.date_naive().and_time(self.session_start);
        let start_secs = match Local.from_local_datetime(&start).single() {
            Some(t) => t.timestamp(),
            None => return Err(format!("ambiguous local start time {}", start).into()),
        };
        let end_secs = now.timestamp();

        let rows = self
            .client
            .get_time_price_series(
                &instrument.exchange,
                &instrument.token,
                start_secs,
                end_secs,
                BAR_INTERVAL_MINUTES,
            )
            .await?;

        let bars = bars_from_rows(rows);
        let trend = supertrend(&bars, self.trend_length, self.trend_multiplier);
        Ok(AnnotatedSeries { bars, trend })
    }
}

/// Normalize vendor rows into a chronological bar series
///
/// The vendor sends rows newest first with numerics as strings; rows that
/// are not `stat == "Ok"` or fail to parse are dropped.
fn bars_from_rows(rows: Vec<TimePriceRow>) -> Vec<Bar> {
    let mut bars: Vec<Bar> = rows.into_iter().filter_map(parse_row).collect();
    bars.reverse();
    bars
}

fn parse_row(row: TimePriceRow) -> Option<Bar> {
    if row.stat != "Ok" {
        return None;
    }
    let time = NaiveDateTime::parse_from_str(&row.time, TIME_FORMAT).ok()?;
    Some(Bar {
        time,
        open: row.open?.parse().ok()?,
        high: row.high?.parse().ok()?,
        low: row.low?.parse().ok()?,
        close: row.close?.parse().ok()?,
        // The forming bar can come without volume
        volume: row
            .volume
            .and_then(|v| v.parse().ok())
            .unwrap_or_default(),
    })
}
