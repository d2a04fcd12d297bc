use crate::models::AnnotatedSeries;
use crate::Result;
use std::path::PathBuf;

/// Writes one CSV file per symbol holding the tick's full annotated series
///
/// The file is overwritten every tick. It is an inspection artifact, not a
/// transactional log; a failed write must never affect trading.
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("bars_{}.csv", symbol))
    }

    /// Write the annotated series for `symbol`, replacing any previous file
    ///
    /// Warmup bars have empty trend cells; annotated bars carry the signed
    /// direction (+1/-1) and the stop level.
    pub fn write(&self, symbol: &str, series: &AnnotatedSeries) -> Result<()> {
        let mut writer = csv::Writer::from_path(self.path_for(symbol))?;

        writer.write_record([
            "time",
            "open",
            "high",
            "low",
            "close",
            "volume",
            "trend_direction",
            "trend_stop",
        ])?;

        for (bar, trend) in series.bars.iter().zip(&series.trend) {
            let (direction, stop) = match trend {
                Some(t) => (t.direction.as_i8().to_string(), format!("{:.2}", t.stop)),
                None => (String::new(), String::new()),
            };
            writer.write_record([
                bar.time.format("%d-%m-%Y %H:%M:%S").to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
                direction,
                stop,
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bar, TrendDirection, TrendPoint};
    use chrono::NaiveDate;

    fn bar(minute: u32, close: f64) -> Bar {
        Bar {
            time: NaiveDate::from_ymd_opt(2024, 8, 2)
                .unwrap()
                .and_hms_opt(9, 15 + minute, 0)
                .unwrap(),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1000.0,
        }
    }

    fn two_bar_series() -> AnnotatedSeries {
        AnnotatedSeries {
            bars: vec![bar(0, 100.0), bar(1, 99.0)],
            trend: vec![
                None,
                Some(TrendPoint {
                    direction: TrendDirection::Down,
                    stop: 104.5,
                }),
            ],
        }
    }

    #[test]
    fn test_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path());

        writer.write("RELIANCE-EQ", &two_bar_series()).unwrap();

        let contents = std::fs::read_to_string(writer.path_for("RELIANCE-EQ")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("time,open,high,low,close,volume"));
        // Warmup bar: empty trend cells
        assert!(lines[1].ends_with(",,"));
        // Annotated bar: signed direction and stop level
        assert!(lines[2].ends_with("-1,104.50"));
    }

    #[test]
    fn test_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path());

        writer.write("RELIANCE-EQ", &two_bar_series()).unwrap();

        let shorter = AnnotatedSeries {
            bars: vec![bar(0, 100.0)],
            trend: vec![None],
        };
        writer.write("RELIANCE-EQ", &shorter).unwrap();

        let contents = std::fs::read_to_string(writer.path_for("RELIANCE-EQ")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_one_file_per_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path());

        writer.write("RELIANCE-EQ", &two_bar_series()).unwrap();
        writer.write("TCS-EQ", &two_bar_series()).unwrap();

        assert!(writer.path_for("RELIANCE-EQ").exists());
        assert!(writer.path_for("TCS-EQ").exists());
    }

    #[test]
    fn test_write_to_missing_dir_fails() {
        let writer = SnapshotWriter::new("/nonexistent/trendbot-test");
        assert!(writer.write("RELIANCE-EQ", &two_bar_series()).is_err());
    }
}
