//! Market data points and their flat template projections.

use std::collections::HashMap;
use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::dataset::Dataset;

/// Timestamp layout used in storage and template output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sampling interval of a data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Week,
    Day,
    Hour,
}

impl Interval {
    /// Canonical tag: `W`, `D` or `H1`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Week => "W",
            Interval::Day => "D",
            Interval::Hour => "H1",
        }
    }

    pub fn parse(s: &str) -> Option<Interval> {
        match s {
            "W" => Some(Interval::Week),
            "D" => Some(Interval::Day),
            "H1" => Some(Interval::Hour),
            _ => None,
        }
    }

    /// Move a timestamp forward by one full interval.
    pub fn advance(&self, ts: NaiveDateTime) -> NaiveDateTime {
        match self {
            Interval::Week => ts + Duration::weeks(1),
            Interval::Day => ts + Duration::days(1),
            Interval::Hour => ts + Duration::hours(1),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One price/volume bar.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcPoint {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub interval: Interval,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// One block of news text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPoint {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub interval: Interval,
    pub text: String,
}

/// A data point of either kind, as stored and fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum DataPoint {
    Ohlc(OhlcPoint),
    Text(TextPoint),
}

impl DataPoint {
    pub fn symbol(&self) -> &str {
        match self {
            DataPoint::Ohlc(p) => &p.symbol,
            DataPoint::Text(p) => &p.symbol,
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            DataPoint::Ohlc(p) => p.timestamp,
            DataPoint::Text(p) => p.timestamp,
        }
    }

    pub fn interval(&self) -> Interval {
        match self {
            DataPoint::Ohlc(p) => p.interval,
            DataPoint::Text(p) => p.interval,
        }
    }

    /// The flat key→string view used for template substitution.
    pub fn template_record(&self) -> HashMap<String, String> {
        match self {
            DataPoint::Ohlc(p) => p.template_record(),
            DataPoint::Text(p) => p.template_record(),
        }
    }
}

impl From<OhlcPoint> for DataPoint {
    fn from(point: OhlcPoint) -> Self {
        DataPoint::Ohlc(point)
    }
}

impl From<TextPoint> for DataPoint {
    fn from(point: TextPoint) -> Self {
        DataPoint::Text(point)
    }
}

impl OhlcPoint {
    pub fn template_record(&self) -> HashMap<String, String> {
        let mut record = common_record(&self.symbol, self.timestamp, self.interval);
        record.insert("datapoint_open".to_string(), format_price(self.open));
        record.insert("datapoint_high".to_string(), format_price(self.high));
        record.insert("datapoint_low".to_string(), format_price(self.low));
        record.insert("datapoint_close".to_string(), format_price(self.close));
        record.insert("datapoint_volume".to_string(), self.volume.to_string());
        record
    }
}

impl TextPoint {
    pub fn template_record(&self) -> HashMap<String, String> {
        let mut record = common_record(&self.symbol, self.timestamp, self.interval);
        record.insert("datapoint_text".to_string(), self.text.clone());
        record
    }
}

fn common_record(
    symbol: &str,
    timestamp: NaiveDateTime,
    interval: Interval,
) -> HashMap<String, String> {
    let mut record = HashMap::new();
    record.insert("datapoint_symbol".to_string(), symbol.to_string());
    record.insert(
        "datapoint_timestamp".to_string(),
        format_timestamp(timestamp),
    );
    record.insert(
        "datapoint_interval".to_string(),
        interval.as_str().to_string(),
    );
    record
}

// Debug formatting keeps the trailing `.0` on whole prices (`1.0`, not `1`).
fn format_price(value: f64) -> String {
    format!("{:?}", value)
}

/// Render a timestamp in the fixed `YYYY-MM-DD HH:MM:SS` form.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse `YYYY-MM-DD HH:MM:SS`, or a bare `YYYY-MM-DD` as midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok().or_else(|| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN))
    })
}

impl Dataset<DataPoint> {
    /// Split a mixed dataset into its OHLC and text halves, order preserved.
    pub fn split_variants(&self) -> (Dataset<OhlcPoint>, Dataset<TextPoint>) {
        let mut ohlc = Vec::new();
        let mut text = Vec::new();
        for point in self.iter() {
            match point {
                DataPoint::Ohlc(p) => ohlc.push(p.clone()),
                DataPoint::Text(p) => text.push(p.clone()),
            }
        }
        (Dataset::new(ohlc), Dataset::new(text))
    }
}
