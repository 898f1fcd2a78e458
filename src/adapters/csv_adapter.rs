//! CSV file loaders for the populate pipeline.
//!
//! Both adapters read `{symbol}.csv` under a base directory. Bars use
//! Yahoo-style headers (`Date,Open,High,Low,Close,Adj Close,Volume`);
//! news files carry `Date,Text`. Columns are resolved by header name so
//! the optional `Adj Close` column can sit anywhere.

use crate::domain::data_point::{Interval, OhlcPoint, TextPoint, parse_timestamp};
use crate::domain::dataset::Dataset;
use crate::domain::error::FinpromptError;
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub struct CsvOhlcAdapter {
    base_path: PathBuf,
}

pub struct CsvTextAdapter {
    base_path: PathBuf,
    merge_rows: bool,
}

fn csv_path(base_path: &PathBuf, symbol: &str) -> PathBuf {
    base_path.join(format!("{}.csv", symbol))
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, FinpromptError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| FinpromptError::Database {
            reason: format!("missing {} column in CSV header", name),
        })
}

fn field<'a>(record: &'a csv::StringRecord, index: usize, name: &str) -> Result<&'a str, FinpromptError> {
    record.get(index).ok_or_else(|| FinpromptError::Database {
        reason: format!("missing {} column", name),
    })
}

fn parse_date_field(value: &str, symbol: &str) -> Result<NaiveDateTime, FinpromptError> {
    parse_timestamp(value).ok_or_else(|| FinpromptError::Database {
        reason: format!("invalid date '{}' in CSV for {}", value, symbol),
    })
}

/// Timestamp a point lands on when merged at `interval` granularity.
///
/// Weekly rows collapse onto the following Sunday, matching the
/// week-ending convention of the bar files.
fn bucket_timestamp(ts: NaiveDateTime, interval: Interval) -> NaiveDateTime {
    let midnight = ts.date().and_time(NaiveTime::MIN);
    match interval {
        Interval::Week => {
            let to_sunday = 6 - i64::from(ts.date().weekday().num_days_from_monday());
            midnight + Duration::days(to_sunday)
        }
        Interval::Day => midnight,
        Interval::Hour => midnight + Duration::hours(i64::from(ts.hour())),
    }
}

impl CsvOhlcAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn load(&self, symbol: &str, interval: Interval) -> Result<Dataset<OhlcPoint>, FinpromptError> {
        let path = csv_path(&self.base_path, symbol);
        let content = fs::read_to_string(&path).map_err(|e| FinpromptError::Database {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| FinpromptError::Database {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();

        let date_col = column_index(&headers, "Date")?;
        let open_col = column_index(&headers, "Open")?;
        let high_col = column_index(&headers, "High")?;
        let low_col = column_index(&headers, "Low")?;
        let volume_col = column_index(&headers, "Volume")?;
        // Prefer the split-adjusted close when the file carries one.
        let close_col = match headers.iter().position(|h| h == "Adj Close") {
            Some(index) => index,
            None => column_index(&headers, "Close")?,
        };

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| FinpromptError::Database {
                reason: format!("CSV parse error: {}", e),
            })?;

            let timestamp = parse_date_field(field(&record, date_col, "Date")?, symbol)?;

            let open: f64 = field(&record, open_col, "Open")?.parse().map_err(|e| {
                FinpromptError::Database {
                    reason: format!("invalid Open value: {}", e),
                }
            })?;
            let high: f64 = field(&record, high_col, "High")?.parse().map_err(|e| {
                FinpromptError::Database {
                    reason: format!("invalid High value: {}", e),
                }
            })?;
            let low: f64 = field(&record, low_col, "Low")?.parse().map_err(|e| {
                FinpromptError::Database {
                    reason: format!("invalid Low value: {}", e),
                }
            })?;
            let close: f64 = field(&record, close_col, "Close")?.parse().map_err(|e| {
                FinpromptError::Database {
                    reason: format!("invalid Close value: {}", e),
                }
            })?;
            let volume: u64 = field(&record, volume_col, "Volume")?.parse().map_err(|e| {
                FinpromptError::Database {
                    reason: format!("invalid Volume value: {}", e),
                }
            })?;

            points.push(OhlcPoint {
                symbol: symbol.to_string(),
                timestamp,
                interval,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        points.sort_by_key(|p| p.timestamp);
        Ok(Dataset::new(points))
    }
}

impl CsvTextAdapter {
    pub fn new(base_path: PathBuf, merge_rows: bool) -> Self {
        Self {
            base_path,
            merge_rows,
        }
    }

    pub fn load(&self, symbol: &str, interval: Interval) -> Result<Dataset<TextPoint>, FinpromptError> {
        let path = csv_path(&self.base_path, symbol);
        let content = fs::read_to_string(&path).map_err(|e| FinpromptError::Database {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| FinpromptError::Database {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();

        let date_col = column_index(&headers, "Date")?;
        let text_col = column_index(&headers, "Text")?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| FinpromptError::Database {
                reason: format!("CSV parse error: {}", e),
            })?;

            let timestamp = parse_date_field(field(&record, date_col, "Date")?, symbol)?;
            let text = field(&record, text_col, "Text")?.trim();
            if text.is_empty() {
                continue;
            }
            rows.push((timestamp, text.to_string()));
        }

        let points = if self.merge_rows {
            let mut buckets: BTreeMap<NaiveDateTime, Vec<String>> = BTreeMap::new();
            for (timestamp, text) in rows {
                buckets
                    .entry(bucket_timestamp(timestamp, interval))
                    .or_default()
                    .push(text);
            }
            buckets
                .into_iter()
                .map(|(timestamp, texts)| TextPoint {
                    symbol: symbol.to_string(),
                    timestamp,
                    interval,
                    text: texts.join("#"),
                })
                .collect()
        } else {
            let mut rows = rows;
            rows.sort_by_key(|(timestamp, _)| *timestamp);
            rows.into_iter()
                .map(|(timestamp, text)| TextPoint {
                    symbol: symbol.to_string(),
                    timestamp,
                    interval,
                    text,
                })
                .collect()
        };

        Ok(Dataset::new(points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn setup_bar_files() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let with_adj = "Date,Open,High,Low,Close,Adj Close,Volume\n\
            2021-01-05,105.0,115.0,100.0,110.0,108.0,60000\n\
            2021-01-04,100.0,110.0,90.0,105.0,103.0,50000\n";
        fs::write(path.join("AAPL.csv"), with_adj).unwrap();

        let without_adj = "Date,Open,High,Low,Close,Volume\n\
            2021-01-04,200.0,210.0,190.0,205.0,70000\n";
        fs::write(path.join("MSFT.csv"), without_adj).unwrap();

        (dir, path)
    }

    fn setup_news_files() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let news = "Date,Text\n\
            2021-01-04,first story\n\
            2021-01-04,second story\n\
            2021-01-06,midweek story\n\
            2021-01-07,\n";
        fs::write(path.join("AAPL.csv"), news).unwrap();

        (dir, path)
    }

    #[test]
    fn bars_prefer_adj_close_and_come_back_sorted() {
        let (_dir, path) = setup_bar_files();
        let adapter = CsvOhlcAdapter::new(path);

        let bars = adapter.load("AAPL", Interval::Day).unwrap();

        assert_eq!(bars.len(), 2);
        let first = bars.get(0).unwrap();
        assert_eq!(first.timestamp, parse_timestamp("2021-01-04").unwrap());
        assert_relative_eq!(first.open, 100.0);
        assert_relative_eq!(first.close, 103.0);
        assert_eq!(first.volume, 50000);
        assert_eq!(first.interval, Interval::Day);
    }

    #[test]
    fn bars_without_adj_close_fall_back_to_close() {
        let (_dir, path) = setup_bar_files();
        let adapter = CsvOhlcAdapter::new(path);

        let bars = adapter.load("MSFT", Interval::Day).unwrap();

        assert_eq!(bars.len(), 1);
        assert_relative_eq!(bars.get(0).unwrap().close, 205.0);
    }

    #[test]
    fn missing_bar_file_is_an_error() {
        let (_dir, path) = setup_bar_files();
        let adapter = CsvOhlcAdapter::new(path);

        assert!(adapter.load("XYZ", Interval::Day).is_err());
    }

    #[test]
    fn malformed_bar_value_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        fs::write(
            path.join("BAD.csv"),
            "Date,Open,High,Low,Close,Volume\n2021-01-04,abc,1.0,1.0,1.0,10\n",
        )
        .unwrap();

        let adapter = CsvOhlcAdapter::new(path);
        let err = adapter.load("BAD", Interval::Day).unwrap_err();
        assert!(matches!(err, FinpromptError::Database { .. }));
    }

    #[test]
    fn news_rows_merge_within_a_day() {
        let (_dir, path) = setup_news_files();
        let adapter = CsvTextAdapter::new(path, true);

        let news = adapter.load("AAPL", Interval::Day).unwrap();

        assert_eq!(news.len(), 2);
        let first = news.get(0).unwrap();
        assert_eq!(first.timestamp, parse_timestamp("2021-01-04").unwrap());
        assert_eq!(first.text, "first story#second story");
        assert_eq!(news.get(1).unwrap().text, "midweek story");
    }

    #[test]
    fn unmerged_news_keeps_one_point_per_row() {
        let (_dir, path) = setup_news_files();
        let adapter = CsvTextAdapter::new(path, false);

        let news = adapter.load("AAPL", Interval::Day).unwrap();

        // The blank row is dropped either way.
        assert_eq!(news.len(), 3);
        assert_eq!(news.get(0).unwrap().text, "first story");
        assert_eq!(news.get(1).unwrap().text, "second story");
    }

    #[test]
    fn weekly_merge_lands_on_the_following_sunday() {
        let (_dir, path) = setup_news_files();
        let adapter = CsvTextAdapter::new(path, true);

        let news = adapter.load("AAPL", Interval::Week).unwrap();

        // Mon Jan 4 and Wed Jan 6 both fall in the week ending Sun Jan 10.
        assert_eq!(news.len(), 1);
        let point = news.get(0).unwrap();
        assert_eq!(point.timestamp, parse_timestamp("2021-01-10").unwrap());
        assert_eq!(point.text, "first story#second story#midweek story");
    }

    #[test]
    fn hourly_merge_truncates_to_the_hour() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        fs::write(
            path.join("AAPL.csv"),
            "Date,Text\n2021-01-04 09:15:00,early\n2021-01-04 09:45:00,late\n",
        )
        .unwrap();

        let adapter = CsvTextAdapter::new(path, true);
        let news = adapter.load("AAPL", Interval::Hour).unwrap();

        assert_eq!(news.len(), 1);
        let point = news.get(0).unwrap();
        assert_eq!(
            point.timestamp,
            parse_timestamp("2021-01-04 09:00:00").unwrap()
        );
        assert_eq!(point.text, "early#late");
    }
}
