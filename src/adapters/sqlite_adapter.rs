//! SQLite store adapter.
//!
//! Data points and templates live in one database file. Timestamps are
//! stored as `YYYY-MM-DD HH:MM:SS` text, so lexicographic comparison is
//! chronological and range filters run on the column directly.

use crate::domain::data_point::{
    DataPoint, Interval, OhlcPoint, TextPoint, format_timestamp, parse_timestamp,
};
use crate::domain::dataset::Dataset;
use crate::domain::error::FinpromptError;
use crate::domain::template::{Role, TemplateBody, TemplateMeta};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::NaiveDateTime;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

// One fetched row before variant selection.
struct RawPoint {
    symbol: String,
    timestamp: String,
    interval: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<i64>,
    text: Option<String>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FinpromptError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| FinpromptError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| FinpromptError::Database {
                    reason: e.to_string(),
                })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, FinpromptError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| FinpromptError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), FinpromptError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| FinpromptError::Database {
                reason: e.to_string(),
            })?;

        // data_points carries no uniqueness constraint: re-loading a file
        // duplicates rows rather than silently replacing them.
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS data_points (
                symbol TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                interval TEXT NOT NULL,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                volume INTEGER,
                text TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_data_points_symbol_interval
                ON data_points(symbol, interval);
            CREATE INDEX IF NOT EXISTS idx_data_points_timestamp ON data_points(timestamp);
            CREATE TABLE IF NOT EXISTS templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prompt_type TEXT NOT NULL,
                input_variables TEXT NOT NULL,
                body TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_templates_prompt_type ON templates(prompt_type);
            CREATE TABLE IF NOT EXISTS template_turns (
                template_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                role TEXT NOT NULL,
                body TEXT NOT NULL
            );",
        )
        .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    fn chat_turns(
        &self,
        conn: &rusqlite::Connection,
        template_id: i64,
    ) -> Result<Vec<(Role, String)>, FinpromptError> {
        let mut stmt = conn
            .prepare(
                "SELECT role, body FROM template_turns WHERE template_id = ?1 ORDER BY position",
            )
            .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map(params![template_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut turns = Vec::new();
        for row in rows {
            let (tag, body) = row.map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                reason: e.to_string(),
            })?;
            let role = Role::from_tag(&tag).ok_or_else(|| FinpromptError::DatabaseQuery {
                reason: format!("unknown chat role '{}' in template {}", tag, template_id),
            })?;
            turns.push((role, body));
        }

        Ok(turns)
    }
}

fn point_from_row(raw: RawPoint) -> Result<DataPoint, FinpromptError> {
    let timestamp =
        parse_timestamp(&raw.timestamp).ok_or_else(|| FinpromptError::DatabaseQuery {
            reason: format!("invalid timestamp '{}' for {}", raw.timestamp, raw.symbol),
        })?;
    let interval = Interval::parse(&raw.interval).ok_or_else(|| FinpromptError::DatabaseQuery {
        reason: format!("unknown interval '{}' for {}", raw.interval, raw.symbol),
    })?;

    if let (Some(open), Some(high), Some(low), Some(close), Some(volume)) =
        (raw.open, raw.high, raw.low, raw.close, raw.volume)
    {
        let volume = u64::try_from(volume).map_err(|_| FinpromptError::DatabaseQuery {
            reason: format!("negative volume for {} at {}", raw.symbol, raw.timestamp),
        })?;
        return Ok(DataPoint::Ohlc(OhlcPoint {
            symbol: raw.symbol,
            timestamp,
            interval,
            open,
            high,
            low,
            close,
            volume,
        }));
    }

    if let Some(text) = raw.text {
        return Ok(DataPoint::Text(TextPoint {
            symbol: raw.symbol,
            timestamp,
            interval,
            text,
        }));
    }

    Err(FinpromptError::DatabaseQuery {
        reason: format!(
            "data point row for {} at {} has neither text nor full OHLC fields",
            raw.symbol, raw.timestamp
        ),
    })
}

fn template_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, Option<String>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn split_variables(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        Vec::new()
    } else {
        joined.split(',').map(str::to_string).collect()
    }
}

impl StorePort for SqliteAdapter {
    fn fetch_data(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
    ) -> Result<Dataset<DataPoint>, FinpromptError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| FinpromptError::Database {
                reason: e.to_string(),
            })?;

        let query = "SELECT symbol, timestamp, interval, open, high, low, close, volume, text
                     FROM data_points
                     WHERE symbol = ?1 AND interval = ?2 AND timestamp >= ?3 AND timestamp <= ?4
                     ORDER BY timestamp ASC";

        let mut stmt =
            conn.prepare(query)
                .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let rows = stmt
            .query_map(
                params![
                    symbol,
                    interval.as_str(),
                    format_timestamp(start),
                    format_timestamp(end)
                ],
                |row| {
                    Ok(RawPoint {
                        symbol: row.get(0)?,
                        timestamp: row.get(1)?,
                        interval: row.get(2)?,
                        open: row.get(3)?,
                        high: row.get(4)?,
                        low: row.get(5)?,
                        close: row.get(6)?,
                        volume: row.get(7)?,
                        text: row.get(8)?,
                    })
                },
            )
            .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut points = Vec::new();
        for row in rows {
            let raw = row.map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                reason: e.to_string(),
            })?;
            points.push(point_from_row(raw)?);
        }

        Ok(Dataset::new(points))
    }

    fn store_data(&self, dataset: &Dataset<DataPoint>) -> Result<(), FinpromptError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| FinpromptError::Database {
                reason: e.to_string(),
            })?;

        let tx =
            conn.transaction()
                .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let insert = "INSERT INTO data_points
                      (symbol, timestamp, interval, open, high, low, close, volume, text)
                      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

        for point in dataset.iter() {
            match point {
                DataPoint::Ohlc(p) => {
                    let volume =
                        i64::try_from(p.volume).map_err(|_| FinpromptError::DatabaseQuery {
                            reason: format!("volume {} out of range for {}", p.volume, p.symbol),
                        })?;
                    tx.execute(
                        insert,
                        params![
                            p.symbol,
                            format_timestamp(p.timestamp),
                            p.interval.as_str(),
                            p.open,
                            p.high,
                            p.low,
                            p.close,
                            volume,
                            Option::<String>::None
                        ],
                    )
                }
                DataPoint::Text(p) => tx.execute(
                    insert,
                    params![
                        p.symbol,
                        format_timestamp(p.timestamp),
                        p.interval.as_str(),
                        Option::<f64>::None,
                        Option::<f64>::None,
                        Option::<f64>::None,
                        Option::<f64>::None,
                        Option::<i64>::None,
                        p.text
                    ],
                ),
            }
            .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn fetch_templates(
        &self,
        prompt_type: Option<&str>,
    ) -> Result<Vec<TemplateMeta>, FinpromptError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| FinpromptError::Database {
                reason: e.to_string(),
            })?;

        let raw = match prompt_type {
            Some(tag) => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, prompt_type, input_variables, body FROM templates
                         WHERE prompt_type = ?1 ORDER BY id",
                    )
                    .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                        reason: e.to_string(),
                    })?;
                let rows = stmt.query_map(params![tag], template_row).map_err(
                    |e: rusqlite::Error| FinpromptError::DatabaseQuery {
                        reason: e.to_string(),
                    },
                )?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(|e: rusqlite::Error| {
                        FinpromptError::DatabaseQuery {
                            reason: e.to_string(),
                        }
                    })?);
                }
                out
            }
            None => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, prompt_type, input_variables, body FROM templates ORDER BY id",
                    )
                    .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                        reason: e.to_string(),
                    })?;
                let rows = stmt.query_map(params![], template_row).map_err(
                    |e: rusqlite::Error| FinpromptError::DatabaseQuery {
                        reason: e.to_string(),
                    },
                )?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(|e: rusqlite::Error| {
                        FinpromptError::DatabaseQuery {
                            reason: e.to_string(),
                        }
                    })?);
                }
                out
            }
        };

        let mut templates = Vec::new();
        for (id, prompt_type, variables, body) in raw {
            let body = match body {
                Some(simple) => TemplateBody::Simple(simple),
                None => TemplateBody::Chat(self.chat_turns(&conn, id)?),
            };
            templates.push(TemplateMeta {
                input_variables: split_variables(&variables),
                prompt_type,
                body,
            });
        }

        Ok(templates)
    }

    fn store_templates(&self, templates: &[TemplateMeta]) -> Result<(), FinpromptError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| FinpromptError::Database {
                reason: e.to_string(),
            })?;

        let tx =
            conn.transaction()
                .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        for template in templates {
            tx.execute(
                "INSERT INTO templates (prompt_type, input_variables, body) VALUES (?1, ?2, ?3)",
                params![
                    template.prompt_type,
                    template.input_variables.join(","),
                    template.simple_body()
                ],
            )
            .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                reason: e.to_string(),
            })?;

            if let TemplateBody::Chat(turns) = &template.body {
                let template_id = tx.last_insert_rowid();
                for (position, (role, body)) in turns.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO template_turns (template_id, position, role, body)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![template_id, position as i64, role.as_tag(), body],
                    )
                    .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                        reason: e.to_string(),
                    })?;
                }
            }
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, FinpromptError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| FinpromptError::Database {
                reason: e.to_string(),
            })?;

        let query =
            "SELECT MIN(timestamp), MAX(timestamp), COUNT(*) FROM data_points WHERE symbol = ?1";

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(query, params![symbol], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|e: rusqlite::Error| FinpromptError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = parse_timestamp(&min_str).ok_or_else(|| FinpromptError::Database {
                    reason: format!("invalid timestamp '{min_str}' in store"),
                })?;
                let max = parse_timestamp(&max_str).ok_or_else(|| FinpromptError::Database {
                    reason: format!("invalid timestamp '{max_str}' in store"),
                })?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}
