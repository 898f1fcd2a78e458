#![allow(dead_code)]

use chrono::{Datelike, NaiveDateTime};
use finprompt::domain::data_point::{DataPoint, Interval, OhlcPoint, TextPoint, parse_timestamp};
use finprompt::domain::dataset::Dataset;
use finprompt::domain::default_templates;
use finprompt::domain::error::FinpromptError;
use finprompt::domain::template::TemplateMeta;
use finprompt::ports::llm_port::LlmPort;
use finprompt::ports::store_port::StorePort;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockStore {
    pub points: HashMap<String, Vec<DataPoint>>,
    pub templates: Vec<TemplateMeta>,
    pub fetch_error: Option<String>,
    pub stored_points: RefCell<Vec<DataPoint>>,
    pub stored_templates: RefCell<Vec<TemplateMeta>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            points: HashMap::new(),
            templates: Vec::new(),
            fetch_error: None,
            stored_points: RefCell::new(Vec::new()),
            stored_templates: RefCell::new(Vec::new()),
        }
    }

    pub fn with_points(mut self, symbol: &str, points: Vec<DataPoint>) -> Self {
        self.points.insert(symbol.to_string(), points);
        self
    }

    pub fn with_templates(mut self, templates: Vec<TemplateMeta>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_fetch_error(mut self, reason: &str) -> Self {
        self.fetch_error = Some(reason.to_string());
        self
    }
}

impl StorePort for MockStore {
    fn fetch_data(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
    ) -> Result<Dataset<DataPoint>, FinpromptError> {
        if let Some(reason) = &self.fetch_error {
            return Err(FinpromptError::Database {
                reason: reason.clone(),
            });
        }
        let points = self
            .points
            .get(symbol)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| {
                        p.timestamp() >= start && p.timestamp() <= end && p.interval() == interval
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(Dataset::new(points))
    }

    fn store_data(&self, dataset: &Dataset<DataPoint>) -> Result<(), FinpromptError> {
        self.stored_points
            .borrow_mut()
            .extend(dataset.iter().cloned());
        Ok(())
    }

    fn fetch_templates(
        &self,
        prompt_type: Option<&str>,
    ) -> Result<Vec<TemplateMeta>, FinpromptError> {
        let stored = self.stored_templates.borrow();
        let all = self.templates.iter().chain(stored.iter());
        Ok(match prompt_type {
            Some(tag) => all.filter(|t| t.prompt_type == tag).cloned().collect(),
            None => all.cloned().collect(),
        })
    }

    fn store_templates(&self, templates: &[TemplateMeta]) -> Result<(), FinpromptError> {
        self.stored_templates
            .borrow_mut()
            .extend_from_slice(templates);
        Ok(())
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, FinpromptError> {
        if let Some(reason) = &self.fetch_error {
            return Err(FinpromptError::Database {
                reason: reason.clone(),
            });
        }
        match self.points.get(symbol) {
            Some(points) if !points.is_empty() => {
                let min = points.iter().map(|p| p.timestamp()).min().unwrap();
                let max = points.iter().map(|p| p.timestamp()).max().unwrap();
                Ok(Some((min, max, points.len())))
            }
            _ => Ok(None),
        }
    }
}

pub struct MockLlm {
    pub reply: String,
    pub prompts: RefCell<Vec<String>>,
}

impl MockLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl LlmPort for MockLlm {
    fn complete(&self, prompt: &str) -> Result<String, FinpromptError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

pub struct FailingLlm;

impl LlmPort for FailingLlm {
    fn complete(&self, _prompt: &str) -> Result<String, FinpromptError> {
        Err(FinpromptError::Llm {
            reason: "model unavailable".to_string(),
        })
    }
}

pub fn ts(s: &str) -> NaiveDateTime {
    parse_timestamp(s).unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> DataPoint {
    DataPoint::Ohlc(OhlcPoint {
        symbol: symbol.to_string(),
        timestamp: ts(date),
        interval: Interval::Day,
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    })
}

pub fn make_news(symbol: &str, date: &str, text: &str) -> DataPoint {
    DataPoint::Text(TextPoint {
        symbol: symbol.to_string(),
        timestamp: ts(date),
        interval: Interval::Day,
        text: text.to_string(),
    })
}

pub fn seeded_templates() -> Vec<TemplateMeta> {
    default_templates::all()
}

/// Daily bars on consecutive weekdays, close rising by one per bar.
pub fn weekday_bars(symbol: &str, start_date: &str, count: usize, start_price: f64) -> Vec<DataPoint> {
    let mut out = Vec::with_capacity(count);
    let mut day = ts(start_date);
    let mut close = start_price;
    while out.len() < count {
        if day.weekday().number_from_monday() <= 5 {
            out.push(make_bar(symbol, &day.format("%Y-%m-%d").to_string(), close));
            close += 1.0;
        }
        day += chrono::Duration::days(1);
    }
    out
}
