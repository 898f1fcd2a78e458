//! Request orchestration: fetch, window, compose, complete.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::domain::container::TemplateDataContainer;
use crate::domain::data_point::{Interval, OhlcPoint, TextPoint, format_timestamp};
use crate::domain::dataset::Dataset;
use crate::domain::default_templates::{
    EXAMPLE_TYPE, OHLC_TYPE, QUESTION_TURN, SYSTEM_TYPE, TEXT_TYPE,
};
use crate::domain::error::FinpromptError;
use crate::domain::template::{Role, TemplateBody, TemplateMeta};
use crate::domain::window::{WindowConfig, WindowFactory, merge_date_index};
use crate::ports::llm_port::LlmPort;
use crate::ports::store_port::StorePort;

/// Symbol tag under which general, non-ticker news is stored.
pub const GENERAL_NEWS_SYMBOL: &str = "UNK";

/// One prompt-composition request.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub symbol: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub interval: Interval,
    pub prediction_date: NaiveDateTime,
}

/// Engine knobs, normally read from the `[engine]` config section.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub window_size: usize,
    pub min_points: usize,
    pub include_predictions: bool,
}

impl EngineSettings {
    /// `min_points` defaults to one full window plus the held-out point.
    pub fn new(window_size: usize, min_points: Option<usize>, include_predictions: bool) -> Self {
        EngineSettings {
            window_size,
            min_points: min_points.unwrap_or(window_size + 1),
            include_predictions,
        }
    }
}

pub struct AppController<'a> {
    store: &'a dyn StorePort,
    llm: &'a dyn LlmPort,
    settings: EngineSettings,
}

impl<'a> AppController<'a> {
    pub fn new(store: &'a dyn StorePort, llm: &'a dyn LlmPort, settings: EngineSettings) -> Self {
        AppController {
            store,
            llm,
            settings,
        }
    }

    /// Assemble the full chat prompt for a request.
    ///
    /// Historical data over `[start, end]` becomes labeled example
    /// windows; the span from one interval past `end` up to
    /// `prediction_date` becomes the current window the question refers
    /// to. An empty current span renders as blank lines, not an error.
    pub fn compose_prompt(&self, request: &PromptRequest) -> Result<String, FinpromptError> {
        let (ohlc, text) =
            self.fetch_window_data(&request.symbol, request.start, request.end, request.interval)?;

        let points = merge_date_index(&ohlc, &text).len();
        if points < self.settings.min_points {
            return Err(FinpromptError::InsufficientData {
                symbol: request.symbol.clone(),
                points,
                minimum: self.settings.min_points,
            });
        }

        let factory = WindowFactory::new(WindowConfig {
            window_size: self.settings.window_size,
            example_template: self.fetch_template(EXAMPLE_TYPE)?,
            ohlc_template: self.fetch_template(OHLC_TYPE)?,
            text_template: self.fetch_template(TEXT_TYPE)?,
        })?;

        let examples = factory
            .data_windows(&ohlc, &text, self.settings.include_predictions)?
            .format_prompt()?;

        let current_start = request.interval.advance(request.end);
        let (current_ohlc, current_text) = self.fetch_window_data(
            &request.symbol,
            current_start,
            request.prediction_date,
            request.interval,
        )?;
        let current_window = factory
            .data(&current_ohlc, &current_text)?
            .format_prompt()?;

        let chat = self.chat_template()?;
        let mut record = HashMap::new();
        record.insert("examples".to_string(), examples);
        record.insert("prediction_symbol".to_string(), request.symbol.clone());
        record.insert(
            "prediction_date".to_string(),
            format_timestamp(request.prediction_date),
        );
        record.insert("current_window".to_string(), current_window);

        TemplateDataContainer::new(chat, vec![record]).format_prompt()
    }

    /// Compose the prompt, run the completion, clean up the reply.
    pub fn process_request(&self, request: &PromptRequest) -> Result<String, FinpromptError> {
        let prompt = self.compose_prompt(request)?;
        let output = self.llm.complete(&prompt)?;
        Ok(parse_response(&output))
    }

    /// The symbol's own points for the range plus the general news feed,
    /// split into variant datasets. The union keeps duplicates.
    fn fetch_window_data(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
    ) -> Result<(Dataset<OhlcPoint>, Dataset<TextPoint>), FinpromptError> {
        let own = self.store.fetch_data(symbol, start, end, interval)?;
        let (ohlc, text) = own.split_variants();
        if symbol == GENERAL_NEWS_SYMBOL {
            return Ok((ohlc, text));
        }

        let news = self
            .store
            .fetch_data(GENERAL_NEWS_SYMBOL, start, end, interval)?;
        let (_, general_text) = news.split_variants();
        Ok((ohlc, text.concat(&general_text)))
    }

    /// Exactly one stored template of the given type; zero or several is
    /// an error.
    fn fetch_template(&self, prompt_type: &str) -> Result<TemplateMeta, FinpromptError> {
        let mut matches = self.store.fetch_templates(Some(prompt_type))?;
        if matches.len() != 1 {
            return Err(FinpromptError::TemplateLookup {
                prompt_type: prompt_type.to_string(),
                found: matches.len(),
            });
        }
        Ok(matches.remove(0))
    }

    /// System turn from the stored system template, question turn from
    /// the built-in constant.
    fn chat_template(&self) -> Result<TemplateMeta, FinpromptError> {
        let system = self.fetch_template(SYSTEM_TYPE)?;
        let system_body = system
            .simple_body()
            .ok_or_else(|| FinpromptError::Validation {
                reason: "system template must have a simple body".to_string(),
            })?
            .to_string();

        let mut input_variables = system.input_variables.clone();
        for variable in ["prediction_symbol", "prediction_date", "current_window"] {
            if !input_variables.iter().any(|v| v == variable) {
                input_variables.push(variable.to_string());
            }
        }

        Ok(TemplateMeta {
            input_variables,
            prompt_type: "chat".to_string(),
            body: TemplateBody::Chat(vec![
                (Role::System, system_body),
                (Role::Human, QUESTION_TURN.to_string()),
            ]),
        })
    }
}

/// Strip the whitespace models like to wrap an answer in.
fn parse_response(output: &str) -> String {
    output.trim().to_string()
}
