//! Core domain types and logic.

pub mod data_point;
pub mod dataset;
pub mod template;
pub mod container;
pub mod window;
pub mod controller;
pub mod default_templates;
pub mod config_validation;
pub mod error;
