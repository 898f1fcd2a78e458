//! Port traits connecting the domain to the outside world.

pub mod store_port;
pub mod llm_port;
pub mod config_port;
