//! Library side of the survey-edit CLI
//!
//! Exposed so integration tests and the binary share script parsing and
//! replay.

pub mod logging;
pub mod replay;
pub mod script;
pub mod system_config;
