//! Concurrent HTTP burst generator for probing web application firewalls.
//!
//! Only point it at systems you are authorized to test.

pub mod chart;
pub mod config;
pub mod error;
pub mod i18n;
pub mod issuer;
pub mod limiter;
pub mod model;
pub mod report;
pub mod runner;
pub mod worker;

pub use config::RunConfig;
pub use error::{ConfigError, DataError, Error, RenderError, Result};
pub use issuer::{HttpIssuer, Issuer};
pub use model::{Outcome, RunRecord};
pub use report::{ReportBuilder, RunStatistics};
pub use runner::{run, ProgressSink};
