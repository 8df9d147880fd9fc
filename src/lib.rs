pub mod cli;
pub mod config;
pub mod download;
mod error;
pub mod index;
pub mod l2;
pub mod media;
mod metrics;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod source;
pub mod trends;

pub use config::Opts;
pub use error::{Error, Result};
pub use pipeline::{Analyzer, AnalyzerBuilder};
