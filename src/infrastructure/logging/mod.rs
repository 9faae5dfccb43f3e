//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty stdout output
//! - Optional rolling JSON file output via tracing-appender
//! - `RUST_LOG` style filtering on top of the configured level

pub mod logger;

pub use logger::LoggerImpl;
