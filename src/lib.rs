#![deny(missing_docs)]

//! Core library for the ragpipe document ingestion server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// MongoDB stores for projects, assets, and chunks.
pub mod db;
/// LLM provider abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Document ingestion pipeline utilities.
pub mod processing;
