//! Code execution engine
//!
//! Compiles (when needed) and runs untrusted submissions against ordered test
//! cases, classifies every run and scores it, under a global concurrency cap.

pub mod adapters;
pub mod compiler;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod languages;
pub mod runner;
pub mod storage;
pub mod workspace;

pub use config::EngineConfig;
pub use engine::ExecutionEngine;
pub use error::ExecutionError;
pub use languages::{Language, LanguageTable};
