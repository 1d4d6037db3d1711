pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod logging;
pub mod providers;
