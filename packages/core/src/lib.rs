// Library root — exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod metrics;
pub mod navigation;
pub mod remote;
pub mod services;
pub mod session;
pub mod store;
pub mod validation;
