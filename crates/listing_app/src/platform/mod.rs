//! Terminal plumbing: the engine loop, logging, session storage and output.
pub mod app;
pub mod effects;
pub mod logging;
pub mod persistence;
pub mod ui;
