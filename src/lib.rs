pub mod config;
pub mod dataset;
pub mod error;
pub mod format;
pub mod generation;
pub mod notebook;
pub mod platform;
pub mod validate;
pub mod workflow;
