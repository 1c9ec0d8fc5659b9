pub mod app;
pub mod checkpoint;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod pacing;
pub mod record;
pub mod registry;
pub mod spreadsheet;
