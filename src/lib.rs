pub mod columns;
pub mod config;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod table;
