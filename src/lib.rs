pub mod analyzers;
pub mod cache;
pub mod color;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fallback;
pub mod fetch;
pub mod filter;
pub mod gtfs;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod output;
pub mod parser;
