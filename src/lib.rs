pub mod api;
pub mod config;
pub mod console;
pub mod metrics;
pub mod utils;
pub mod view;
