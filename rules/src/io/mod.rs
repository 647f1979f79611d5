//! Side-effecting helpers: config files and model loading.

pub mod config;
pub mod loader;
