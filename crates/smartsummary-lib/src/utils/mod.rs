// Utility functions module

pub mod app_paths;
pub mod database;
pub mod schema;
