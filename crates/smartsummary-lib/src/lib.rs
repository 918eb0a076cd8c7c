// SmartSummary Core Library
// Content extraction, AI provider orchestration, share-image rendering and storage

pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

// Re-export models for hosts
pub use models::*;

pub use repositories::{SqliteStorage, SummaryStorage};
pub use services::ai::{AIError, AIService, ServiceOptions};
pub use services::extract::ContentExtractor;
pub use services::image::{ImageRenderer, ImageTemplate};
pub use utils::database::Database;
