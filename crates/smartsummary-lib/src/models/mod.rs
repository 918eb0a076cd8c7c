// Data models module
// Rust structs shared by the extractor, the AI service and the storage layer

pub mod ai;
pub mod chat;
pub mod content;
pub mod settings;
pub mod summary;

// Re-export all models for convenience
pub use ai::*;
pub use chat::*;
pub use content::*;
pub use settings::*;
pub use summary::*;
