// Services Module
// Extraction, AI orchestration and share-image rendering

pub mod ai;
pub mod extract;
pub mod image;
