pub mod analyzer;
pub mod arc;
pub mod classifier;
pub mod config;
pub mod loader;
pub mod text;
pub mod thematic;
pub mod traversal;
