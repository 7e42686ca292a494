/// Database connection and schema creation
pub mod database;

/// Engine settings loaded from transition.toml
pub mod settings;
