/// Database configuration and connection management
pub mod database;

/// Reference data (vaccines, branches) loaded from seed.toml
pub mod seed;

/// HTTP listener settings from environment variables
pub mod server;
