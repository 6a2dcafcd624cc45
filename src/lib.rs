/// Utilities for reading the ILFF chunk container and the archives built on it
pub mod data;
/// Error definitions
pub mod error;
/// Loading models and archives from disk
pub mod game_data;
/// Model formats (`.mef` and the records inside it)
pub mod models;
/// Generic wrapper for values that may or may not match a known variant.
pub mod recognized;
