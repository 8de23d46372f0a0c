// Database module
// SQLite holds resume records together with their embedding vectors

pub mod sqlite;

pub use sqlite::*;
