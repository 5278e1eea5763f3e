//! Sightline Core Library
//!
//! This crate provides the core functionality for Sightline, including:
//! - View definitions (columns, typed accessors, encrypted/filterable flags)
//! - Query planning (fixed filters, free-text filter, bounds, sort resolution)
//! - The encrypted-field fallback path (fetch, decrypt, filter, sort in memory)
//! - Concurrent row population over a bounded worker pool
//! - SQLite execution and AES-256-GCM field decryption collaborators

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SearchConfig;
    pub use crate::domain::search::{SearchEngine, SearchRequest, SearchResults};
    pub use crate::domain::view::{
        FieldValue, SortOrder, SortSpec, ValueKind, ViewColumn, ViewRecord, ViewSource,
    };
    pub use crate::error::{Error, Result};
    pub use crate::infrastructure::crypto::{AesFieldCipher, FieldCipher, SearchKey};
    pub use crate::infrastructure::executor::{
        ColumnSpec, QueryExecutor, RawRow, SqlParam, SqliteExecutor,
    };
}
