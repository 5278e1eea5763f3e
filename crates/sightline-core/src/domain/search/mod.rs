//! Search pipeline
//!
//! Runs a caller request against a view in five stages:
//!
//! 1. **Planner** - base restriction, filter and bound clauses, sort
//!    resolution, and the encrypted-fallback decision
//! 2. **Fetch** - one or two SQL statements through the [`QueryExecutor`]
//!    collaborator
//! 3. **Populate** - raw rows into typed records, decrypting encrypted
//!    columns, concurrently above a row threshold
//! 4. **Post-filter & merge** (encrypted path) - in-memory free-text matching
//!    over decrypted values, deduplicated by row uuid
//! 5. **Sort & paginate** - SQL `ORDER BY`/`LIMIT` normally; a typed
//!    comparator and page slice when the encrypted path is active
//!
//! [`QueryExecutor`]: crate::infrastructure::executor::QueryExecutor
//!
//! # Example
//!
//! ```ignore
//! use sightline_core::prelude::*;
//! use std::sync::Arc;
//!
//! let engine = SearchEngine::new(executor, cipher);
//! let request = SearchRequest::new()
//!     .with_filter("123")
//!     .with_bound("city", "Lisbon")
//!     .with_page(0, 20);
//! let results = engine.search(&customer_view, &request).await?;
//! println!("{} of {}", results.len(), results.total_count);
//! ```

pub mod engine;
pub mod order;
pub mod planner;
pub mod populate;
pub mod request;

// Re-export main types
pub use engine::SearchEngine;
pub use request::{SearchRequest, SearchResults, DEFAULT_PAGE_SIZE};
