//! Infrastructure layer
//!
//! Concrete integrations behind the domain's seams: query execution against
//! a real database and field-level encryption.

pub mod crypto;
pub mod executor;
