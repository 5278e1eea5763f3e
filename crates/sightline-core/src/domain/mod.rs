//! Domain layer
//!
//! Contains the search pipeline and the view definition model.

pub mod search;
pub mod view;
