//! # idrec Common Library
//!
//! Shared code for the identity reconciliation services:
//! - Contact model and link precedence
//! - Database initialization (contacts schema, indexes, pragmas)
//! - Bootstrap configuration loading
//! - Common error taxonomy

pub mod config;
pub mod db;
pub mod error;

pub use db::models::{Contact, LinkPrecedence};
pub use error::{Error, Result};
