//! Database access layer for idrec-identify
//!
//! All functions take the connection of the caller's unit of work, so they
//! compose into one transaction.

pub mod contacts;
