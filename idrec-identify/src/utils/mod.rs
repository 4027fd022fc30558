//! Utility modules for idrec-identify

pub mod db_retry;
pub mod unit_of_work;

pub use db_retry::retry_on_lock;
pub use unit_of_work::{begin_unit_of_work, UnitOfWork};
