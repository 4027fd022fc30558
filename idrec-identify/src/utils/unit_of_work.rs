//! Scoped unit of work over one SQLite transaction
//!
//! A `UnitOfWork` owns a pooled connection for the duration of one identify
//! call. It is released on every exit path: `commit`, `rollback`, or drop
//! (sqlx rolls back a transaction that is dropped uncommitted).

use idrec_common::{Error, Result};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;

/// Transactions held longer than this are logged at warn level
const LONG_HOLD_MS: u128 = 2000;

/// Transaction wrapper that logs acquisition and release timing
pub struct UnitOfWork {
    tx: Option<Transaction<'static, Sqlite>>,
    caller: &'static str,
    acquired_at: Instant,
}

impl UnitOfWork {
    /// Connection to run statements on, inside the open transaction
    pub fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| Error::Internal("Unit of work already finished".to_string()))
    }

    /// Commit every write made through this unit of work
    pub async fn commit(mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Internal("Unit of work already finished".to_string()))?;

        tx.commit().await?;
        self.log_release("commit");

        Ok(())
    }

    /// Discard every write made through this unit of work
    pub async fn rollback(mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Internal("Unit of work already finished".to_string()))?;

        tx.rollback().await?;
        self.log_release("rollback");

        Ok(())
    }

    fn log_release(&self, how: &'static str) {
        let held_ms = self.acquired_at.elapsed().as_millis();
        if held_ms > LONG_HOLD_MS {
            tracing::warn!(
                caller = self.caller,
                held_ms = held_ms,
                how,
                "LONG TRANSACTION - connection held for extended period"
            );
        } else {
            tracing::debug!(caller = self.caller, held_ms = held_ms, how, "Connection released");
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.tx.is_some() {
            // sqlx queues the rollback when the transaction is dropped
            self.log_release("drop");
        }
    }
}

/// Begin a unit of work, logging how long the pool took to hand out a connection
pub async fn begin_unit_of_work(pool: &SqlitePool, caller: &'static str) -> Result<UnitOfWork> {
    let start = Instant::now();

    let tx = pool.begin().await?;

    let wait_ms = start.elapsed().as_millis();
    if wait_ms > 1000 {
        tracing::warn!(
            caller = caller,
            wait_ms = wait_ms,
            "Slow connection acquisition - pool may be saturated"
        );
    } else {
        tracing::debug!(caller = caller, wait_ms = wait_ms, "Connection acquired");
    }

    Ok(UnitOfWork {
        tx: Some(tx),
        caller,
        acquired_at: Instant::now(),
    })
}
