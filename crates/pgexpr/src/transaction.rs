//! Transaction boundary: isolation options, begin, and commit/rollback macros.
//!
//! # Example
//!
//! ```ignore
//! use pgexpr::{TransactionIsolation, TransactionOptions};
//!
//! let opts = TransactionOptions::new()
//!     .isolation_level(TransactionIsolation::Serializable)
//!     .read_only(false);
//!
//! pgexpr::transaction_with!(&mut client, tx, opts, {
//!     tx.batch_execute("UPDATE accounts SET balance = 0").await
//!         .map_err(pgexpr::Error::from_db_error)?;
//!     Ok(())
//! })?;
//! ```

use crate::error::{Error, Result};
use tokio_postgres::{Client, IsolationLevel, Transaction};

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionIsolation {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl TransactionIsolation {
    /// The level as written after `ISOLATION LEVEL`.
    pub fn sql(self) -> &'static str {
        match self {
            TransactionIsolation::ReadUncommitted => "READ UNCOMMITTED",
            TransactionIsolation::ReadCommitted => "READ COMMITTED",
            TransactionIsolation::RepeatableRead => "REPEATABLE READ",
            TransactionIsolation::Serializable => "SERIALIZABLE",
        }
    }

    fn level(self) -> IsolationLevel {
        match self {
            TransactionIsolation::ReadUncommitted => IsolationLevel::ReadUncommitted,
            TransactionIsolation::ReadCommitted => IsolationLevel::ReadCommitted,
            TransactionIsolation::RepeatableRead => IsolationLevel::RepeatableRead,
            TransactionIsolation::Serializable => IsolationLevel::Serializable,
        }
    }
}

/// Options for starting a transaction. Unset options use the server default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    pub isolation: Option<TransactionIsolation>,
    pub read_only: Option<bool>,
    pub deferrable: Option<bool>,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation_level(mut self, level: TransactionIsolation) -> Self {
        self.isolation = Some(level);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = Some(deferrable);
        self
    }

    /// The statement that starts a transaction with these options, e.g.
    /// `BEGIN ISOLATION LEVEL SERIALIZABLE READ WRITE`.
    pub fn begin_sql(&self) -> String {
        let mut sql = String::from("BEGIN");
        if let Some(level) = self.isolation {
            sql.push_str(" ISOLATION LEVEL ");
            sql.push_str(level.sql());
        }
        match self.read_only {
            Some(true) => sql.push_str(" READ ONLY"),
            Some(false) => sql.push_str(" READ WRITE"),
            None => {}
        }
        match self.deferrable {
            Some(true) => sql.push_str(" DEFERRABLE"),
            Some(false) => sql.push_str(" NOT DEFERRABLE"),
            None => {}
        }
        sql
    }
}

/// Begin a transaction with the given options.
pub async fn begin_transaction_with(
    client: &mut Client,
    opts: TransactionOptions,
) -> Result<Transaction<'_>> {
    #[cfg(feature = "tracing")]
    tracing::debug!(target: "pgexpr.tx", begin = %opts.begin_sql(), "starting transaction");

    let mut builder = client.build_transaction();
    if let Some(level) = opts.isolation {
        builder = builder.isolation_level(level.level());
    }
    if let Some(read_only) = opts.read_only {
        builder = builder.read_only(read_only);
    }
    if let Some(deferrable) = opts.deferrable {
        builder = builder.deferrable(deferrable);
    }
    builder.start().await.map_err(Error::from_db_error)
}

/// Commit on `Ok`, roll back on `Err`. Used by the transaction macros.
#[doc(hidden)]
pub async fn __finish<T>(tx: Transaction<'_>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(Error::from_db_error)?;
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "pgexpr.tx", "committed");
            Ok(value)
        }
        Err(error) => match tx.rollback().await {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(target: "pgexpr.tx", error = %error, "rolled back");
                Err(error)
            }
            Err(rollback_err) => Err(Error::Other(format!(
                "{error} (rollback failed: {rollback_err})"
            ))),
        },
    }
}

/// Runs the given block inside a transaction started with
/// [`TransactionOptions`].
///
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `pgexpr::Result<T>`.
#[macro_export]
macro_rules! transaction_with {
    ($client:expr, $tx:ident, $opts:expr, $body:block) => {{
        #[allow(unused_mut)]
        let mut $tx = $crate::begin_transaction_with($client, $opts).await?;
        let __pgexpr_tx_body_result = async { $body }.await;
        $crate::transaction::__finish($tx, __pgexpr_tx_body_result).await
    }};
}

/// [`transaction_with!`] with server-default options.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        $crate::transaction_with!($client, $tx, $crate::TransactionOptions::new(), $body)
    }};
}
