//! Apply ordered DDL batches against a live database.
//!
//! Each batch runs in a single read-write `READ COMMITTED` transaction, so a
//! failing statement leaves the database untouched.

use crate::client::GenericClient;
use crate::ddl::{create_statements, drop_statements};
use crate::error::Result;
use crate::schema::{Catalog, TableId};
use crate::transaction::{TransactionIsolation, TransactionOptions, __finish, begin_transaction_with};
use tokio_postgres::Client;

fn ddl_options() -> TransactionOptions {
    TransactionOptions::new()
        .isolation_level(TransactionIsolation::ReadCommitted)
        .read_only(false)
}

/// Create sequences and tables for `tables` and everything they reference.
/// Returns the number of statements executed.
pub async fn create_all(client: &mut Client, catalog: &Catalog, tables: &[TableId]) -> Result<usize> {
    let statements = create_statements(catalog, tables)?;
    apply(client, &statements).await
}

/// Drop `tables`, everything they reference, and their sequences.
/// Returns the number of statements executed.
pub async fn drop_all(client: &mut Client, catalog: &Catalog, tables: &[TableId]) -> Result<usize> {
    let statements = drop_statements(catalog, tables)?;
    apply(client, &statements).await
}

/// Run statements in order inside one transaction.
pub async fn apply(client: &mut Client, statements: &[String]) -> Result<usize> {
    let tx = begin_transaction_with(client, ddl_options()).await?;
    let result = run_all(&tx, statements).await;
    __finish(tx, result).await
}

async fn run_all(client: &impl GenericClient, statements: &[String]) -> Result<usize> {
    for sql in statements {
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "pgexpr.ddl", sql = %sql, "executing");
        client.batch_execute(sql).await?;
    }
    Ok(statements.len())
}
