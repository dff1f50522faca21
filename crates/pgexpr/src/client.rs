//! Generic client trait for executing resolved SQL.

use crate::error::{Error, Result};
use crate::resolve::Fragment;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// Code that runs DDL batches or resolved fragments can accept either a
/// direct connection or a transaction.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = Result<Vec<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Execute one or more `;`-separated statements without parameters.
    fn batch_execute(&self, sql: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Execute a resolved fragment as a complete statement.
    fn execute_fragment(
        &self,
        fragment: &Fragment,
    ) -> impl std::future::Future<Output = Result<u64>> + Send {
        async move {
            let params = fragment.params_ref();
            self.execute(&fragment.sql, &params).await
        }
    }

    /// Run a resolved fragment as a query and return all rows.
    fn query_fragment(
        &self,
        fragment: &Fragment,
    ) -> impl std::future::Future<Output = Result<Vec<Row>>> + Send {
        async move {
            let params = fragment.params_ref();
            self.query(&fragment.sql, &params).await
        }
    }
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        tokio_postgres::Client::query(self, sql, params)
            .await
            .map_err(Error::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        tokio_postgres::Client::execute(self, sql, params)
            .await
            .map_err(Error::from_db_error)
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        tokio_postgres::Client::batch_execute(self, sql)
            .await
            .map_err(Error::from_db_error)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        tokio_postgres::Transaction::query(self, sql, params)
            .await
            .map_err(Error::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        tokio_postgres::Transaction::execute(self, sql, params)
            .await
            .map_err(Error::from_db_error)
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        tokio_postgres::Transaction::batch_execute(self, sql)
            .await
            .map_err(Error::from_db_error)
    }
}
