//! # pgexpr
//!
//! Type-aware SQL construction for Postgres.
//!
//! ## Features
//!
//! - **Expressions as data**: filters, computed columns and conditional updates
//!   are [`Expr`] trees, lowered to SQL text plus positional `$n` parameters
//! - **Optional filters**: in ignore mode an absent value makes its clause drop
//!   out instead of failing the statement
//! - **Precise errors**: a failed resolution names the exact path to the
//!   offending operand, e.g. `sum -> 1 -> undefined`
//! - **Schema DDL**: CREATE/DROP statements for tables and sequences, ordered
//!   by foreign-key dependency with cycle detection
//!
//! ## Resolving a filter
//!
//! ```ignore
//! use pgexpr::{Expr, Resolved, resolve};
//!
//! let filter = Expr::and(vec![
//!     Expr::eq(Expr::column(r#""u"."status""#), Expr::value("active")),
//!     Expr::gte(Expr::column(r#""u"."age""#), Expr::maybe(min_age)),
//! ]);
//!
//! let mut params = Vec::new();
//! let mut sql = String::from(r#"SELECT * FROM "public"."users" AS "u""#);
//! if let Resolved::Concrete(f) = resolve(&filter, params.len() + 1, true)? {
//!     sql.push_str(" WHERE ");
//!     sql.push_str(&f.append_to(&mut params));
//! }
//! ```
//!
//! ## Creating tables
//!
//! ```ignore
//! let statements = pgexpr::ddl::create_statements(&catalog, &[posts])?;
//! pgexpr::sync::create_all(&mut client, &catalog, &[posts]).await?;
//! ```

pub mod client;
pub mod ddl;
pub mod deps;
pub mod error;
pub mod expr;
pub mod ident;
pub mod resolve;
pub mod schema;
pub mod sync;
pub mod transaction;
pub mod value;

pub use client::GenericClient;
pub use ddl::{
    create_sequences_sql, create_statements, create_table_sql, drop_sequences_sql,
    drop_statements, drop_table_sql,
};
pub use deps::{create_order, drop_order};
pub use error::{DependencyError, Error, ResolveError, ResolveResult, Result};
pub use expr::{ArithmeticOp, Case, CompareOp, Expr, ListOp, NestedQuery, QueryRef, RawSql};
pub use ident::{qualified, quote_ident};
pub use resolve::{Fragment, ResolveConfig, Resolved, Resolver, resolve};
pub use schema::{
    Catalog, Column, ColumnDefault, Reference, ReferenceAction, SqlType, Table, TableId,
};
pub use transaction::{TransactionIsolation, TransactionOptions, begin_transaction_with};
pub use value::{ParamValue, ScalarValue, Serialized, serialize};
