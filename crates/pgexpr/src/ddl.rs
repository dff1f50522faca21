//! CREATE/DROP statements for tables and their sequences.
//!
//! Statements are complete and carry no trailing `;`. The batch helpers
//! [`create_statements`] and [`drop_statements`] order tables by foreign-key
//! dependency and put sequences before tables on create, after them on drop.

use crate::deps::{create_order, drop_order};
use crate::error::{Error, Result};
use crate::ident::{qualified, quote_ident};
use crate::schema::{Catalog, Column, ColumnDefault, Table, TableId};
use crate::value::{ScalarValue, to_literal};

/// `CREATE TABLE "schema"."table"(...)`.
pub fn create_table_sql(catalog: &Catalog, id: TableId) -> Result<String> {
    let table = catalog.table(id)?;

    let mut parts = Vec::with_capacity(table.columns.len() + 1);
    for column in &table.columns {
        parts.push(column_definition(catalog, table, column)?);
    }

    let primary: Vec<String> = table
        .primary_columns()
        .map(|c| quote_ident(&c.title))
        .collect();
    if !primary.is_empty() {
        parts.push(format!(
            "CONSTRAINT {} PRIMARY KEY({})",
            quote_ident(&format!("{}_pk", table.name)),
            primary.join(", ")
        ));
    }

    Ok(format!(
        "CREATE TABLE {}({})",
        table.qualified_name(),
        parts.join(", ")
    ))
}

/// `DROP TABLE "schema"."table"`.
pub fn drop_table_sql(table: &Table) -> String {
    format!("DROP TABLE {}", table.qualified_name())
}

/// One `CREATE SEQUENCE` per auto-increment column.
pub fn create_sequences_sql(table: &Table) -> Vec<String> {
    table
        .columns
        .iter()
        .filter_map(|column| {
            let name = table.sequence_name(column)?;
            let mut sql = format!("CREATE SEQUENCE {}", qualified(&table.schema, &name));
            if let Some(ty) = column.sql_type.sequence_type() {
                sql.push_str(" AS ");
                sql.push_str(ty);
            }
            Some(sql)
        })
        .collect()
}

/// One `DROP SEQUENCE` per auto-increment column.
pub fn drop_sequences_sql(table: &Table) -> Vec<String> {
    table
        .columns
        .iter()
        .filter_map(|column| {
            let name = table.sequence_name(column)?;
            Some(format!("DROP SEQUENCE {}", qualified(&table.schema, &name)))
        })
        .collect()
}

/// Everything needed to create `tables` (and the tables they reference):
/// all sequences first, then tables in dependency order.
pub fn create_statements(catalog: &Catalog, tables: &[TableId]) -> Result<Vec<String>> {
    let order = create_order(catalog, tables)?;

    let mut sequences = Vec::new();
    let mut creates = Vec::with_capacity(order.len());
    for id in order {
        sequences.extend(create_sequences_sql(catalog.table(id)?));
        creates.push(create_table_sql(catalog, id)?);
    }
    sequences.extend(creates);
    Ok(sequences)
}

/// Inverse of [`create_statements`]: tables in reverse dependency order, then
/// their sequences.
pub fn drop_statements(catalog: &Catalog, tables: &[TableId]) -> Result<Vec<String>> {
    let order = drop_order(catalog, tables)?;

    let mut drops = Vec::with_capacity(order.len());
    let mut sequences = Vec::new();
    for id in order {
        let table = catalog.table(id)?;
        drops.push(drop_table_sql(table));
        sequences.extend(drop_sequences_sql(table));
    }
    drops.extend(sequences);
    Ok(drops)
}

/// `"title" TYPE [DEFAULT ...] [NOT] NULL [REFERENCES ...]`
fn column_definition(catalog: &Catalog, table: &Table, column: &Column) -> Result<String> {
    let mut sql = quote_ident(&column.title);
    sql.push(' ');
    sql.push_str(&column.sql_type.sql());

    match &column.default {
        ColumnDefault::Static(value) => {
            sql.push_str(" DEFAULT ");
            sql.push_str(&to_literal(value));
        }
        ColumnDefault::AutoIncrement { .. } => {
            if let Some(name) = table.sequence_name(column) {
                let seq = ScalarValue::Text(qualified(&table.schema, &name));
                sql.push_str(" DEFAULT nextval(");
                sql.push_str(&to_literal(&seq));
                sql.push_str("::regclass)");
            }
        }
        ColumnDefault::None | ColumnDefault::CreatedAt | ColumnDefault::UpdatedAt => {}
    }

    sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });

    if let Some(reference) = &column.reference {
        let target = catalog.table(reference.table)?;
        let target_column = target.get_column(&reference.column).ok_or_else(|| {
            Error::schema(format!(
                "unknown column `{}` of {}",
                reference.column,
                target.display_name()
            ))
        })?;
        sql.push_str(" REFERENCES ");
        sql.push_str(&target.qualified_name());
        sql.push('(');
        sql.push_str(&quote_ident(&target_column.title));
        sql.push(')');
        sql.push_str(" ON UPDATE ");
        sql.push_str(reference.on_update.sql());
        sql.push_str(" ON DELETE ");
        sql.push_str(reference.on_delete.sql());
    }

    Ok(sql)
}
