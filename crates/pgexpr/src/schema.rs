//! Table and column model shared by the DDL generator and the dependency
//! resolver.
//!
//! Tables live in a [`Catalog`] arena and are referred to by [`TableId`]
//! handles. Two handles are the same table exactly when they are equal, even
//! if two distinct tables happen to share a schema and name.
//!
//! # Example
//! ```ignore
//! use pgexpr::schema::{Catalog, Column, Reference, SqlType, Table};
//!
//! let mut catalog = Catalog::new();
//! let users = catalog.add(
//!     Table::new("public", "users")
//!         .column(Column::new("id", SqlType::Integer).primary().auto_increment()),
//! )?;
//! let posts = catalog.add(
//!     Table::new("public", "posts")
//!         .column(Column::new("id", SqlType::BigInt).primary().auto_increment())
//!         .column(Column::new("author", SqlType::Integer).references(Reference::new(users, "id"))),
//! )?;
//! ```

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::ident::{qualified, quote_ident, validate_name};
use crate::value::ScalarValue;
use std::collections::HashSet;
use std::fmt;

/// Handle to a table inside a [`Catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(usize);

impl TableId {
    /// Position of the table in its catalog.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Postgres column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Real,
    DoublePrecision,
    Boolean,
    Text,
    Varchar(Option<u32>),
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
    Jsonb,
    /// Any other type, emitted verbatim.
    Custom(String),
}

impl SqlType {
    /// Type name as written in DDL.
    pub fn sql(&self) -> String {
        match self {
            SqlType::SmallInt => "SMALLINT".into(),
            SqlType::Integer => "INTEGER".into(),
            SqlType::BigInt => "BIGINT".into(),
            SqlType::Numeric => "NUMERIC".into(),
            SqlType::Real => "REAL".into(),
            SqlType::DoublePrecision => "DOUBLE PRECISION".into(),
            SqlType::Boolean => "BOOLEAN".into(),
            SqlType::Text => "TEXT".into(),
            SqlType::Varchar(None) => "VARCHAR".into(),
            SqlType::Varchar(Some(n)) => format!("VARCHAR({n})"),
            SqlType::Date => "DATE".into(),
            SqlType::Timestamp => "TIMESTAMP".into(),
            SqlType::TimestampTz => "TIMESTAMPTZ".into(),
            SqlType::Uuid => "UUID".into(),
            SqlType::Json => "JSON".into(),
            SqlType::Jsonb => "JSONB".into(),
            SqlType::Custom(s) => s.clone(),
        }
    }

    /// Explicit sequence type for auto-increment columns narrower than 64 bits.
    pub fn sequence_type(&self) -> Option<&'static str> {
        match self {
            SqlType::SmallInt => Some("SMALLINT"),
            SqlType::Integer => Some("INTEGER"),
            _ => None,
        }
    }

    /// Parse a type name such as `integer`, `int8`, `varchar(32)` or
    /// `timestamptz`. Unknown names become [`SqlType::Custom`].
    pub fn from_name(name: &str) -> SqlType {
        let trimmed = name.trim();
        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "smallint" | "int2" => SqlType::SmallInt,
            "integer" | "int" | "int4" => SqlType::Integer,
            "bigint" | "int8" => SqlType::BigInt,
            "numeric" | "decimal" => SqlType::Numeric,
            "real" | "float4" => SqlType::Real,
            "double precision" | "float8" => SqlType::DoublePrecision,
            "boolean" | "bool" => SqlType::Boolean,
            "text" => SqlType::Text,
            "varchar" | "character varying" => SqlType::Varchar(None),
            "date" => SqlType::Date,
            "timestamp" => SqlType::Timestamp,
            "timestamptz" | "timestamp with time zone" => SqlType::TimestampTz,
            "uuid" => SqlType::Uuid,
            "json" => SqlType::Json,
            "jsonb" => SqlType::Jsonb,
            _ => lower
                .strip_prefix("varchar(")
                .and_then(|rest| rest.strip_suffix(')'))
                .and_then(|n| n.trim().parse().ok())
                .map(|n| SqlType::Varchar(Some(n)))
                .unwrap_or_else(|| SqlType::Custom(trimmed.to_string())),
        }
    }
}

/// How a column gets its value when none is supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ColumnDefault {
    #[default]
    None,
    /// A constant, inlined into the DDL.
    Static(ScalarValue),
    /// Backed by a sequence. Without an explicit name the sequence is called
    /// `<table>_<column-title>_seq`.
    AutoIncrement { sequence: Option<String> },
    /// Set on insert by the statement builders.
    CreatedAt,
    /// Set on insert and update by the statement builders.
    UpdatedAt,
}

/// Foreign-key action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferenceAction {
    pub fn sql(self) -> &'static str {
        match self {
            ReferenceAction::NoAction => "NO ACTION",
            ReferenceAction::Restrict => "RESTRICT",
            ReferenceAction::Cascade => "CASCADE",
            ReferenceAction::SetNull => "SET NULL",
            ReferenceAction::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse `cascade`, `set null`, `set_default`, ... (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "no action" => Some(ReferenceAction::NoAction),
            "restrict" => Some(ReferenceAction::Restrict),
            "cascade" => Some(ReferenceAction::Cascade),
            "set null" => Some(ReferenceAction::SetNull),
            "set default" => Some(ReferenceAction::SetDefault),
            _ => None,
        }
    }
}

/// A foreign key: the owning table requires `table` to exist first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Referenced table.
    pub table: TableId,
    /// Key of the referenced column.
    pub column: String,
    pub on_update: ReferenceAction,
    pub on_delete: ReferenceAction,
}

impl Reference {
    pub fn new(table: TableId, column: impl Into<String>) -> Self {
        Self {
            table,
            column: column.into(),
            on_update: ReferenceAction::default(),
            on_delete: ReferenceAction::default(),
        }
    }

    pub fn on_update(mut self, action: ReferenceAction) -> Self {
        self.on_update = action;
        self
    }

    pub fn on_delete(mut self, action: ReferenceAction) -> Self {
        self.on_delete = action;
        self
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Name used by calling code to look the column up.
    pub key: String,
    /// Name of the column in the database.
    pub title: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub default: ColumnDefault,
    /// Part of the primary key.
    pub primary: bool,
    pub reference: Option<Reference>,
}

impl Column {
    /// A nullable column whose title equals its key.
    pub fn new(key: impl Into<String>, sql_type: SqlType) -> Self {
        let key = key.into();
        Self {
            title: key.clone(),
            key,
            sql_type,
            nullable: true,
            default: ColumnDefault::None,
            primary: false,
            reference: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    /// Mark as part of the primary key. Also makes the column non-nullable.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<ScalarValue>) -> Self {
        self.default = ColumnDefault::Static(value.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.default = ColumnDefault::AutoIncrement { sequence: None };
        self
    }

    /// Auto-increment from an explicitly named sequence.
    pub fn auto_increment_from(mut self, sequence: impl Into<String>) -> Self {
        self.default = ColumnDefault::AutoIncrement {
            sequence: Some(sequence.into()),
        };
        self
    }

    pub fn created_at(mut self) -> Self {
        self.default = ColumnDefault::CreatedAt;
        self
    }

    pub fn updated_at(mut self) -> Self {
        self.default = ColumnDefault::UpdatedAt;
        self
    }

    pub fn references(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// Table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub schema: String,
    pub name: String,
    /// Columns in DDL order.
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column.
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Look a column up by key.
    pub fn get_column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Non-nullable primary-key columns, in column order.
    pub fn primary_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary && !c.nullable)
    }

    /// Quoted, schema-qualified name: `"public"."users"`.
    pub fn qualified_name(&self) -> String {
        qualified(&self.schema, &self.name)
    }

    /// Unquoted `schema.name`, for messages.
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Sequence backing an auto-increment column.
    pub fn sequence_name(&self, column: &Column) -> Option<String> {
        match &column.default {
            ColumnDefault::AutoIncrement { sequence: Some(name) } => Some(name.clone()),
            ColumnDefault::AutoIncrement { sequence: None } => {
                Some(format!("{}_{}_seq", self.name, column.title))
            }
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        validate_name("schema", &self.schema)?;
        validate_name("table", &self.name)?;
        let mut keys = HashSet::new();
        let mut titles = HashSet::new();
        for column in &self.columns {
            validate_name("column", &column.title)?;
            if !keys.insert(column.key.as_str()) {
                return Err(Error::schema(format!(
                    "duplicate column key `{}` in {}",
                    column.key,
                    self.display_name()
                )));
            }
            if !titles.insert(column.title.as_str()) {
                return Err(Error::schema(format!(
                    "duplicate column `{}` in {}",
                    column.title,
                    self.display_name()
                )));
            }
            if let Some(seq) = self.sequence_name(column) {
                validate_name("sequence", &seq)?;
            }
        }
        Ok(())
    }
}

/// Arena of tables.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Vec<Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table and return its handle.
    ///
    /// References must point at tables already in the catalog; use
    /// [`Catalog::set_reference`] for self-references and forward references.
    pub fn add(&mut self, table: Table) -> Result<TableId> {
        table.validate()?;
        for column in &table.columns {
            if let Some(reference) = &column.reference {
                self.check_reference(&table, column, reference)?;
            }
        }
        let id = TableId(self.tables.len());
        self.tables.push(table);
        Ok(id)
    }

    /// Attach a foreign key to an existing column.
    pub fn set_reference(&mut self, table: TableId, key: &str, reference: Reference) -> Result<()> {
        let owner = self.table(table)?;
        let column = owner.get_column(key).ok_or_else(|| {
            Error::schema(format!("unknown column `{key}` in {}", owner.display_name()))
        })?;
        self.check_reference(owner, column, &reference)?;

        let column = self.tables[table.0]
            .columns
            .iter_mut()
            .find(|c| c.key == key)
            .ok_or_else(|| Error::schema(format!("unknown column `{key}`")))?;
        column.reference = Some(reference);
        Ok(())
    }

    fn check_reference(&self, owner: &Table, column: &Column, reference: &Reference) -> Result<()> {
        let target = self.get(reference.table).ok_or_else(|| {
            Error::schema(format!(
                "column `{}` of {} references unknown table {}",
                column.key,
                owner.display_name(),
                reference.table
            ))
        })?;
        if target.get_column(&reference.column).is_none() {
            return Err(Error::schema(format!(
                "column `{}` of {} references unknown column `{}` of {}",
                column.key,
                owner.display_name(),
                reference.column,
                target.display_name()
            )));
        }
        Ok(())
    }

    pub fn get(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.0)
    }

    /// Like [`Catalog::get`], failing with a schema error.
    pub fn table(&self, id: TableId) -> Result<&Table> {
        self.get(id)
            .ok_or_else(|| Error::schema(format!("unknown table handle {id}")))
    }

    /// First table with the given schema and name.
    pub fn find(&self, schema: &str, name: &str) -> Option<TableId> {
        self.tables
            .iter()
            .position(|t| t.schema == schema && t.name == name)
            .map(TableId)
    }

    /// All handles, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = TableId> + '_ {
        (0..self.tables.len()).map(TableId)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// A fully qualified column reference: `"schema"."table"."title"`.
    pub fn column_expr(&self, table: TableId, key: &str) -> Result<Expr> {
        let t = self.table(table)?;
        let column = t.get_column(key).ok_or_else(|| {
            Error::schema(format!("unknown column `{key}` in {}", t.display_name()))
        })?;
        Ok(Expr::Column(format!(
            "{}.{}",
            t.qualified_name(),
            quote_ident(&column.title)
        )))
    }
}
