use pgexpr::{Catalog, Column, Reference, ReferenceAction, ScalarValue, SqlType, Table, TableId};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_path: PathBuf,
    pub file: ConfigFile,
}

impl ProjectConfig {
    pub fn load(config_path: PathBuf) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read config file {}: {e}",
                config_path.display()
            )
        })?;

        let file = ConfigFile::parse(&raw).map_err(|e| {
            anyhow::anyhow!(
                "failed to load config file {}: {e:#}",
                config_path.display()
            )
        })?;

        Ok(Self { config_path, file })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,

    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnConfig>,
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnConfig {
    pub key: String,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub sql_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub primary: bool,
    pub default: Option<DefaultConfig>,
    pub reference: Option<ReferenceConfig>,
}

/// `default = "auto_increment" | "created_at" | "updated_at"`,
/// `default = { sequence = "name" }` or `default = { value = ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DefaultConfig {
    Kind(String),
    Sequence { sequence: String },
    Value { value: toml::Value },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    /// `schema.table`, or a bare table name in `public`.
    pub table: String,
    pub column: String,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
}

impl ConfigFile {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut file: ConfigFile = toml::from_str(raw)?;
        file.expand_env()?;
        file.validate()?;
        Ok(file)
    }

    fn expand_env(&mut self) -> anyhow::Result<()> {
        if let Some(db) = self.database.as_mut() {
            db.url = expand_env_vars(&db.url)?;
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.version.trim() != "1" {
            anyhow::bail!("unsupported config version: {}", self.version);
        }
        if let Some(db) = &self.database {
            if db.url.trim().is_empty() {
                anyhow::bail!("database.url must not be empty");
            }
        }
        if self.tables.is_empty() {
            anyhow::bail!("at least one [[tables]] entry is required");
        }

        let mut seen = HashSet::<(&str, &str)>::new();
        for t in &self.tables {
            if t.name.trim().is_empty() {
                anyhow::bail!("tables.name must not be empty");
            }
            if !seen.insert((t.schema.as_str(), t.name.as_str())) {
                anyhow::bail!("duplicate table: {}.{}", t.schema, t.name);
            }
            if t.columns.is_empty() {
                anyhow::bail!("tables.columns must not be empty (table: {}.{})", t.schema, t.name);
            }
        }

        Ok(())
    }

    /// Build the catalog. References are attached after every table has been
    /// added, so they may point forward or at the owning table.
    pub fn build_catalog(&self) -> anyhow::Result<(Catalog, Vec<TableId>)> {
        let mut catalog = Catalog::new();
        let mut ids = Vec::with_capacity(self.tables.len());

        for t in &self.tables {
            let mut table = Table::new(&t.schema, &t.name);
            for c in &t.columns {
                table = table.column(column(t, c)?);
            }
            ids.push(catalog.add(table)?);
        }

        for (t, &id) in self.tables.iter().zip(&ids) {
            for c in &t.columns {
                let Some(r) = &c.reference else {
                    continue;
                };
                let (schema, name) = split_table_name(&r.table);
                let Some(target) = catalog.find(schema, name) else {
                    anyhow::bail!(
                        "column {}.{}.{} references unknown table {}",
                        t.schema,
                        t.name,
                        c.key,
                        r.table
                    );
                };
                let reference = Reference::new(target, &r.column)
                    .on_update(action(r.on_update.as_deref())?)
                    .on_delete(action(r.on_delete.as_deref())?);
                catalog.set_reference(id, &c.key, reference)?;
            }
        }

        Ok((catalog, ids))
    }
}

fn column(table: &TableConfig, c: &ColumnConfig) -> anyhow::Result<Column> {
    let mut column = Column::new(&c.key, SqlType::from_name(&c.sql_type));
    if let Some(title) = &c.title {
        column = column.title(title);
    }
    if c.primary {
        column = column.primary();
    }
    column = column.nullable(c.nullable && !c.primary);

    column = match &c.default {
        None => column,
        Some(DefaultConfig::Kind(kind)) => match kind.as_str() {
            "auto_increment" => column.auto_increment(),
            "created_at" => column.created_at(),
            "updated_at" => column.updated_at(),
            other => anyhow::bail!(
                "unknown default `{other}` for column {}.{}.{}",
                table.schema,
                table.name,
                c.key
            ),
        },
        Some(DefaultConfig::Sequence { sequence }) => column.auto_increment_from(sequence),
        Some(DefaultConfig::Value { value }) => column.default_value(scalar(value)?),
    };

    Ok(column)
}

fn scalar(value: &toml::Value) -> anyhow::Result<ScalarValue> {
    Ok(match value {
        toml::Value::String(s) => ScalarValue::Text(s.clone()),
        toml::Value::Integer(n) => ScalarValue::Integer(*n),
        toml::Value::Boolean(b) => ScalarValue::Boolean(*b),
        toml::Value::Float(f) => ScalarValue::Decimal(
            Decimal::from_str(&f.to_string())
                .map_err(|e| anyhow::anyhow!("invalid decimal default {f}: {e}"))?,
        ),
        other => anyhow::bail!("unsupported default value: {other}"),
    })
}

fn action(name: Option<&str>) -> anyhow::Result<ReferenceAction> {
    match name {
        None => Ok(ReferenceAction::default()),
        Some(name) => ReferenceAction::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("unknown reference action: {name}")),
    }
}

fn split_table_name(name: &str) -> (&str, &str) {
    match name.split_once('.') {
        Some((schema, table)) => (schema, table),
        None => ("public", name),
    }
}

fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                anyhow::bail!("unterminated env var reference: ${{{key}}}");
            }
            if key.is_empty() {
                anyhow::bail!("invalid env var reference: ${{}}");
            }

            let v = std::env::var(&key)
                .map_err(|_| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}
