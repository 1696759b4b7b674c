//! A relational datasource over SQLite.
//!
//! Filters compiled for the relational backend address attributes through the
//! object prefix (`object.status`), so every query aliases the table with it:
//! `SELECT ... FROM <table> AS object WHERE <filter>`.
//!
//! The datasource contract is synchronous; the pool is driven by a private
//! current-thread runtime.

use crate::error::ConnectorError;
use chrono::{DateTime, Utc};
use expression_engine::{Datasource, ExpressionError};
use grammar::{Backend, Dialect, Statement, dialect::Sqlite as SqliteDialect};
use model::{
    core::value::Value,
    records::record::{Record, ResultSet},
};
use sqlx::{
    Column, Row, Sqlite, TypeInfo, ValueRef,
    query::Query,
    sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow},
};
use std::future::Future;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, trace};

const DEFAULT_OBJECT_ALIAS: &str = "object";

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for p in params {
        query = match p {
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Boolean(b) => query.bind(*b),
            Value::Bytes(b) => query.bind(b.as_slice()),
            // Same text form as an inlined timestamp literal
            Value::Timestamp(t) => query.bind(t.to_rfc3339()),
            Value::Object(record) => query.bind(record.get_value("id").to_text()),
            Value::Collection(_) => query.bind(p.to_text()),
            Value::Null => query.bind(None::<String>),
        };
    }
    query
}

/// Reads one column by the storage class of the value actually stored.
fn column_value(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_ascii_uppercase();
    let value = match storage.as_str() {
        "INTEGER" => Value::Int(row.try_get::<i64, _>(index)?),
        "REAL" => Value::Float(row.try_get::<f64, _>(index)?),
        "BLOB" => Value::Bytes(row.try_get::<Vec<u8>, _>(index)?),
        "BOOLEAN" => Value::Boolean(row.try_get::<bool, _>(index)?),
        _ => Value::String(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

fn to_record(row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        record.insert(column.name(), column_value(row, index)?);
    }
    Ok(record)
}

pub struct SqliteDatasource {
    runtime: Runtime,
    pool: SqlitePool,
    dialect: SqliteDialect,
    table: String,
    alias: String,
    id_attribute: String,
}

impl SqliteDatasource {
    /// Opens `url` and queries `table`.
    pub fn connect(url: &str, table: &str) -> Result<Self, ConnectorError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        // One long-lived connection: an in-memory database lives and dies with it
        let pool = runtime.block_on(
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(url),
        )?;
        info!(url, table, "Connected to SQLite");

        Ok(SqliteDatasource {
            runtime,
            pool,
            dialect: SqliteDialect::default(),
            table: table.to_string(),
            alias: DEFAULT_OBJECT_ALIAS.to_string(),
            id_attribute: "id".to_string(),
        })
    }

    /// A private in-memory database holding `table`.
    pub fn in_memory(table: &str) -> Result<Self, ConnectorError> {
        Self::connect("sqlite::memory:", table)
    }

    /// Uses the function-style `concat(a,concat(b,c))` lowering.
    pub fn with_concat_function(mut self) -> Self {
        self.dialect = SqliteDialect::with_concat_function();
        self
    }

    /// Table alias the filters address objects through; must match the
    /// compiler's object prefix.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    pub fn with_id_attribute(mut self, id_attribute: &str) -> Self {
        self.id_attribute = id_attribute.to_string();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Runs a script of one or more statements, e.g. schema setup.
    pub fn execute_script(&self, sql: &str) -> Result<(), ConnectorError> {
        self.block_on(sqlx::raw_sql(sql).execute(&self.pool))?;
        Ok(())
    }

    /// Inserts one object; attribute names become column names.
    pub fn insert(&self, record: &Record) -> Result<(), ConnectorError> {
        if record.is_empty() {
            return Err(ConnectorError::Schema(format!(
                "cannot insert an empty record into {}",
                self.table
            )));
        }

        let (columns, values): (Vec<_>, Vec<_>) = record
            .attributes()
            .map(|(name, value)| (self.dialect.quote_identifier(name), value.clone()))
            .unzip();
        let placeholders = (0..values.len())
            .map(|i| self.dialect.get_placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            self.dialect.quote_identifier(&self.table),
            columns.join(", ")
        );
        trace!(%sql, "Inserting record");

        self.block_on(bind_values(sqlx::query(&sql), &values).execute(&self.pool))?;
        Ok(())
    }

    /// Builds the SELECT that runs `filter` over the table.
    pub fn select_sql(&self, filter: &str, attributes: &[String]) -> String {
        let columns = if attributes.is_empty() {
            format!("{}.*", self.alias)
        } else {
            attributes
                .iter()
                .map(|attr| format!("{}.{}", self.alias, self.dialect.quote_identifier(attr)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "SELECT {columns} FROM {} AS {} WHERE {filter}",
            self.dialect.quote_identifier(&self.table),
            self.alias
        )
    }

    /// Runs a filter and returns the matching rows.
    pub fn fetch(
        &self,
        statement: &Statement,
        attributes: &[String],
    ) -> Result<ResultSet, ConnectorError> {
        let sql = self.select_sql(&statement.text, attributes);
        debug!(%sql, params = statement.params.len(), "Running SQLite query");

        let query = bind_values(sqlx::query(&sql), &statement.params);
        let rows = self.block_on(query.fetch_all(&self.pool))?;
        let records = rows.iter().map(to_record).collect::<Result<Vec<_>, _>>()?;
        Ok(ResultSet::new(records))
    }

    /// Evaluates a scalar SQL expression with no table involved.
    pub fn select_value(&self, expression: &str, params: &[Value]) -> Result<Value, ConnectorError> {
        let sql = format!("SELECT {expression} AS value");
        let row = self.block_on(bind_values(sqlx::query(&sql), params).fetch_one(&self.pool))?;
        Ok(column_value(&row, 0)?)
    }
}

impl Datasource for SqliteDatasource {
    fn backend(&self) -> Backend {
        Backend::relational(self.dialect.clone())
    }

    fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    fn execute(
        &self,
        statement: &Statement,
        attributes: &[String],
        version: Option<DateTime<Utc>>,
    ) -> Result<ResultSet, ExpressionError> {
        if let Some(version) = version {
            debug!(%version, "SQLite keeps no history, querying the current state");
        }
        Ok(self.fetch(statement, attributes)?)
    }
}
