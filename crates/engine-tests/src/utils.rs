use chrono::{DateTime, Utc};
use connectors::{MemoryDirectory, SqliteDatasource};
use engine_config::CompilerSettings;
use expression_engine::{Compiler, Datasource, ExpressionError, Operand};
use grammar::{Backend, Statement};
use model::{
    core::value::Value,
    records::record::{Record, ResultSet},
};
use std::cell::Cell;
use tracing::debug;

/// DDL for the table every relational test queries.
pub const PEOPLE_TABLE_DDL: &str = r#"CREATE TABLE people (
    id INTEGER PRIMARY KEY,
    name TEXT,
    status INTEGER,
    age INTEGER,
    region TEXT,
    first TEXT,
    middle TEXT,
    last TEXT
);"#;

/// Four people covering present, empty and missing values:
///
/// | id | name  | status | age  | region |
/// |----|-------|--------|------|--------|
/// | 1  | ann   | 1      | 34   | north  |
/// | 2  | ''    | 2      | 25   | south  |
/// | 3  | NULL  | 1      | 30   | east   |
/// | 4  | dan   | NULL   | NULL | north  |
pub fn people() -> Vec<Record> {
    vec![
        Record::new()
            .with("id", 1)
            .with("name", "ann")
            .with("status", 1)
            .with("age", 34)
            .with("region", "north")
            .with("first", "a")
            .with("middle", "b")
            .with("last", "c"),
        Record::new()
            .with("id", 2)
            .with("name", "")
            .with("status", 2)
            .with("age", 25)
            .with("region", "south")
            .with("first", "x")
            .with("middle", "y")
            .with("last", "z"),
        Record::new()
            .with("id", 3)
            .with("name", Value::Null)
            .with("status", 1)
            .with("age", 30)
            .with("region", "east")
            .with("first", "ab")
            .with("middle", "c")
            .with("last", "d"),
        Record::new()
            .with("id", 4)
            .with("name", "dan")
            .with("status", Value::Null)
            .with("age", Value::Null)
            .with("region", "north")
            .with("first", "a")
            .with("middle", "bc")
            .with("last", "d"),
    ]
}

pub const ALL_IDS: [i64; 4] = [1, 2, 3, 4];

fn seed_sqlite(datasource: SqliteDatasource) -> SqliteDatasource {
    datasource.execute_script(PEOPLE_TABLE_DDL).expect("create people table");
    for person in people() {
        datasource.insert(&person).expect("insert person");
    }
    debug!("Seeded SQLite people table");
    datasource
}

pub fn people_sqlite() -> SqliteDatasource {
    seed_sqlite(SqliteDatasource::in_memory("people").expect("open sqlite"))
}

/// Same rows, with concatenation lowered as nested `concat()` calls.
pub fn people_sqlite_concat_function() -> SqliteDatasource {
    seed_sqlite(
        SqliteDatasource::in_memory("people")
            .expect("open sqlite")
            .with_concat_function(),
    )
}

pub fn people_directory() -> MemoryDirectory {
    people()
        .into_iter()
        .fold(MemoryDirectory::new(), MemoryDirectory::with_entry)
}

pub fn compiler() -> Compiler {
    Compiler::with_settings(CompilerSettings::default())
}

pub fn inline_compiler() -> Compiler {
    Compiler::with_settings(CompilerSettings {
        inline_literals: true,
        ..CompilerSettings::default()
    })
}

/// Treats `''` and NULL alike when comparing against the empty string.
pub fn compat_compiler() -> Compiler {
    Compiler::with_settings(CompilerSettings {
        empty_string_is_null: true,
        inline_literals: true,
        ..CompilerSettings::default()
    })
}

/// Filter text for `expr` as compiled for `backend`.
pub fn filter_text(compiler: &Compiler, expr: &Operand, backend: Backend) -> String {
    compiler
        .compile(expr.clone(), backend)
        .and_then(|filter| filter.resolve(None, None))
        .unwrap_or_else(|e| panic!("{expr}: {e}"))
        .statement
        .text
}

pub fn sorted_ids(results: &ResultSet) -> Vec<i64> {
    let mut ids = results
        .column("id")
        .into_iter()
        .filter_map(|id| match id {
            Value::Int(id) => Some(id),
            _ => None,
        })
        .collect::<Vec<_>>();
    ids.sort_unstable();
    ids
}

/// Ids of the objects `expr` selects on `datasource`.
pub fn query_ids(compiler: &Compiler, datasource: &dyn Datasource, expr: &Operand) -> Vec<i64> {
    let results = compiler
        .compile(expr.clone(), datasource.backend())
        .and_then(|filter| filter.query(datasource, &["id".to_string()], None))
        .unwrap_or_else(|e| panic!("{expr}: {e}"));
    sorted_ids(&results)
}

/// Ids of the people `expr` selects when evaluated in-process.
pub fn in_process_ids(compiler: &Compiler, expr: &Operand) -> Vec<i64> {
    let kept = compiler
        .filter_records(expr, ResultSet::new(people()), &expression_engine::EmptyResolver)
        .unwrap_or_else(|e| panic!("{expr}: {e}"));
    sorted_ids(&kept)
}

/// Forwards to another datasource and counts the statements it runs.
pub struct CountingDatasource<'a> {
    inner: &'a dyn Datasource,
    executed: Cell<usize>,
}

impl<'a> CountingDatasource<'a> {
    pub fn new(inner: &'a dyn Datasource) -> Self {
        Self {
            inner,
            executed: Cell::new(0),
        }
    }

    pub fn executed(&self) -> usize {
        self.executed.get()
    }
}

impl Datasource for CountingDatasource<'_> {
    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    fn id_attribute(&self) -> &str {
        self.inner.id_attribute()
    }

    fn execute(
        &self,
        statement: &Statement,
        attributes: &[String],
        version: Option<DateTime<Utc>>,
    ) -> Result<ResultSet, ExpressionError> {
        self.executed.set(self.executed.get() + 1);
        self.inner.execute(statement, attributes, version)
    }
}
