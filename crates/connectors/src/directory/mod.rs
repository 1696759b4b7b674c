//! An in-memory directory answering RFC 4515 filters.

pub mod filter;

use crate::error::ConnectorError;
use chrono::{DateTime, Utc};
use expression_engine::{Datasource, ExpressionError};
use filter::LdapFilter;
use grammar::{Backend, Statement};
use model::{
    core::value::Value,
    records::record::{Record, ResultSet},
};
use tracing::debug;

pub const OBJECT_CLASS: &str = "objectClass";

/// Entries kept in insertion order. Every entry carries an `objectClass`.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    entries: Vec<Record>,
    id_attribute: Option<String>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_attribute(mut self, id_attribute: &str) -> Self {
        self.id_attribute = Some(id_attribute.to_string());
        self
    }

    pub fn with_entry(mut self, entry: Record) -> Self {
        self.add(entry);
        self
    }

    pub fn add(&mut self, mut entry: Record) {
        if entry.get(OBJECT_CLASS).is_none() {
            entry.insert(OBJECT_CLASS, "top");
        }
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries matching `filter`, reduced to `attributes` (all when empty).
    pub fn search(&self, filter: &str, attributes: &[String]) -> Result<ResultSet, ConnectorError> {
        let filter = LdapFilter::parse(filter)?;
        let records = self
            .entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .map(|entry| project(entry, attributes))
            .collect::<Vec<_>>();
        debug!(matched = records.len(), total = self.entries.len(), "Directory search");
        Ok(ResultSet::new(records))
    }
}

fn project(entry: &Record, attributes: &[String]) -> Record {
    if attributes.is_empty() {
        return entry.clone();
    }
    attributes.iter().fold(Record::new(), |record, attribute| {
        match entry.get(attribute) {
            Some(value) => record.with(attribute, value.clone()),
            None => record.with(attribute, Value::Null),
        }
    })
}

impl Datasource for MemoryDirectory {
    fn backend(&self) -> Backend {
        Backend::Directory
    }

    fn id_attribute(&self) -> &str {
        self.id_attribute.as_deref().unwrap_or("id")
    }

    fn execute(
        &self,
        statement: &Statement,
        attributes: &[String],
        _version: Option<DateTime<Utc>>,
    ) -> Result<ResultSet, ExpressionError> {
        if !statement.params.is_empty() {
            return Err(ConnectorError::Schema(
                "directory filters carry their values inline, not as parameters".to_string(),
            )
            .into());
        }
        Ok(self.search(&statement.text, attributes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expression_engine::{
        Compiler,
        builder::{lit, lt, name},
    };

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new()
            .with_entry(Record::new().with("id", 1).with("cn", "ann").with("age", 25))
            .with_entry(Record::new().with("id", 2).with("cn", "bob").with("age", 30))
            .with_entry(Record::new().with("id", 3).with("cn", "cid"))
    }

    #[test]
    fn test_every_entry_has_an_object_class() {
        let results = directory().search("(objectClass=*)", &[]).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results.records[0].get_value(OBJECT_CLASS), Value::from("top"));
    }

    #[test]
    fn test_projection_fills_missing_attributes() {
        let results = directory()
            .search("(cn=cid)", &["id".to_string(), "age".to_string()])
            .unwrap();
        assert_eq!(
            results.records,
            vec![Record::new().with("id", 3).with("age", Value::Null)]
        );
    }

    #[test]
    fn test_compiled_less_than_runs() {
        let ds = directory();
        let filter = Compiler::new()
            .compile(lt(name("object.age"), lit(30)), ds.backend())
            .unwrap();
        let resolved = filter.resolve(Some(&ds), None).unwrap();
        assert_eq!(resolved.statement.text, "(!(age>=30))");

        // Entries without an age satisfy the negated filter as well
        let ids = filter.query(&ds, &["id".to_string()], None).unwrap().column("id");
        assert_eq!(ids, vec![Value::Int(1), Value::Int(3)]);
    }

    #[test]
    fn test_bad_filter_is_a_datasource_error() {
        let statement = Statement {
            text: "(cn=".to_string(),
            params: vec![],
        };
        assert!(matches!(
            directory().execute(&statement, &[], None),
            Err(ExpressionError::Datasource(_))
        ));
    }
}
