use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resolvable object: a named bag of attribute values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    attributes: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    pub fn get_value(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn get_path(&self, segments: &[String]) -> Value {
        match segments.split_first() {
            Some((head, rest)) => self.get_value(head).get_path(rest),
            None => Value::Object(self.clone()),
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Rows returned by a datasource query, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub records: Vec<Record>,
}

impl ResultSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Values of one attribute across all rows, collections flattened.
    pub fn column(&self, attribute: &str) -> Vec<Value> {
        self.records
            .iter()
            .flat_map(|record| match record.get_value(attribute) {
                Value::Collection(items) => items,
                other => vec![other],
            })
            .collect()
    }
}

impl IntoIterator for ResultSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let record = Record::new().with("Name", "alice");
        assert_eq!(record.get_value("name"), Value::from("alice"));
        assert_eq!(record.get_value("missing"), Value::Null);
    }

    #[test]
    fn test_column_flattens_multi_valued_attributes() {
        let rs = ResultSet::new(vec![
            Record::new().with("tag", "a"),
            Record::new().with("tag", Value::Collection(vec!["b".into(), "c".into()])),
        ]);
        assert_eq!(
            rs.column("tag"),
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );
    }
}
