//! Postprocessors run over a query's results after the backend returns them.

use crate::error::{ExpressionError, Result};
use model::{
    core::{value::Value, value_type::ValueType},
    records::record::ResultSet,
};
use std::{cmp::Ordering, collections::HashMap, fmt, sync::Arc};

pub trait PostProcessor: Send + Sync {
    fn process(&self, results: &mut ResultSet, data: Option<&Value>) -> Result<()>;
}

/// Creates a fresh postprocessor instance for one resolved filter.
pub type PostProcessorFactory = Arc<dyn Fn() -> Arc<dyn PostProcessor> + Send + Sync>;

/// Postprocessors by name, fixed once the compiler is built.
#[derive(Clone)]
pub struct PostProcessorRegistry {
    factories: HashMap<String, PostProcessorFactory>,
}

impl PostProcessorRegistry {
    /// A registry with the built-in `sort` and `limit`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("sort", Arc::new(|| Arc::new(Sort) as Arc<dyn PostProcessor>));
        registry.register("limit", Arc::new(|| Arc::new(Limit) as Arc<dyn PostProcessor>));
        registry
    }

    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, factory: PostProcessorFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Registers a shared instance under `name`.
    pub fn register_instance(&mut self, name: &str, processor: Arc<dyn PostProcessor>) {
        self.register(name, Arc::new(move || Arc::clone(&processor)));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(&self, name: &str) -> Option<Arc<dyn PostProcessor>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names = self.factories.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}

impl Default for PostProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A postprocessor with its data, ready to run.
#[derive(Clone)]
pub struct ResolvedPostProcessor {
    pub name: String,
    pub processor: Arc<dyn PostProcessor>,
    pub data: Option<Value>,
}

impl ResolvedPostProcessor {
    pub fn apply(&self, results: &mut ResultSet) -> Result<()> {
        self.processor.process(results, self.data.as_ref())
    }
}

impl fmt::Debug for ResolvedPostProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedPostProcessor")
            .field("name", &self.name)
            .field("data", &self.data)
            .finish()
    }
}

fn failure(name: &str, message: impl Into<String>) -> ExpressionError {
    ExpressionError::PostProcessor {
        name: name.to_string(),
        message: message.into(),
    }
}

/// Orders rows by one attribute. Data is `"attr"`, `"attr asc"` or
/// `"attr desc"`; nulls sort last either way.
pub struct Sort;

impl PostProcessor for Sort {
    fn process(&self, results: &mut ResultSet, data: Option<&Value>) -> Result<()> {
        let spec = data
            .map(Value::to_text)
            .ok_or_else(|| failure("sort", "missing sort attribute"))?;
        let mut words = spec.split_whitespace();
        let attribute = words
            .next()
            .ok_or_else(|| failure("sort", "missing sort attribute"))?
            .to_string();
        let descending = match words.next().map(str::to_lowercase).as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(other) => return Err(failure("sort", format!("unknown direction '{other}'"))),
        };

        results.records.sort_by(|a, b| {
            let (a, b) = (a.get_value(&attribute), b.get_value(&attribute));
            match (a.is_null(), b.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let ordering = a.compare(&b).unwrap_or(Ordering::Equal);
                    if descending { ordering.reverse() } else { ordering }
                }
            }
        });
        Ok(())
    }
}

/// Keeps the first N rows.
pub struct Limit;

impl PostProcessor for Limit {
    fn process(&self, results: &mut ResultSet, data: Option<&Value>) -> Result<()> {
        let limit = data
            .and_then(|value| value.coerce(ValueType::Number))
            .and_then(|value| match value {
                Value::Int(n) => usize::try_from(n).ok(),
                _ => None,
            })
            .ok_or_else(|| failure("limit", format!("expected a row count, got {data:?}")))?;
        results.records.truncate(limit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::records::record::Record;

    fn rows() -> ResultSet {
        ResultSet::new(vec![
            Record::new().with("id", 2).with("name", "b"),
            Record::new().with("id", 3),
            Record::new().with("id", 1).with("name", "c"),
        ])
    }

    fn ids(results: &ResultSet) -> Vec<Value> {
        results.column("id")
    }

    #[test]
    fn test_sort() {
        let mut results = rows();
        Sort.process(&mut results, Some(&Value::from("id desc"))).unwrap();
        assert_eq!(ids(&results), vec![Value::Int(3), Value::Int(2), Value::Int(1)]);

        let mut results = rows();
        Sort.process(&mut results, Some(&Value::from("name"))).unwrap();
        assert_eq!(ids(&results), vec![Value::Int(2), Value::Int(1), Value::Int(3)]);
    }

    #[test]
    fn test_sort_rejects_bad_direction() {
        let mut results = rows();
        assert!(Sort.process(&mut results, Some(&Value::from("id sideways"))).is_err());
        assert!(Sort.process(&mut results, None).is_err());
    }

    #[test]
    fn test_limit() {
        let mut results = rows();
        Limit.process(&mut results, Some(&Value::Int(2))).unwrap();
        assert_eq!(results.len(), 2);
        assert!(Limit.process(&mut results, Some(&Value::Int(-1))).is_err());
    }

    #[test]
    fn test_registry_creates_instances() {
        let registry = PostProcessorRegistry::new();
        assert_eq!(registry.names(), vec!["limit", "sort"]);
        assert!(registry.create("sort").is_some());
        assert!(registry.create("shuffle").is_none());
    }
}
