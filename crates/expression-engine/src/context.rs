use crate::{
    compiler::Compiler,
    datasource::Datasource,
    error::{ExpressionError, Result},
    filter::{self, FilterPart},
    functions::registry::FunctionRegistry,
    operand::{Operand, Path},
    postprocess::PostProcessorRegistry,
    resolver::Resolver,
};
use chrono::{DateTime, Utc};
use engine_config::CompilerSettings;
use grammar::Backend;
use model::{
    core::{value::Value, value_type::ValueType},
    records::record::ResultSet,
};
use tracing::debug;

/// Everything an operand needs while it is classified, evaluated or emitted.
///
/// During compilation the resolver knows nothing and there is no datasource.
/// During resolution both are filled in, so deferred generators can look up
/// names and run nested queries.
pub struct QueryContext<'a> {
    compiler: &'a Compiler,
    backend: &'a Backend,
    resolver: &'a dyn Resolver,
    datasource: Option<&'a dyn Datasource>,
    version: Option<DateTime<Utc>>,
    result_type: ValueType,
}

impl<'a> QueryContext<'a> {
    pub fn new(compiler: &'a Compiler, backend: &'a Backend, resolver: &'a dyn Resolver) -> Self {
        Self {
            compiler,
            backend,
            resolver,
            datasource: None,
            version: None,
            result_type: ValueType::Boolean,
        }
    }

    pub fn with_datasource(mut self, datasource: Option<&'a dyn Datasource>) -> Self {
        self.datasource = datasource;
        self
    }

    pub fn with_version(mut self, version: Option<DateTime<Utc>>) -> Self {
        self.version = version;
        self
    }

    pub fn with_result_type(mut self, result_type: ValueType) -> Self {
        self.result_type = result_type;
        self
    }

    /// A copy of this context that resolves names through `resolver`.
    pub fn with_resolver<'b>(&'b self, resolver: &'b dyn Resolver) -> QueryContext<'b> {
        QueryContext {
            compiler: self.compiler,
            backend: self.backend,
            resolver,
            datasource: self.datasource,
            version: self.version,
            result_type: self.result_type,
        }
    }

    pub fn compiler(&self) -> &'a Compiler {
        self.compiler
    }

    pub fn backend(&self) -> &'a Backend {
        self.backend
    }

    pub fn registry(&self) -> &'a FunctionRegistry {
        self.compiler.registry()
    }

    pub fn postprocessors(&self) -> &'a PostProcessorRegistry {
        self.compiler.postprocessors()
    }

    pub fn settings(&self) -> &'a CompilerSettings {
        self.compiler.settings()
    }

    pub fn object_prefix(&self) -> &'a str {
        &self.compiler.settings().object_prefix
    }

    pub fn resolver(&self) -> &'a dyn Resolver {
        self.resolver
    }

    pub fn datasource(&self) -> Option<&'a dyn Datasource> {
        self.datasource
    }

    pub fn require_datasource(&self, function: &str) -> Result<&'a dyn Datasource> {
        self.datasource.ok_or_else(|| {
            ExpressionError::EvaluationFailed(format!("{function}() requires a datasource"))
        })
    }

    pub fn version(&self) -> Option<DateTime<Utc>> {
        self.version
    }

    pub fn result_type(&self) -> ValueType {
        self.result_type
    }

    /// Resolves a name; an unknown base resolves to `Null`.
    pub fn resolve(&self, path: &Path) -> Result<Value> {
        let value = self
            .resolver
            .resolve(path)
            .map_err(|e| e.in_context(path.to_string()))?;
        Ok(value.unwrap_or_else(|| {
            debug!(name = %path, "Unresolved name evaluates to null");
            Value::Null
        }))
    }

    /// Compiles `rule` against this context's backend, resolves it with this
    /// context's names and runs it on the datasource.
    pub fn nested_query(&self, rule: &Operand, attributes: &[String]) -> Result<ResultSet> {
        let datasource = self.require_datasource("nested query")?;
        let nested = self
            .with_resolver(self.resolver)
            .with_result_type(ValueType::Boolean);

        let mut part = FilterPart::new();
        rule.emit(&nested, &mut part, ValueType::Boolean)?;
        let resolved = filter::resolve_part(&nested, &part)?;

        debug!(filter = %resolved.statement.text, "Running nested query");
        let mut results = datasource.execute(&resolved.statement, attributes, self.version)?;
        resolved.apply_postprocessors(&mut results)?;
        Ok(results)
    }
}
