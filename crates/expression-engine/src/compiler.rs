use crate::{
    context::QueryContext,
    datasource::Datasource,
    error::{ExpressionError, Result},
    filter::{self, FilterPart, ResolvedFilter},
    functions::registry::FunctionRegistry,
    operand::Operand,
    postprocess::PostProcessorRegistry,
    resolver::{EmptyResolver, MapResolver, Resolver, ScopedResolver},
};
use chrono::{DateTime, Utc};
use engine_config::{CompilerSettings, current_settings};
use grammar::{Backend, LiteralMode};
use model::{
    core::{value::Value, value_type::ValueType},
    records::record::{Record, ResultSet},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Lowers expressions into filters and evaluates them in-process.
///
/// Cloning is cheap; the registries and settings are shared.
#[derive(Clone)]
pub struct Compiler {
    registry: Arc<FunctionRegistry>,
    postprocessors: Arc<PostProcessorRegistry>,
    settings: Arc<CompilerSettings>,
}

impl Compiler {
    /// A compiler with the built-in functions and the process-wide settings.
    pub fn new() -> Self {
        Self::with_settings(current_settings())
    }

    pub fn with_settings(settings: CompilerSettings) -> Self {
        Self {
            registry: Arc::new(FunctionRegistry::new()),
            postprocessors: Arc::new(PostProcessorRegistry::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn with_registry(mut self, registry: FunctionRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_postprocessors(mut self, postprocessors: PostProcessorRegistry) -> Self {
        self.postprocessors = Arc::new(postprocessors);
        self
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn postprocessors(&self) -> &PostProcessorRegistry {
        &self.postprocessors
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Lowers a boolean expression for `backend`. Parts that depend on
    /// query-time values are left as generators in the returned filter.
    pub fn compile(&self, expression: Operand, backend: Backend) -> Result<DatasourceFilter> {
        self.compile_as(expression, backend, ValueType::Boolean)
    }

    /// Lowers an expression of any type, e.g. a value expression to embed in
    /// a hand-written statement.
    pub fn compile_as(
        &self,
        expression: Operand,
        backend: Backend,
        expected: ValueType,
    ) -> Result<DatasourceFilter> {
        if let Backend::None = backend {
            return Err(ExpressionError::unsupported(
                "a filter needs a backend; evaluate the expression instead",
            ));
        }

        let mut part = FilterPart::new();
        {
            let ctx = QueryContext::new(self, &backend, &EmptyResolver);
            expression
                .emit(&ctx, &mut part, expected)
                .map_err(|e| {
                    debug!(%expression, error = %e, "Compilation failed");
                    e
                })?;
        }
        info!(
            backend = %backend.kind(),
            deferred = part.is_deferred(),
            "Compiled filter for {expression}"
        );

        Ok(DatasourceFilter {
            compiler: self.clone(),
            expression,
            backend,
            part,
            resolvables: MapResolver::new(),
        })
    }

    /// Parses `rule` with the datasource's parser and compiles it for the
    /// datasource's backend.
    pub fn create_filter(&self, datasource: &dyn Datasource, rule: &str) -> Result<DatasourceFilter> {
        let expression = datasource.parse_rule(rule)?;
        self.compile(expression, datasource.backend())
    }

    /// Evaluates an expression in-process.
    pub fn evaluate(
        &self,
        expression: &Operand,
        resolver: &dyn Resolver,
        expected: ValueType,
    ) -> Result<Value> {
        self.evaluate_with(expression, resolver, None, expected)
    }

    /// Evaluates an expression in-process; `subrule()` and nested rules run
    /// against `datasource`.
    pub fn evaluate_with(
        &self,
        expression: &Operand,
        resolver: &dyn Resolver,
        datasource: Option<&dyn Datasource>,
        expected: ValueType,
    ) -> Result<Value> {
        let backend = datasource.map(|ds| ds.backend()).unwrap_or(Backend::None);
        let ctx = QueryContext::new(self, &backend, resolver)
            .with_datasource(datasource)
            .with_result_type(expected);
        expression.evaluate(&ctx, expected)
    }

    /// Whether `object` satisfies the expression, with the object bound to
    /// the object prefix.
    pub fn matches_object(
        &self,
        expression: &Operand,
        object: &Record,
        resolver: &dyn Resolver,
    ) -> Result<bool> {
        let scoped = ScopedResolver::new(
            &self.settings.object_prefix,
            Value::Object(object.clone()),
            resolver,
        );
        let value = self.evaluate(expression, &scoped, ValueType::Boolean)?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Keeps the records that satisfy the expression.
    pub fn filter_records(
        &self,
        expression: &Operand,
        records: ResultSet,
        resolver: &dyn Resolver,
    ) -> Result<ResultSet> {
        let mut kept = Vec::new();
        for record in records {
            if self.matches_object(expression, &record, resolver)? {
                kept.push(record);
            }
        }
        Ok(ResultSet::new(kept))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled filter bound to a backend. Resolve it as often as needed; each
/// resolution re-runs the deferred parts with the current resolvables.
pub struct DatasourceFilter {
    compiler: Compiler,
    expression: Operand,
    backend: Backend,
    part: FilterPart,
    resolvables: MapResolver,
}

impl DatasourceFilter {
    pub fn expression(&self) -> &Operand {
        &self.expression
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn part(&self) -> &FilterPart {
        &self.part
    }

    /// Registers a named base for resolution, e.g. `portal` or `request`.
    pub fn add_resolvable(&mut self, base: &str, value: impl Into<Value>) {
        self.resolvables.insert(base, value);
    }

    pub fn set_resolvables(&mut self, resolvables: MapResolver) {
        self.resolvables = resolvables;
    }

    /// Renders the filter with literals bound or inlined per the settings.
    pub fn resolve(
        &self,
        datasource: Option<&dyn Datasource>,
        version: Option<DateTime<Utc>>,
    ) -> Result<ResolvedFilter> {
        let ctx = self.context(datasource, version);
        filter::resolve_part(&ctx, &self.part)
    }

    pub fn resolve_with_mode(
        &self,
        datasource: Option<&dyn Datasource>,
        version: Option<DateTime<Utc>>,
        mode: LiteralMode,
    ) -> Result<ResolvedFilter> {
        let ctx = self.context(datasource, version);
        filter::resolve_part_with_mode(&ctx, &self.part, mode)
    }

    /// Resolves, runs the filter on `datasource` and applies postprocessors.
    pub fn query(
        &self,
        datasource: &dyn Datasource,
        attributes: &[String],
        version: Option<DateTime<Utc>>,
    ) -> Result<ResultSet> {
        let target = datasource.backend().kind();
        if target != self.backend.kind() {
            return Err(ExpressionError::unsupported(format!(
                "filter compiled for {} cannot run on a {target} datasource",
                self.backend.kind()
            )));
        }

        let resolved = self.resolve(Some(datasource), version)?;
        debug!(
            filter = %resolved.statement.text,
            params = resolved.statement.params.len(),
            "Executing filter"
        );
        let mut results = datasource.execute(&resolved.statement, attributes, version)?;
        resolved.apply_postprocessors(&mut results)?;
        Ok(results)
    }

    fn context<'a>(
        &'a self,
        datasource: Option<&'a dyn Datasource>,
        version: Option<DateTime<Utc>>,
    ) -> QueryContext<'a> {
        QueryContext::new(&self.compiler, &self.backend, &self.resolvables)
            .with_datasource(datasource)
            .with_version(version)
    }
}
