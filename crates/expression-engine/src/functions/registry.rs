use super::{
    Function, FunctionId, arithmetic::ArithmeticFunction, comparison::ComparisonFunction,
    contains::ContainsFunction, empty::IsEmptyFunction, filter::FilterFunction,
    like::LikeFunction, logical::LogicalFunction, matches::MatchesFunction,
    string::StringFunction, subrule::SubruleFunction,
};
use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    filter::FilterPart,
    operand::Operand,
};
use model::core::{value::Value, value_type::ValueType};
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

/// Registry of all available functions
pub struct FunctionRegistry {
    functions: HashMap<FunctionId, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// Create a new function registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(Arc::new(LogicalFunction));
        registry.register(Arc::new(ComparisonFunction));
        registry.register(Arc::new(ArithmeticFunction));
        registry.register(Arc::new(StringFunction));
        registry.register(Arc::new(LikeFunction));
        registry.register(Arc::new(IsEmptyFunction));
        registry.register(Arc::new(ContainsFunction));
        registry.register(Arc::new(MatchesFunction));
        registry.register(Arc::new(SubruleFunction));
        registry.register(Arc::new(FilterFunction));

        registry
    }

    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Installs `function` for every id it handles, replacing earlier handlers.
    pub fn register(&mut self, function: Arc<dyn Function>) {
        for id in function.ids() {
            self.functions.insert(*id, Arc::clone(&function));
        }
    }

    pub fn has_function(&self, id: FunctionId) -> bool {
        self.functions.contains_key(&id)
    }

    /// Looks a registered function up by name.
    pub fn lookup(&self, name: &str) -> Option<FunctionId> {
        FunctionId::from_name(name).filter(|id| self.has_function(*id))
    }

    pub fn function_names(&self) -> Vec<&'static str> {
        let mut names = self
            .functions
            .keys()
            .map(|id| id.name())
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn handler(&self, id: FunctionId) -> Result<&dyn Function> {
        self.functions
            .get(&id)
            .map(|f| f.as_ref())
            .ok_or_else(|| ExpressionError::UnknownFunction(id.name().to_string()))
    }

    pub fn evaluate(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        operands: &[Operand],
        expected: ValueType,
    ) -> Result<Value> {
        let handler = self.checked(id, operands, expected)?;
        handler.evaluate(id, ctx, operands, expected)
    }

    pub fn emit(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        operands: &[Operand],
        expected: ValueType,
    ) -> Result<()> {
        let handler = self.checked(id, operands, expected)?;
        let kind = ctx.backend().kind();
        if !handler.backends(id).supports(kind) {
            return Err(ExpressionError::unsupported(format!(
                "{id}() is not supported for {kind} filters"
            )));
        }
        trace!(function = %id, backend = %kind, "Emitting call");
        handler.emit(id, ctx, part, operands, expected)
    }

    fn checked(
        &self,
        id: FunctionId,
        operands: &[Operand],
        expected: ValueType,
    ) -> Result<&dyn Function> {
        let handler = self.handler(id)?;

        let arity = handler.arity(id);
        if !arity.accepts(operands.len()) {
            return Err(ExpressionError::invalid_args(
                id.name(),
                format!("expected {arity} operands, got {}", operands.len()),
            ));
        }

        let result_type = handler.result_type(id);
        if !expected.accepts(result_type) {
            return Err(ExpressionError::type_mismatch(expected, result_type));
        }
        Ok(handler)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{lit, name},
        testing::with_context,
    };
    use grammar::Backend;

    #[test]
    fn test_registry_has_builtin_functions() {
        let registry = FunctionRegistry::new();
        for id in FunctionId::ALL {
            assert!(registry.has_function(id), "{id} is not registered");
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.lookup("CONCAT"), Some(FunctionId::Concat));
        assert_eq!(registry.lookup("IsEmpty"), Some(FunctionId::IsEmpty));
        assert_eq!(FunctionRegistry::empty().lookup("concat"), None);
    }

    #[test]
    fn test_unknown_function() {
        let registry = FunctionRegistry::empty();
        assert!(matches!(
            registry.handler(FunctionId::Concat),
            Err(ExpressionError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_arity_is_checked() {
        with_context(Backend::None, |ctx| {
            let result = ctx
                .registry()
                .evaluate(FunctionId::Not, ctx, &[lit(true), lit(false)], ValueType::Boolean);
            assert!(matches!(
                result,
                Err(ExpressionError::InvalidFunctionArgs { ref function, .. }) if function == "not"
            ));
        });
    }

    #[test]
    fn test_result_type_is_checked() {
        with_context(Backend::None, |ctx| {
            let result = ctx.registry().evaluate(
                FunctionId::Eq,
                ctx,
                &[lit(1), lit(1)],
                ValueType::Number,
            );
            assert!(matches!(result, Err(ExpressionError::TypeMismatch { .. })));

            let result = ctx.registry().evaluate(
                FunctionId::Concat,
                ctx,
                &[lit("a"), lit("b")],
                ValueType::Boolean,
            );
            assert!(matches!(result, Err(ExpressionError::TypeMismatch { .. })));
        });
    }

    #[test]
    fn test_backend_support_is_checked_before_lowering() {
        with_context(Backend::Directory, |ctx| {
            let mut part = FilterPart::new();
            let result = ctx.registry().emit(
                FunctionId::Add,
                ctx,
                &mut part,
                &[name("object.a"), lit(1)],
                ValueType::Number,
            );
            assert!(matches!(result, Err(ExpressionError::UnsupportedOperation(_))));
            assert!(part.is_empty());
        });
    }
}
