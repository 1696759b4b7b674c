//! Helpers shared by the unit tests.

use crate::{
    compiler::Compiler,
    context::QueryContext,
    datasource::Datasource,
    error::Result,
    filter::{self, FilterPart},
    operand::Operand,
    resolver::{EmptyResolver, MapResolver, Resolver},
};
use chrono::{DateTime, Utc};
use engine_config::CompilerSettings;
use grammar::{Backend, LiteralMode, Statement};
use model::{core::value_type::ValueType, records::record::ResultSet};
use std::{cell::RefCell, collections::VecDeque};

pub fn with_context<R>(backend: Backend, f: impl FnOnce(&QueryContext<'_>) -> R) -> R {
    with_resolver(backend, &EmptyResolver, f)
}

pub fn with_resolver<R>(
    backend: Backend,
    resolver: &dyn Resolver,
    f: impl FnOnce(&QueryContext<'_>) -> R,
) -> R {
    let compiler = Compiler::with_settings(CompilerSettings::default());
    let ctx = QueryContext::new(&compiler, &backend, resolver);
    f(&ctx)
}

/// Emits `expr` as `expected` and resolves it with literals inlined.
pub fn try_emit_as(
    compiler: &Compiler,
    backend: Backend,
    expr: &Operand,
    expected: ValueType,
) -> Result<String> {
    let ctx = QueryContext::new(compiler, &backend, &EmptyResolver);
    let mut part = FilterPart::new();
    expr.emit(&ctx, &mut part, expected)?;
    let resolved = filter::resolve_part_with_mode(&ctx, &part, LiteralMode::Inline)?;
    Ok(resolved.statement.text)
}

pub fn try_emit(backend: Backend, expr: &Operand) -> Result<String> {
    let compiler = Compiler::with_settings(CompilerSettings::default());
    try_emit_as(&compiler, backend, expr, ValueType::Boolean)
}

pub fn emit_inline(backend: Backend, expr: &Operand) -> String {
    try_emit(backend, expr).unwrap_or_else(|e| panic!("{expr}: {e}"))
}

pub fn emit_inline_as(backend: Backend, expr: &Operand, expected: ValueType) -> String {
    let compiler = Compiler::with_settings(CompilerSettings::default());
    try_emit_as(&compiler, backend, expr, expected).unwrap_or_else(|e| panic!("{expr}: {e}"))
}

pub fn emit_inline_with(compiler: &Compiler, backend: Backend, expr: &Operand) -> String {
    try_emit_as(compiler, backend, expr, ValueType::Boolean)
        .unwrap_or_else(|e| panic!("{expr}: {e}"))
}

/// Compiles and resolves once with `resolvables`, literals inlined.
pub fn resolve_inline_with(backend: Backend, expr: &Operand, resolvables: MapResolver) -> String {
    let compiler = Compiler::with_settings(CompilerSettings::default());
    let mut compiled = compiler.compile(expr.clone(), backend).unwrap();
    compiled.set_resolvables(resolvables);
    compiled
        .resolve_with_mode(None, None, LiteralMode::Inline)
        .unwrap()
        .statement
        .text
}

/// Records every statement it is asked to run and answers with queued
/// results, then with empty ones.
pub struct StubDatasource {
    backend: Backend,
    responses: RefCell<VecDeque<ResultSet>>,
    executed: RefCell<Vec<Statement>>,
    attributes: RefCell<Vec<Vec<String>>>,
}

impl StubDatasource {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            responses: RefCell::new(VecDeque::new()),
            executed: RefCell::new(Vec::new()),
            attributes: RefCell::new(Vec::new()),
        }
    }

    pub fn returning(self, results: ResultSet) -> Self {
        self.responses.borrow_mut().push_back(results);
        self
    }

    pub fn executed(&self) -> Vec<Statement> {
        self.executed.borrow().clone()
    }

    pub fn requested_attributes(&self) -> Vec<Vec<String>> {
        self.attributes.borrow().clone()
    }
}

impl Datasource for StubDatasource {
    fn backend(&self) -> Backend {
        self.backend.clone()
    }

    fn execute(
        &self,
        statement: &Statement,
        attributes: &[String],
        _version: Option<DateTime<Utc>>,
    ) -> Result<ResultSet> {
        self.executed.borrow_mut().push(statement.clone());
        self.attributes.borrow_mut().push(attributes.to_vec());
        Ok(self.responses.borrow_mut().pop_front().unwrap_or_default())
    }
}
