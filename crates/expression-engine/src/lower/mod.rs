//! Backend-specific lowering. Function handlers pick the module by matching
//! on the context's backend.

pub mod ldap;
pub mod sql;

use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    filter::FilterPart,
    operand::{Operand, Path},
};
use grammar::{Backend, ldap as ldap_grammar};
use model::core::value_type::ValueType;

/// Always-true or always-false filter text for `backend`.
pub fn constant_text(backend: &Backend, value: bool) -> &'static str {
    match (backend, value) {
        (Backend::Relational(_), true) => "1 = 1",
        (Backend::Relational(_), false) => "1 = 0",
        (Backend::Directory, value) => ldap_grammar::constant(value),
        (Backend::None, true) => "true",
        (Backend::None, false) => "false",
    }
}

pub(crate) fn attribute(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    path: &Path,
    expected: ValueType,
) -> Result<()> {
    match ctx.backend() {
        Backend::Relational(_) => {
            sql::attribute(part, path, expected);
            Ok(())
        }
        Backend::Directory => ldap::attribute(part, path, expected),
        Backend::None => Err(ExpressionError::unsupported(format!(
            "attribute '{path}' cannot be lowered without a backend"
        ))),
    }
}

pub(crate) fn list(ctx: &QueryContext<'_>, part: &mut FilterPart, items: &[Operand]) -> Result<()> {
    match ctx.backend() {
        Backend::Relational(_) => sql::list(ctx, part, items),
        Backend::Directory => Err(ExpressionError::unsupported(
            "directory filters cannot contain lists of attributes",
        )),
        Backend::None => Err(ExpressionError::unsupported(
            "lists cannot be lowered without a backend",
        )),
    }
}
