//! Directory (LDAP) lowering.
//!
//! Only plain attributes of the object under test can appear in an
//! assertion, and the value side must be known by resolution time. LDAP has
//! no `!=`, `<` or `>`, so those are rewritten:
//!
//! | expression | filter        |
//! |------------|---------------|
//! | `a != v`   | `(!(a=v))`    |
//! | `a < v`    | `(!(a>=v))`   |
//! | `a > v`    | `(!(a<=v))`   |

use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    eval::binary::BinaryOp,
    filter::FilterPart,
    functions::FunctionId,
    operand::{Operand, Path},
};
use grammar::ldap;
use model::core::{value::Value, value_type::ValueType};

pub(crate) fn attribute(part: &mut FilterPart, path: &Path, expected: ValueType) -> Result<()> {
    if expected != ValueType::Boolean {
        return Err(ExpressionError::unsupported(format!(
            "attribute '{path}' can only be tested, not used as a value, in a directory filter"
        )));
    }
    part.push_str(&format!("({}=", path.attribute()));
    part.push_literal(Value::Boolean(true));
    part.push_str(")");
    Ok(())
}

/// The directory attribute an operand names.
pub(crate) fn attribute_name(ctx: &QueryContext<'_>, operand: &Operand) -> Result<String> {
    match operand.as_path() {
        Some(path) if path.base() == ctx.object_prefix() && !path.rest().is_empty() => {
            Ok(path.attribute())
        }
        _ => Err(ExpressionError::unsupported(format!(
            "directory filters can only test plain attributes, got '{operand}'"
        ))),
    }
}

/// Writes one assertion, emitting the value side through `value`.
fn assertion(
    part: &mut FilterPart,
    attribute: &str,
    op: BinaryOp,
    value: impl FnOnce(&mut FilterPart) -> Result<()>,
) -> Result<()> {
    let (prefix, suffix) = match op {
        BinaryOp::Equal => (format!("({attribute}="), ")"),
        BinaryOp::NotEqual => (format!("(!({attribute}="), "))"),
        BinaryOp::GreaterOrEqual => (format!("({attribute}>="), ")"),
        BinaryOp::LessOrEqual => (format!("({attribute}<="), ")"),
        BinaryOp::LessThan => (format!("(!({attribute}>="), "))"),
        BinaryOp::GreaterThan => (format!("(!({attribute}<="), "))"),
        arithmetic => {
            return Err(ExpressionError::Internal(format!(
                "{arithmetic:?} is not a comparison"
            )));
        }
    };
    part.push_str(&prefix);
    value(part)?;
    part.push_str(suffix);
    Ok(())
}

/// Compares an attribute with a value that is known now.
pub(crate) fn compare_with_value(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    op: BinaryOp,
    variable: &Operand,
    value: &Value,
) -> Result<()> {
    let attribute = attribute_name(ctx, variable)?;
    match value {
        Value::Collection(items) => match op {
            BinaryOp::Equal => contains(part, &attribute, false, items),
            BinaryOp::NotEqual => contains(part, &attribute, true, items),
            _ => {
                let filters = items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| {
                        let mut single = FilterPart::new();
                        assertion(&mut single, &attribute, op, |p| {
                            p.push_literal(item.clone());
                            Ok(())
                        })?;
                        Ok(single)
                    })
                    .collect::<Result<Vec<_>>>()?;
                combine(part, "|", filters, false);
            }
        },
        Value::Null => match op {
            BinaryOp::Equal => part.push_str(&format!("(!({attribute}=*))")),
            BinaryOp::NotEqual => part.push_str(&format!("({attribute}=*)")),
            _ => part.push_constant(false),
        },
        value => assertion(part, &attribute, op, |p| {
            p.push_literal(value.clone());
            Ok(())
        })?,
    }
    Ok(())
}

pub(crate) fn logical(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    id: FunctionId,
    operands: &[Operand],
) -> Result<()> {
    let operator = match id {
        FunctionId::And => "&",
        FunctionId::Or => "|",
        _ => "!",
    };
    part.push_str(&format!("({operator}"));
    for operand in operands {
        operand.emit(ctx, part, ValueType::Boolean)?;
    }
    part.push_str(")");
    Ok(())
}

pub(crate) fn is_empty(ctx: &QueryContext<'_>, part: &mut FilterPart, operand: &Operand) -> Result<()> {
    let attribute = attribute_name(ctx, operand)?;
    part.push_str(&format!("(!({attribute}=*))"));
    Ok(())
}

/// `containsOneOf` as `(|(a=v1)(a=v2))`, `containsNone` as
/// `(&(!(a=v1))(!(a=v2)))`. A null element tests for absence.
pub(crate) fn contains(part: &mut FilterPart, attribute: &str, negate: bool, values: &[Value]) {
    let filters = values
        .iter()
        .map(|value| {
            let mut single = FilterPart::new();
            match (value.is_null(), negate) {
                (true, false) => single.push_str(&format!("(!({attribute}=*))")),
                (true, true) => single.push_str(&format!("({attribute}=*)")),
                (false, false) => {
                    single.push_str(&format!("({attribute}="));
                    single.push_literal(value.clone());
                    single.push_str(")");
                }
                (false, true) => {
                    single.push_str(&format!("(!({attribute}="));
                    single.push_literal(value.clone());
                    single.push_str("))");
                }
            }
            single
        })
        .collect::<Vec<_>>();

    if negate {
        combine(part, "&", filters, true);
    } else {
        combine(part, "|", filters, false);
    }
}

/// Joins filters under `operator`; an empty list becomes the constant `empty`.
fn combine(part: &mut FilterPart, operator: &str, filters: Vec<FilterPart>, empty: bool) {
    if filters.is_empty() {
        part.push_constant(empty);
        return;
    }
    let wrap = filters.len() > 1;
    if wrap {
        part.push_str(&format!("({operator}"));
    }
    for filter in filters {
        part.append(filter);
    }
    if wrap {
        part.push_str(")");
    }
}

pub(crate) fn like(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    variable: &Operand,
    pattern: &Value,
) -> Result<()> {
    let attribute = attribute_name(ctx, variable)?;
    if pattern.is_null() {
        part.push_constant(false);
        return Ok(());
    }
    let raw = ldap::value_text(pattern);
    let substring = ldap::like_to_substring(&raw).ok_or_else(|| {
        ExpressionError::unsupported(format!(
            "the '_' wildcard in '{raw}' has no directory equivalent"
        ))
    })?;
    part.push_str(&format!("({attribute}={substring})"));
    Ok(())
}

pub(crate) fn id_in(part: &mut FilterPart, id_attribute: &str, ids: &[Value]) {
    contains(part, id_attribute, false, ids);
}

/// Directory filters have no arithmetic.
pub(crate) fn arithmetic(id: FunctionId) -> Result<()> {
    Err(ExpressionError::unsupported(format!(
        "arithmetic ({id}) is not implemented for directory filters"
    )))
}
