//! Relational lowering. Every fragment is parenthesized so it can be embedded
//! anywhere.

use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    eval::binary::BinaryOp,
    filter::FilterPart,
    functions::FunctionId,
    operand::{Operand, Path},
};
use grammar::{ConcatStyle, Dialect};
use model::core::{value::Value, value_type::ValueType};

pub(crate) fn attribute(part: &mut FilterPart, path: &Path, expected: ValueType) {
    if expected == ValueType::Boolean {
        part.push_str(&format!("({path} = "));
        part.push_literal(Value::Boolean(true));
        part.push_str(")");
    } else {
        part.push_str(&path.to_string());
    }
}

pub(crate) fn list(ctx: &QueryContext<'_>, part: &mut FilterPart, items: &[Operand]) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            part.push_str(", ");
        }
        item.emit(ctx, part, ValueType::Any)?;
    }
    Ok(())
}

/// `(lhs OP rhs)`, both sides emitted as `operand_type`.
pub(crate) fn binary(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    lhs: &Operand,
    token: &str,
    rhs: &Operand,
    operand_type: ValueType,
) -> Result<()> {
    part.push_str("(");
    lhs.emit(ctx, part, operand_type)?;
    part.push_str(&format!(" {token} "));
    rhs.emit(ctx, part, operand_type)?;
    part.push_str(")");
    Ok(())
}

/// Null-safe `=` or `!=` between an attribute and a known value. Ordering
/// operators are rendered as written.
pub(crate) fn compare_with_value(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    op: BinaryOp,
    variable: &Operand,
    value: &Value,
) -> Result<()> {
    if let Value::Collection(items) = value {
        return match op {
            BinaryOp::Equal => contains_one_of(ctx, part, variable, items),
            BinaryOp::NotEqual => not_in(ctx, part, variable, items),
            _ => order_against_any(ctx, part, op, variable, items),
        };
    }
    if !op.is_equality() {
        part.push_str("(");
        variable.emit(ctx, part, ValueType::Any)?;
        part.push_str(&format!(" {} ", op.sql_token()));
        part.push_literal(value.clone());
        part.push_str(")");
        return Ok(());
    }

    let negate = op == BinaryOp::NotEqual;
    if value.is_null() {
        part.push_str("(");
        variable.emit(ctx, part, ValueType::Any)?;
        part.push_str(if negate { " IS NOT NULL)" } else { " IS NULL)" });
        return Ok(());
    }

    let is_empty_string = matches!(value, Value::String(s) if s.is_empty());
    part.push_str("(");
    variable.emit(ctx, part, ValueType::Any)?;
    part.push_str(if negate { " <> " } else { " = " });
    part.push_literal(value.clone());

    if negate {
        part.push_str(" OR ");
        variable.emit(ctx, part, ValueType::Any)?;
        part.push_str(" IS NULL");
        if is_empty_string {
            // Backends that store '' as NULL: every non-null value differs from ''
            part.push_str(" OR ('' IS NULL AND ");
            variable.emit(ctx, part, ValueType::Any)?;
            part.push_str(" IS NOT NULL)");
        }
    } else if is_empty_string && ctx.settings().empty_string_is_null {
        part.push_str(" OR ");
        variable.emit(ctx, part, ValueType::Any)?;
        part.push_str(" IS NULL");
    }
    part.push_str(")");
    Ok(())
}

/// `<`, `<=`, `>` or `>=` against a list holds when it holds for any
/// non-null element.
pub(crate) fn order_against_any(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    op: BinaryOp,
    variable: &Operand,
    values: &[Value],
) -> Result<()> {
    let present = values.iter().filter(|value| !value.is_null()).collect::<Vec<_>>();
    if present.is_empty() {
        part.push_constant(false);
        return Ok(());
    }
    part.push_str("(");
    for (i, value) in present.into_iter().enumerate() {
        if i > 0 {
            part.push_str(" OR ");
        }
        variable.emit(ctx, part, ValueType::Any)?;
        part.push_str(&format!(" {} ", op.sql_token()));
        part.push_literal(value.clone());
    }
    part.push_str(")");
    Ok(())
}

pub(crate) fn logical(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    id: FunctionId,
    operands: &[Operand],
) -> Result<()> {
    match id {
        FunctionId::Not => {
            part.push_str("(NOT ");
            operands[0].emit(ctx, part, ValueType::Boolean)?;
            part.push_str(")");
        }
        _ => {
            let token = if id == FunctionId::And { " AND " } else { " OR " };
            part.push_str("(");
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    part.push_str(token);
                }
                operand.emit(ctx, part, ValueType::Boolean)?;
            }
            part.push_str(")");
        }
    }
    Ok(())
}

pub(crate) fn is_empty(ctx: &QueryContext<'_>, part: &mut FilterPart, operand: &Operand) -> Result<()> {
    if operand.value_type(ctx) == ValueType::Binary {
        part.push_str("(");
        operand.emit(ctx, part, ValueType::Any)?;
        part.push_str(" IS NULL)");
        return Ok(());
    }
    part.push_str("(('' IS NOT NULL AND ");
    operand.emit(ctx, part, ValueType::Any)?;
    part.push_str(" = '') OR ");
    operand.emit(ctx, part, ValueType::Any)?;
    part.push_str(" IS NULL)");
    Ok(())
}

pub(crate) fn concat(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    dialect: &dyn Dialect,
    operands: &[Operand],
) -> Result<()> {
    match dialect.concat_style() {
        ConcatStyle::Operator(token) => {
            part.push_str("(");
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    part.push_str(&format!(" {token} "));
                }
                concat_operand(ctx, part, operand)?;
            }
            part.push_str(")");
        }
        ConcatStyle::Function(name) => nested_concat(ctx, part, name, operands)?,
    }
    Ok(())
}

/// One concat operand with NULL read as `''`, so `||`, `concat()` and
/// in-process evaluation agree on missing values.
fn concat_operand(ctx: &QueryContext<'_>, part: &mut FilterPart, operand: &Operand) -> Result<()> {
    if let Operand::Literal(value) = operand {
        if !value.is_null() {
            return operand.emit(ctx, part, ValueType::String);
        }
    }
    part.push_str("COALESCE(");
    operand.emit(ctx, part, ValueType::String)?;
    part.push_str(", '')");
    Ok(())
}

/// `concat(a,concat(b,c))`: two-argument calls nested to the right.
fn nested_concat(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    name: &str,
    operands: &[Operand],
) -> Result<()> {
    let Some((first, rest)) = operands.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        return concat_operand(ctx, part, first);
    }
    part.push_str(&format!("{name}("));
    concat_operand(ctx, part, first)?;
    part.push_str(",");
    nested_concat(ctx, part, name, rest)?;
    part.push_str(")");
    Ok(())
}

pub(crate) fn function_call(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    name: &str,
    operand: &Operand,
    operand_type: ValueType,
) -> Result<()> {
    part.push_str(&format!("{name}("));
    operand.emit(ctx, part, operand_type)?;
    part.push_str(")");
    Ok(())
}

/// `(attr IN (...))`, with `OR attr IS NULL` for a null element.
pub(crate) fn contains_one_of(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    attribute: &Operand,
    values: &[Value],
) -> Result<()> {
    let (nulls, present): (Vec<_>, Vec<_>) = values.iter().cloned().partition(Value::is_null);
    if present.is_empty() && nulls.is_empty() {
        part.push_constant(false);
        return Ok(());
    }

    let has_present = !present.is_empty();
    part.push_str("(");
    if has_present {
        attribute.emit(ctx, part, ValueType::Any)?;
        part.push_str(" IN (");
        part.push_literal(Value::Collection(present));
        part.push_str(")");
    }
    if !nulls.is_empty() {
        if has_present {
            part.push_str(" OR ");
        }
        attribute.emit(ctx, part, ValueType::Any)?;
        part.push_str(" IS NULL");
    }
    part.push_str(")");
    Ok(())
}

fn not_in(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    attribute: &Operand,
    values: &[Value],
) -> Result<()> {
    let (nulls, present): (Vec<_>, Vec<_>) = values.iter().cloned().partition(Value::is_null);
    if present.is_empty() && nulls.is_empty() {
        part.push_constant(true);
        return Ok(());
    }

    part.push_str("(");
    if !present.is_empty() {
        attribute.emit(ctx, part, ValueType::Any)?;
        part.push_str(" NOT IN (");
        part.push_literal(Value::Collection(present));
        part.push_str(if nulls.is_empty() { ") OR " } else { ") AND " });
    }
    attribute.emit(ctx, part, ValueType::Any)?;
    part.push_str(if nulls.is_empty() { " IS NULL)" } else { " IS NOT NULL)" });
    Ok(())
}

/// `(object.<id> IN (...))` over ids found by nested queries.
pub(crate) fn id_in(ctx: &QueryContext<'_>, part: &mut FilterPart, id_attribute: &str, ids: Vec<Value>) {
    part.push_str(&format!("({}.{id_attribute} IN (", ctx.object_prefix()));
    part.push_literal(Value::Collection(ids));
    part.push_str("))");
}

pub(crate) fn unsupported(id: FunctionId, reason: &str) -> ExpressionError {
    ExpressionError::unsupported(format!("{id}() on a relational backend: {reason}"))
}
