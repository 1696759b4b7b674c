//! The expression tree and its three core operations: classification,
//! in-process evaluation and filter emission.

use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    filter::{FilterPart, generator::ValueGenerator},
    functions::FunctionId,
    lower,
};
use model::core::{value::Value, value_type::ValueType};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::trace;

/// A dotted name such as `object.owner.name`. The first segment is the base
/// that decides how the name is classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn parse(raw: &str) -> Result<Self> {
        let segments = raw
            .split('.')
            .map(|s| s.trim().to_string())
            .collect::<Vec<_>>();
        if !segments.iter().all(|segment| is_identifier(segment)) {
            return Err(ExpressionError::Parse(format!("invalid name '{raw}'")));
        }
        Ok(Self { segments })
    }

    pub fn base(&self) -> &str {
        &self.segments[0]
    }

    /// Segments below the base.
    pub fn rest(&self) -> &[String] {
        &self.segments[1..]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The part below the base joined back together, i.e. the attribute name
    /// a backend sees.
    pub fn attribute(&self) -> String {
        self.rest().join(".")
    }
}

/// Segments are written into filter text as-is, so only plain identifiers
/// (`[A-Za-z_][A-Za-z0-9_]*`) are accepted.
fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for Path {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = ExpressionError;

    fn try_from(value: String) -> Result<Self> {
        Path::parse(&value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// How an operand's value becomes known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Known now, without any input.
    Static,
    /// Differs per backend row; only the backend can test it.
    Variable,
    /// Known once at query time, the same for every row.
    NonStatic,
}

impl Classification {
    /// Variable dominates NonStatic, which dominates Static.
    pub fn combine(self, other: Classification) -> Classification {
        use Classification::*;
        match (self, other) {
            (Variable, _) | (_, Variable) => Variable,
            (NonStatic, _) | (_, NonStatic) => NonStatic,
            (Static, Static) => Static,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Literal(#[serde(with = "literal_json")] Value),
    Name {
        path: Path,
        #[serde(default)]
        value_type: ValueType,
    },
    List(Vec<Operand>),
    Call {
        function: FunctionId,
        #[serde(default)]
        operands: Vec<Operand>,
    },
}

impl Operand {
    /// A name operand from a dotted path such as `portal.user.groups`.
    pub fn parse_name(path: &str, value_type: ValueType) -> Result<Self> {
        Ok(Operand::Name {
            path: Path::parse(path)?,
            value_type,
        })
    }

    pub fn classify(&self, ctx: &QueryContext<'_>) -> Classification {
        match self {
            Operand::Literal(_) => Classification::Static,
            Operand::Name { path, .. } => {
                if path.base() == ctx.object_prefix() {
                    Classification::Variable
                } else {
                    Classification::NonStatic
                }
            }
            Operand::List(items) => classify_all(ctx, items),
            Operand::Call { function, operands } => {
                let inner = classify_all(ctx, operands);
                match ctx.registry().handler(*function) {
                    Ok(handler) if !handler.supports_static_evaluation() => {
                        inner.combine(Classification::NonStatic)
                    }
                    _ => inner,
                }
            }
        }
    }

    /// The type this operand is declared to produce.
    pub fn value_type(&self, ctx: &QueryContext<'_>) -> ValueType {
        match self {
            Operand::Literal(value) => value.value_type(),
            Operand::Name { value_type, .. } => *value_type,
            Operand::List(_) => ValueType::Collection,
            Operand::Call { function, .. } => ctx
                .registry()
                .handler(*function)
                .map(|handler| handler.result_type(*function))
                .unwrap_or_default(),
        }
    }

    /// Evaluates in-process against the context's resolver.
    pub fn evaluate(&self, ctx: &QueryContext<'_>, expected: ValueType) -> Result<Value> {
        let value = match self {
            Operand::Literal(value) => value.clone(),
            Operand::Name { path, .. } => ctx.resolve(path)?,
            Operand::List(items) => Value::Collection(
                items
                    .iter()
                    .map(|item| item.evaluate(ctx, ValueType::Any))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Operand::Call { function, operands } => {
                ctx.registry()
                    .evaluate(*function, ctx, operands, expected)?
            }
        };
        coerce(value, expected)
    }

    /// Appends this operand's filter text to `part`.
    pub fn emit(
        &self,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        expected: ValueType,
    ) -> Result<()> {
        match self {
            Operand::Call { function, operands } => {
                ctx.registry().emit(*function, ctx, part, operands, expected)
            }
            _ => match self.classify(ctx) {
                Classification::Static => {
                    let value = self.evaluate(ctx, expected)?;
                    if expected == ValueType::Boolean {
                        part.push_constant(value.as_bool().unwrap_or(false));
                    } else {
                        part.push_literal(value);
                    }
                    Ok(())
                }
                Classification::NonStatic => {
                    trace!(operand = %self, "Deferring operand to query time");
                    part.push_generator(ValueGenerator::new(self.clone(), expected));
                    Ok(())
                }
                Classification::Variable => self.emit_variable(ctx, part, expected),
            },
        }
    }

    fn emit_variable(
        &self,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        expected: ValueType,
    ) -> Result<()> {
        match self {
            Operand::Name { path, .. } => lower::attribute(ctx, part, path, expected),
            Operand::List(items) => lower::list(ctx, part, items),
            Operand::Literal(_) | Operand::Call { .. } => Err(ExpressionError::Internal(format!(
                "'{self}' cannot be emitted as an attribute"
            ))),
        }
    }

    pub fn is_variable(&self, ctx: &QueryContext<'_>) -> bool {
        self.classify(ctx) == Classification::Variable
    }

    /// The name path when this operand is a plain name.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Operand::Name { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn classify_all(ctx: &QueryContext<'_>, operands: &[Operand]) -> Classification {
    operands
        .iter()
        .map(|operand| operand.classify(ctx))
        .fold(Classification::Static, Classification::combine)
}

fn coerce(value: Value, expected: ValueType) -> Result<Value> {
    if expected == ValueType::Any {
        return Ok(value);
    }
    let actual = value.value_type();
    value
        .coerce(expected)
        .ok_or_else(|| ExpressionError::type_mismatch(expected, actual))
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(Value::String(s)) => write!(f, "\"{s}\""),
            Operand::Literal(value) => write!(f, "{value}"),
            Operand::Name { path, .. } => write!(f, "{path}"),
            Operand::List(items) => {
                let items = items.iter().map(|i| i.to_string()).collect::<Vec<_>>();
                write!(f, "[{}]", items.join(", "))
            }
            Operand::Call { function, operands } => {
                let args = operands.iter().map(|o| o.to_string()).collect::<Vec<_>>();
                write!(f, "{}({})", function.name(), args.join(", "))
            }
        }
    }
}

/// Literals travel as plain JSON values.
mod literal_json {
    use model::core::value::Value;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_json().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
