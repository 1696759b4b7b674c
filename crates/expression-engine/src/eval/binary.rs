use crate::{
    error::{ExpressionError, Result},
    functions::FunctionId,
};
use model::core::value::Value;
use std::cmp::Ordering;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

impl BinaryOp {
    pub fn from_function(id: FunctionId) -> Option<BinaryOp> {
        Some(match id {
            FunctionId::Add => BinaryOp::Add,
            FunctionId::Sub => BinaryOp::Subtract,
            FunctionId::Mul => BinaryOp::Multiply,
            FunctionId::Div => BinaryOp::Divide,
            FunctionId::Mod => BinaryOp::Modulo,
            FunctionId::Eq => BinaryOp::Equal,
            FunctionId::Ne => BinaryOp::NotEqual,
            FunctionId::Gt => BinaryOp::GreaterThan,
            FunctionId::Lt => BinaryOp::LessThan,
            FunctionId::Ge => BinaryOp::GreaterOrEqual,
            FunctionId::Le => BinaryOp::LessOrEqual,
            _ => return None,
        })
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual)
    }

    /// The operator that holds with the operands swapped.
    pub fn flip(self) -> BinaryOp {
        match self {
            BinaryOp::GreaterThan => BinaryOp::LessThan,
            BinaryOp::LessThan => BinaryOp::GreaterThan,
            BinaryOp::GreaterOrEqual => BinaryOp::LessOrEqual,
            BinaryOp::LessOrEqual => BinaryOp::GreaterOrEqual,
            other => other,
        }
    }

    pub fn sql_token(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::GreaterThan => ">",
            BinaryOp::LessThan => "<",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::LessOrEqual => "<=",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            BinaryOp::Equal => ordering == Ordering::Equal,
            BinaryOp::NotEqual => ordering != Ordering::Equal,
            BinaryOp::GreaterThan => ordering == Ordering::Greater,
            BinaryOp::LessThan => ordering == Ordering::Less,
            BinaryOp::GreaterOrEqual => ordering != Ordering::Less,
            BinaryOp::LessOrEqual => ordering != Ordering::Greater,
            _ => false,
        }
    }
}

/// Binary operation evaluator that handles different value type combinations
pub(crate) struct BinaryOpEvaluator<'a> {
    left: &'a Value,
    right: &'a Value,
    op: BinaryOp,
}

impl<'a> BinaryOpEvaluator<'a> {
    pub fn new(left: &'a Value, right: &'a Value, op: BinaryOp) -> Self {
        Self { left, right, op }
    }

    pub fn evaluate(&self) -> Result<Value> {
        if self.op.is_arithmetic() {
            self.eval_arithmetic()
        } else {
            Ok(Value::Boolean(self.eval_comparison()))
        }
    }

    fn eval_comparison(&self) -> bool {
        use Value::*;

        match (self.left, self.right) {
            (Collection(_), _) | (_, Collection(_)) if self.op == BinaryOp::NotEqual => {
                !BinaryOpEvaluator::new(self.left, self.right, BinaryOp::Equal).eval_comparison()
            }
            (Collection(l), Collection(r)) if self.op == BinaryOp::Equal => {
                l.len() == r.len() && l.iter().zip(r).all(|(a, b)| self.scalar(a, b))
            }
            (Collection(items), other) => items.iter().any(|item| self.scalar(item, other)),
            (other, Collection(items)) => items.iter().any(|item| self.scalar(other, item)),
            (l, r) => self.scalar(l, r),
        }
    }

    fn scalar(&self, l: &Value, r: &Value) -> bool {
        match (l, r) {
            (Value::Null, Value::Null) => self.eval_null_null(),
            (Value::Null, _) | (_, Value::Null) => self.eval_null_other(),
            _ => match l.compare(r) {
                Some(ordering) => self.op.holds(ordering),
                // Incomparable values are simply unequal
                None => self.op == BinaryOp::NotEqual,
            },
        }
    }

    fn eval_null_null(&self) -> bool {
        self.op == BinaryOp::Equal
    }

    fn eval_null_other(&self) -> bool {
        self.op == BinaryOp::NotEqual
    }

    fn eval_arithmetic(&self) -> Result<Value> {
        use Value::*;

        match (self.left, self.right) {
            (Null, _) | (_, Null) => Ok(Null),
            (Int(l), Int(r)) => self.eval_int(*l, *r),
            (Int(_) | Float(_), Int(_) | Float(_)) => self.eval_float(),
            (l, r) => {
                warn!("Unsupported arithmetic operands: {:?} {:?} {:?}", l, self.op, r);
                Err(ExpressionError::type_mismatch(
                    "number",
                    format!("{} {} {}", l.value_type(), self.op.sql_token(), r.value_type()),
                ))
            }
        }
    }

    fn eval_int(&self, l: i64, r: i64) -> Result<Value> {
        let result = match self.op {
            BinaryOp::Add => l.checked_add(r),
            BinaryOp::Subtract => l.checked_sub(r),
            BinaryOp::Multiply => l.checked_mul(r),
            BinaryOp::Divide | BinaryOp::Modulo if r == 0 => {
                return Err(ExpressionError::EvaluationFailed("division by zero".into()));
            }
            BinaryOp::Divide => l.checked_div(r),
            BinaryOp::Modulo => l.checked_rem(r),
            _ => None,
        };
        result
            .map(Value::Int)
            .ok_or_else(|| ExpressionError::EvaluationFailed(format!("integer overflow in {l} {} {r}", self.op.sql_token())))
    }

    fn eval_float(&self) -> Result<Value> {
        let (Some(l), Some(r)) = (self.left.as_f64(), self.right.as_f64()) else {
            return Err(ExpressionError::Internal("non-numeric float operand".into()));
        };

        Ok(Value::Float(match self.op {
            BinaryOp::Add => l + r,
            BinaryOp::Subtract => l - r,
            BinaryOp::Multiply => l * r,
            BinaryOp::Divide | BinaryOp::Modulo if r == 0.0 => {
                return Err(ExpressionError::EvaluationFailed("division by zero".into()));
            }
            BinaryOp::Divide => l / r,
            BinaryOp::Modulo => l % r,
            _ => return Err(ExpressionError::Internal(format!("{:?} is not arithmetic", self.op))),
        }))
    }
}
