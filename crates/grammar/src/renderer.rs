//! Accumulates a rendered filter and its bound parameters.

use crate::{backend::Backend, ldap};
use model::core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiteralMode {
    /// Literals become placeholders with the value pushed to `params`.
    #[default]
    Bind,
    /// Literals are written into the text.
    Inline,
}

/// A fully rendered filter ready to hand to a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<Value>,
}

/// A context that holds the state during the rendering process.
///
/// It accumulates the filter text and the parameters, and knows the target
/// grammar for literal syntax.
pub struct Renderer<'a> {
    pub text: String,
    pub params: Vec<Value>,
    backend: &'a Backend,
    mode: LiteralMode,
}

impl<'a> Renderer<'a> {
    pub fn new(backend: &'a Backend, mode: LiteralMode) -> Self {
        Self {
            text: String::new(),
            params: Vec::new(),
            backend,
            mode,
        }
    }

    /// Consumes the renderer and returns the final statement.
    pub fn finish(self) -> Statement {
        Statement {
            text: self.text,
            params: self.params,
        }
    }

    pub fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Writes a literal. On a relational backend a collection expands into a
    /// comma separated list, one placeholder per element.
    pub fn add_literal(&mut self, value: &Value) {
        match self.backend {
            Backend::Relational(_) => match value {
                Value::Collection(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            self.text.push_str(", ");
                        }
                        self.add_scalar(item);
                    }
                }
                other => self.add_scalar(other),
            },
            Backend::Directory => {
                let text = ldap::escape_value(&ldap::value_text(value));
                self.text.push_str(&text);
            }
            Backend::None => self.text.push_str(&value.to_string()),
        }
    }

    fn add_scalar(&mut self, value: &Value) {
        match (self.mode, self.backend) {
            (LiteralMode::Bind, Backend::Relational(dialect)) => {
                self.params.push(value.clone());
                let placeholder = dialect.get_placeholder(self.params.len() - 1);
                self.text.push_str(&placeholder);
            }
            _ => self.text.push_str(&value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};

    #[test]
    fn test_bind_mode_numbers_postgres_placeholders() {
        let backend = Backend::relational(Postgres);
        let mut r = Renderer::new(&backend, LiteralMode::Bind);
        r.push_str("(object.a = ");
        r.add_literal(&Value::Int(1));
        r.push_str(" AND object.b IN (");
        r.add_literal(&Value::Collection(vec![Value::from("x"), Value::from("y")]));
        r.push_str("))");

        let stmt = r.finish();
        assert_eq!(stmt.text, "(object.a = $1 AND object.b IN ($2, $3))");
        assert_eq!(
            stmt.params,
            vec![Value::Int(1), Value::from("x"), Value::from("y")]
        );
    }

    #[test]
    fn test_inline_mode_writes_sql_literals() {
        let backend = Backend::relational(MySql);
        let mut r = Renderer::new(&backend, LiteralMode::Inline);
        r.add_literal(&Value::from("o'neil"));
        let stmt = r.finish();
        assert_eq!(stmt.text, "'o''neil'");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_directory_literals_are_escaped() {
        let backend = Backend::Directory;
        let mut r = Renderer::new(&backend, LiteralMode::Bind);
        r.push_str("(cn=");
        r.add_literal(&Value::from("a*b"));
        r.push_str(")");
        assert_eq!(r.finish().text, r"(cn=a\2ab)");
    }
}
