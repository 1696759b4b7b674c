//! Defines the `Dialect` trait for database-specific SQL syntax.

/// How a dialect prefers string concatenation to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatStyle {
    /// Infix operator between every operand, e.g. `a || b || c`.
    Operator(&'static str),
    /// Binary function applied right-recursively, e.g. `concat(a,concat(b,c))`.
    Function(&'static str),
}

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect.
    ///
    /// - PostgreSQL uses double quotes: `"my_column"`
    /// - MySQL uses backticks: `` `my_column` ``
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for a parameterized query.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL and SQLite use `?`
    /// - Oracle uses `:1`, `:2`, etc.
    fn get_placeholder(&self, index: usize) -> String;

    /// Returns the name of the dialect (e.g., "PostgreSQL", "MySQL").
    fn name(&self) -> String;

    fn concat_style(&self) -> ConcatStyle;
}

#[derive(Debug, Clone, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{ident}""#)
    }

    fn get_placeholder(&self, index: usize) -> String {
        // PostgreSQL uses $1, $2, etc.
        format!("${}", index + 1)
    }

    fn name(&self) -> String {
        "PostgreSQL".into()
    }

    fn concat_style(&self) -> ConcatStyle {
        ConcatStyle::Operator("||")
    }
}

#[derive(Debug, Clone, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#"`{ident}`"#)
    }

    fn get_placeholder(&self, _index: usize) -> String {
        // MySQL uses ?
        "?".into()
    }

    fn name(&self) -> String {
        "MySQL".into()
    }

    fn concat_style(&self) -> ConcatStyle {
        // `||` is logical OR unless PIPES_AS_CONCAT is set
        ConcatStyle::Function("concat")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Oracle;

impl Dialect for Oracle {
    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{}""#, ident.to_uppercase())
    }

    fn get_placeholder(&self, index: usize) -> String {
        format!(":{}", index + 1)
    }

    fn name(&self) -> String {
        "Oracle".into()
    }

    fn concat_style(&self) -> ConcatStyle {
        ConcatStyle::Operator("||")
    }
}

/// SQLite understands both concat styles, the preferred one is configurable.
#[derive(Debug, Clone)]
pub struct Sqlite {
    concat: ConcatStyle,
}

impl Sqlite {
    pub fn with_concat_function() -> Self {
        Self {
            concat: ConcatStyle::Function("concat"),
        }
    }
}

impl Default for Sqlite {
    fn default() -> Self {
        Self {
            concat: ConcatStyle::Operator("||"),
        }
    }
}

impl Dialect for Sqlite {
    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{ident}""#)
    }

    fn get_placeholder(&self, _index: usize) -> String {
        "?".into()
    }

    fn name(&self) -> String {
        "SQLite".into()
    }

    fn concat_style(&self) -> ConcatStyle {
        self.concat
    }
}
