use crate::dialect::{Dialect, MySql, Oracle, Postgres, Sqlite};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// The grammar a filter is lowered into.
#[derive(Clone)]
pub enum Backend {
    /// SQL-like target; the dialect decides placeholders and concat style.
    Relational(Arc<dyn Dialect>),
    /// LDAP filter strings (RFC 4515).
    Directory,
    /// No backend: expressions are evaluated in-process only.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Relational,
    Directory,
    None,
}

bitflags! {
    /// Backends a function can be lowered for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BackendSet: u8 {
        const RELATIONAL = 0b0000_0001;
        const DIRECTORY  = 0b0000_0010;
    }
}

impl BackendSet {
    /// `BackendKind::None` never supports filter generation.
    pub fn supports(self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Relational => self.contains(BackendSet::RELATIONAL),
            BackendKind::Directory => self.contains(BackendSet::DIRECTORY),
            BackendKind::None => false,
        }
    }
}

impl Backend {
    pub fn relational(dialect: impl Dialect + 'static) -> Self {
        Backend::Relational(Arc::new(dialect))
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Relational(_) => BackendKind::Relational,
            Backend::Directory => BackendKind::Directory,
            Backend::None => BackendKind::None,
        }
    }

    /// Resolves a backend by its short name as used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Backend::relational(Postgres)),
            "mysql" => Some(Backend::relational(MySql)),
            "oracle" => Some(Backend::relational(Oracle)),
            "sqlite" => Some(Backend::relational(Sqlite::default())),
            "ldap" | "directory" => Some(Backend::Directory),
            "none" => Some(Backend::None),
            _ => None,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Relational(dialect) => write!(f, "Relational({})", dialect.name()),
            Backend::Directory => f.write_str("Directory"),
            Backend::None => f.write_str("None"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Relational => f.write_str("relational"),
            BackendKind::Directory => f.write_str("directory"),
            BackendKind::None => f.write_str("no backend"),
        }
    }
}
