//! Target grammars a filter can be lowered into.

pub mod backend;
pub mod dialect;
pub mod ldap;
pub mod renderer;

pub use backend::{Backend, BackendKind, BackendSet};
pub use dialect::{ConcatStyle, Dialect};
pub use renderer::{LiteralMode, Renderer, Statement};
