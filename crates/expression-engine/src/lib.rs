//! Lowers backend-agnostic expression trees into relational or directory
//! filters, or evaluates them in-process.

#[cfg(any(test, feature = "test-support"))]
pub mod builder;
pub mod compiler;
pub mod context;
pub mod datasource;
pub mod error;
pub mod eval;
pub mod filter;
pub mod functions;
pub mod lower;
pub mod operand;
pub mod postprocess;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use compiler::{Compiler, DatasourceFilter};
pub use context::QueryContext;
pub use datasource::{Datasource, JsonRuleParser, RuleParser};
pub use error::{ExpressionError, Result};
pub use filter::{FilterPart, ResolvedFilter, generator::Generator};
pub use functions::{Arity, Function, FunctionId, registry::FunctionRegistry};
pub use operand::{Classification, Operand, Path};
pub use postprocess::{PostProcessor, PostProcessorRegistry};
pub use resolver::{EmptyResolver, MapResolver, Resolver, ScopedResolver};
