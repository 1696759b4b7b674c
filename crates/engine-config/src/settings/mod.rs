pub mod compiler;
pub mod global;
