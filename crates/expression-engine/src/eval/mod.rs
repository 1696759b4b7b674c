pub mod binary;
pub mod wildcard;
