pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{
    compiler::CompilerSettings,
    global::{current_settings, init_settings},
};
