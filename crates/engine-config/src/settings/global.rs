use super::compiler::CompilerSettings;
use std::sync::RwLock;

/// Process-wide default settings, snapshotted by every new compiler
static SETTINGS: RwLock<Option<CompilerSettings>> = RwLock::new(None);

/// Install the process-wide default settings
pub fn init_settings(settings: CompilerSettings) {
    let mut guard = SETTINGS.write().unwrap_or_else(|e| e.into_inner());
    *guard = Some(settings);
}

/// Current process-wide settings, or the defaults when none were installed
pub fn current_settings() -> CompilerSettings {
    let guard = SETTINGS.read().unwrap_or_else(|e| e.into_inner());
    guard.clone().unwrap_or_default()
}

#[cfg(any(test, debug_assertions))]
pub fn clear_settings() {
    let mut guard = SETTINGS.write().unwrap_or_else(|e| e.into_inner());
    *guard = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_settings() {
        clear_settings();
        assert_eq!(current_settings(), CompilerSettings::default());

        init_settings(CompilerSettings {
            empty_string_is_null: true,
            ..CompilerSettings::default()
        });
        assert!(current_settings().empty_string_is_null);

        clear_settings();
        assert!(!current_settings().empty_string_is_null);
    }
}
