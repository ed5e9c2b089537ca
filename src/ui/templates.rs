//! Template image locations

use std::path::{Path, PathBuf};

use super::UiError;
use crate::config::UiConfig;

/// The two template images the bridge looks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    /// Shown when the assistant is idle and will take a new prompt
    pub ready: PathBuf,
    /// Label next to the prompt input field
    pub input_label: PathBuf,
}

impl TemplateSet {
    /// Both files must exist; a missing one is a setup error
    pub fn new(ready: impl Into<PathBuf>, input_label: impl Into<PathBuf>) -> Result<Self, UiError> {
        let set = Self {
            ready: ready.into(),
            input_label: input_label.into(),
        };
        require_file(&set.ready)?;
        require_file(&set.input_label)?;
        Ok(set)
    }

    pub fn resolve(config: &UiConfig) -> Result<Self, UiError> {
        Self::new(config.ready_template_path(), config.input_template_path())
    }
}

fn require_file(path: &Path) -> Result<(), UiError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(UiError::MissingTemplate(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(dir: &Path) -> UiConfig {
        UiConfig {
            templates_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_with_both_templates() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("start_again.png"), b"png").unwrap();
        fs::write(temp_dir.path().join("type_your.png"), b"png").unwrap();

        let set = TemplateSet::resolve(&config_for(temp_dir.path())).unwrap();
        assert_eq!(set.ready, temp_dir.path().join("start_again.png"));
        assert_eq!(set.input_label, temp_dir.path().join("type_your.png"));
    }

    #[test]
    fn test_missing_ready_template() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("type_your.png"), b"png").unwrap();

        match TemplateSet::resolve(&config_for(temp_dir.path())) {
            Err(UiError::MissingTemplate(path)) => assert!(path.ends_with("start_again.png")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_input_template() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("start_again.png"), b"png").unwrap();

        match TemplateSet::resolve(&config_for(temp_dir.path())) {
            Err(UiError::MissingTemplate(path)) => assert!(path.ends_with("type_your.png")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_directory_is_not_a_template() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("start_again.png")).unwrap();
        fs::write(temp_dir.path().join("type_your.png"), b"png").unwrap();
        assert!(TemplateSet::resolve(&config_for(temp_dir.path())).is_err());
    }
}
