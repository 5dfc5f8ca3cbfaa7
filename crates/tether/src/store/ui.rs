use tether_api::{BridgeError, BridgeResult};

/// UI layer fed with the artifacts derived from each type's schema.
///
/// The bridge supplies the content but never interprets it.
pub trait UiLayer {
    /// Load the labels and help text carried by a model description
    fn load_language(&mut self, model: &str) -> BridgeResult<()>;

    /// Load a layout description
    fn load_ui(&mut self, ui: &str) -> BridgeResult<()>;
}

/// Keeps every loaded artifact so hosts and tests can inspect them.
#[derive(Debug, Default, Clone)]
pub struct MemoryUiLayer {
    languages: Vec<String>,
    layouts: Vec<String>,
}

impl MemoryUiLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn layouts(&self) -> &[String] {
        &self.layouts
    }
}

impl UiLayer for MemoryUiLayer {
    fn load_language(&mut self, model: &str) -> BridgeResult<()> {
        self.languages.push(model.to_string());
        Ok(())
    }

    fn load_ui(&mut self, ui: &str) -> BridgeResult<()> {
        if !ui.trim_start().starts_with('<') {
            return Err(BridgeError::InvalidValue {
                message: "layout description is not markup".to_string(),
            });
        }
        self.layouts.push(ui.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_ui_layer_keeps_artifacts() {
        let mut ui = MemoryUiLayer::new();
        ui.load_language("Source:\n  Count:\n    type: integer\n")
            .unwrap();
        ui.load_ui("<layout id=\"Source\" />").unwrap();
        assert_eq!(ui.languages().len(), 1);
        assert_eq!(ui.layouts(), &["<layout id=\"Source\" />"]);
    }

    #[test]
    fn test_memory_ui_layer_rejects_non_markup() {
        let mut ui = MemoryUiLayer::new();
        assert!(ui.load_ui("layout: none").is_err());
        assert!(ui.layouts().is_empty());
    }
}
