use cyber_container::ExportRequest;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

pub struct UiState {
    pub presets: Vec<u32>,
    pub selected_preset: usize,
    /// Empty means "use the default basename".
    pub filename: String,
    pub default_basename: String,
    pub vsync_enabled: bool,
    pub show_stats: bool,
    pub status: Option<StatusLine>,
}

impl UiState {
    pub fn new(presets: Vec<u32>, default_basename: &str) -> Self {
        // 1024 is the usual pick; fall back to the first preset
        let selected_preset = presets.iter().position(|&p| p == 1024).unwrap_or(0);
        Self {
            presets,
            selected_preset,
            filename: default_basename.to_string(),
            default_basename: default_basename.to_string(),
            vsync_enabled: true,
            show_stats: true,
            status: None,
        }
    }

    pub fn selected_size(&self) -> Option<u32> {
        self.presets.get(self.selected_preset).copied()
    }

    pub fn requested_filename(&self) -> Option<String> {
        let name = self.filename.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Name the selected export will be saved under.
    pub fn preview_filename(&self) -> Option<String> {
        let size = self.selected_size()?;
        Some(ExportRequest::new(size, self.requested_filename()).resolved_filename(&self.default_basename))
    }

    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusLine {
            text: text.into(),
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_matches_export_naming() {
        let mut state = UiState::new(vec![512, 1024, 7680], "cyber-container");
        assert_eq!(state.preview_filename().as_deref(), Some("cyber-container-1024.png"));

        state.filename = "  icon ".to_string();
        assert_eq!(state.preview_filename().as_deref(), Some("icon-1024.png"));

        state.filename = "Poster.PNG".to_string();
        state.selected_preset = 2;
        assert_eq!(state.preview_filename().as_deref(), Some("Poster.PNG"));

        state.filename.clear();
        assert_eq!(state.preview_filename().as_deref(), Some("cyber-container-7680.png"));
    }

    #[test]
    fn no_preview_without_presets() {
        let state = UiState::new(Vec::new(), "cyber-container");
        assert_eq!(state.preview_filename(), None);
    }
}
