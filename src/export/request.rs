use crate::error::InvalidParameters;

pub const DEFAULT_BASENAME: &str = "cyber-container";

/// One export, consumed exactly once by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRequest {
    /// Width and height of the square output, in pixels.
    pub target_size: u32,
    pub filename: Option<String>,
}

impl ExportRequest {
    pub fn new(target_size: u32, filename: Option<impl Into<String>>) -> Self {
        Self {
            target_size,
            filename: filename.map(Into::into),
        }
    }

    pub fn validate(&self) -> Result<(), InvalidParameters> {
        if self.target_size == 0 {
            return Err(InvalidParameters::new("export size must be positive"));
        }
        if let Some(name) = &self.filename {
            let stem = name.trim();
            if stem.is_empty() || stem.eq_ignore_ascii_case(".png") {
                return Err(InvalidParameters::new("export filename is empty"));
            }
            if stem.contains(['/', '\\']) || stem == "." || stem == ".." {
                return Err(InvalidParameters::new(format!(
                    "export filename {name:?} must not contain a path"
                )));
            }
        }
        Ok(())
    }

    /// `<name>.png` is used as given; a bare `<name>` becomes `<name>-<size>.png`,
    /// and no name at all falls back to `<default_basename>-<size>.png`.
    pub fn resolved_filename(&self, default_basename: &str) -> String {
        match self.filename.as_deref().map(str::trim) {
            Some(name) if name.to_ascii_lowercase().ends_with(".png") => name.to_string(),
            Some(name) => format!("{name}-{}.png", self.target_size),
            None => format!("{default_basename}-{}.png", self.target_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames() {
        assert_eq!(
            ExportRequest::new(1024, Some("icon")).resolved_filename(DEFAULT_BASENAME),
            "icon-1024.png"
        );
        assert_eq!(
            ExportRequest::new(7680, None::<String>).resolved_filename(DEFAULT_BASENAME),
            "cyber-container-7680.png"
        );
        assert_eq!(
            ExportRequest::new(512, Some("poster.PNG")).resolved_filename(DEFAULT_BASENAME),
            "poster.PNG"
        );
        assert_eq!(
            ExportRequest::new(512, None::<String>).resolved_filename("crate"),
            "crate-512.png"
        );
    }

    #[test]
    fn rejects_bad_requests() {
        assert!(ExportRequest::new(0, None::<String>).validate().is_err());
        assert!(ExportRequest::new(64, Some("  ")).validate().is_err());
        assert!(ExportRequest::new(64, Some("../etc/x")).validate().is_err());
        assert!(ExportRequest::new(64, Some(".png")).validate().is_err());
        assert!(ExportRequest::new(64, Some("ok")).validate().is_ok());
    }
}
