//! Transient user-facing notifications (toasts)

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Destructive,
}

/// A short notification shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub title: Option<String>,
    pub description: String,
}

impl Notice {
    pub fn info(description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            title: None,
            description: description.into(),
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            title: Some(title.into()),
            description: description.into(),
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Destructive,
            title: Some(title.into()),
            description: description.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Destructive
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.title {
            Some(ref title) => write!(f, "{}: {}", title, self.description),
            None => f.write_str(&self.description),
        }
    }
}
