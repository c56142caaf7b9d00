use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// Fewer than two profiles selected.
    TooFewProfiles { selected: usize },
    /// The same profile appears twice in the selection.
    DuplicateProfile(String),
    /// A selected profile has no rows in the access index.
    UnknownProfile(String),
    /// The cancel token was set between two steps.
    Cancelled,
}

impl ReconError {
    /// True for the errors that reject a selection before any work is done.
    pub fn is_invalid_selection(&self) -> bool {
        matches!(
            self,
            Self::TooFewProfiles { .. } | Self::DuplicateProfile(_) | Self::UnknownProfile(_)
        )
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewProfiles { selected } => {
                write!(f, "invalid selection: at least 2 profiles required, got {selected}")
            }
            Self::DuplicateProfile(name) => {
                write!(f, "invalid selection: profile '{name}' selected more than once")
            }
            Self::UnknownProfile(name) => {
                write!(f, "invalid selection: unknown profile '{name}'")
            }
            Self::Cancelled => write!(f, "reconciliation cancelled"),
        }
    }
}

impl std::error::Error for ReconError {}
