use serde::{Deserialize, Serialize};

/// Which pass produced the current recommendation. `None` until the first
/// successful run, then `Baseline`, then `Improved` for every later success.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    #[default]
    None,
    Baseline,
    Improved,
}

impl RunType {
    /// Run type that the next submission will request from the service.
    pub fn next_submission(self) -> Self {
        match self {
            Self::None => Self::Baseline,
            Self::Baseline | Self::Improved => Self::Improved,
        }
    }

    pub fn can_transition_to(self, next: RunType) -> bool {
        matches!(
            (self, next),
            (Self::None, Self::Baseline)
                | (Self::Baseline, Self::Improved)
                | (Self::Improved, Self::Improved)
        )
    }

    /// Wire tag sent to the recommendation service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Baseline => "baseline",
            Self::Improved => "improved",
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Baseline => Some("Run 1"),
            Self::Improved => Some("Run 2"),
        }
    }
}

impl std::fmt::Display for RunType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
