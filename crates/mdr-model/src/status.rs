use std::fmt;
use std::str::FromStr;

use crate::{MdrError, Result};

/// Lifecycle status of a library item version.
///
/// Persisted as the literal strings `"Draft"`, `"Final"`, `"Retired"`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ItemStatus {
    Draft,
    Final,
    Retired,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Final => "Final",
            Self::Retired => "Retired",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = MdrError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "Draft" => Ok(Self::Draft),
            "Final" => Ok(Self::Final),
            "Retired" => Ok(Self::Retired),
            other => Err(MdrError::Validation(format!(
                "'{other}' is not a valid item status (expected Draft, Final or Retired)."
            ))),
        }
    }
}

/// Lifecycle operations that can change an item's status.
///
/// Reported by the aggregate so clients can render the actions available
/// in the item's current state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ItemAction {
    Approve,
    Edit,
    Delete,
    NewVersion,
    Inactivate,
    Reactivate,
}
