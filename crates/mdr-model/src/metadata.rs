//! Version metadata: the projection of the currently open temporal edge.

use chrono::{DateTime, Utc};

use crate::{ItemStatus, MdrError, Result, VersionNumber};

/// Versioning metadata for one library item version.
///
/// Mirrors the temporal edge in storage: status, version number, validity
/// interval, author and change description. Instances are immutable; every
/// transition produces a new value with a fresh open interval.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VersionMetadata {
    pub status: ItemStatus,
    pub version: VersionNumber,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub author: String,
    pub change_description: String,
}

impl VersionMetadata {
    /// Metadata for a freshly created item: Draft at version 0.1.
    pub fn initial(author: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: ItemStatus::Draft,
            version: VersionNumber::INITIAL,
            start_date: now,
            end_date: None,
            author: author.into(),
            change_description: "Initial version".into(),
        }
    }

    pub fn from_repository_values(
        status: ItemStatus,
        version: VersionNumber,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
        author: impl Into<String>,
        change_description: impl Into<String>,
    ) -> Self {
        Self {
            status,
            version,
            start_date,
            end_date,
            author: author.into(),
            change_description: change_description.into(),
        }
    }

    /// A new draft version. Legal from Draft (edit, minor bump) and from
    /// Final (new version after approval, minor bump).
    pub fn new_draft_version(
        &self,
        author: &str,
        change_description: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let version = match self.status {
            ItemStatus::Draft | ItemStatus::Final => self.version.next_minor(),
            ItemStatus::Retired => {
                return Err(MdrError::BusinessLogic(
                    "Cannot create a new Draft version for a RETIRED item.".into(),
                ));
            }
        };
        Ok(self.next(ItemStatus::Draft, version, author, change_description, now))
    }

    /// A new final version. Legal from Draft (approval, major bump) and from
    /// Retired (reactivation, version unchanged).
    pub fn new_final_version(
        &self,
        author: &str,
        change_description: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let version = match self.status {
            ItemStatus::Draft => self.version.next_major(),
            ItemStatus::Retired => self.version,
            ItemStatus::Final => {
                return Err(MdrError::BusinessLogic(
                    "The item is already in FINAL status.".into(),
                ));
            }
        };
        Ok(self.next(ItemStatus::Final, version, author, change_description, now))
    }

    /// A new retired version. Legal only from Final; the version number is
    /// carried over unchanged.
    pub fn new_retired_version(
        &self,
        author: &str,
        change_description: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        match self.status {
            ItemStatus::Final => Ok(self.next(
                ItemStatus::Retired,
                self.version,
                author,
                change_description,
                now,
            )),
            ItemStatus::Draft | ItemStatus::Retired => Err(MdrError::BusinessLogic(
                "Cannot retire a version that is not in FINAL status.".into(),
            )),
        }
    }

    fn next(
        &self,
        status: ItemStatus,
        version: VersionNumber,
        author: &str,
        change_description: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status,
            version,
            start_date: now,
            end_date: None,
            author: author.to_string(),
            change_description: change_description.to_string(),
        }
    }
}
