//! The generic library item aggregate.
//!
//! One aggregate instance is one versioned entity: its identity, its
//! library, its current content snapshot and the metadata of the currently
//! open version. Every lifecycle operation is side-effect-free: it returns a
//! new in-memory aggregate and persists nothing; durable state changes only
//! through the snapshot store's `save`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use mdr_model::{ItemAction, ItemStatus, ItemUid, Library, MdrError, Result, VersionMetadata};

use crate::content::ItemContent;

/// Default change descriptions stamped by the lifecycle operations.
pub const INITIAL_VERSION_LABEL: &str = "Initial version";
pub const NEW_VERSION_LABEL: &str = "New draft created";
pub const FINAL_VERSION_LABEL: &str = "Approved version";
pub const RETIRED_VERSION_LABEL: &str = "Inactivated version";
pub const REACTIVATED_VERSION_LABEL: &str = "Reactivated version";

/// A versioned library item: root identity + library + content snapshot +
/// open-version metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryItemAggregate<C> {
    uid: ItemUid,
    library: Library,
    content: C,
    metadata: VersionMetadata,
}

impl<C: ItemContent> LibraryItemAggregate<C> {
    /// Creates a brand-new draft item at version 0.1.
    ///
    /// Fails with `Forbidden` when the target library is not editable.
    pub fn create(
        uid: ItemUid,
        library: Library,
        content: C,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if !library.is_editable {
            return Err(MdrError::Forbidden(format!(
                "Creating items in the non-editable library '{}' is forbidden.",
                library.name
            )));
        }
        Ok(Self {
            uid,
            library,
            content,
            metadata: VersionMetadata::initial(actor, now),
        })
    }

    /// Rebuilds an aggregate from persisted state. No rules are re-checked;
    /// the store is trusted to hand back what it was given.
    pub fn from_repository_values(
        uid: ItemUid,
        library: Library,
        content: C,
        metadata: VersionMetadata,
    ) -> Self {
        Self {
            uid,
            library,
            content,
            metadata,
        }
    }

    pub fn uid(&self) -> &ItemUid {
        &self.uid
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn metadata(&self) -> &VersionMetadata {
        &self.metadata
    }

    /// Edits the current draft, bumping the minor version.
    ///
    /// Proposed content identical to the current snapshot (deep structural
    /// equality) is a no-op: the aggregate is returned unchanged, so no
    /// version bump and no new temporal edge are produced downstream.
    pub fn edit_draft(
        &self,
        actor: &str,
        content: C,
        change_description: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        self.assert_library_editable()?;
        if self.metadata.status != ItemStatus::Draft {
            return Err(MdrError::BusinessLogic(
                "The item is not in draft status.".into(),
            ));
        }
        if content == self.content {
            return Ok(self.clone());
        }
        Ok(Self {
            content,
            metadata: self
                .metadata
                .new_draft_version(actor, change_description, now)?,
            ..self.clone()
        })
    }

    /// Approves the current draft, producing the next major Final version.
    pub fn approve(&self, actor: &str, now: DateTime<Utc>) -> Result<Self> {
        self.assert_library_editable()?;
        if self.metadata.status != ItemStatus::Draft {
            return Err(MdrError::BusinessLogic(
                "Only DRAFT version can be approved.".into(),
            ));
        }
        Ok(Self {
            metadata: self
                .metadata
                .new_final_version(actor, FINAL_VERSION_LABEL, now)?,
            ..self.clone()
        })
    }

    /// Opens a new draft on top of the latest Final version, optionally with
    /// replacement content.
    pub fn create_new_version(
        &self,
        actor: &str,
        content: Option<C>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        self.assert_library_editable()?;
        if self.metadata.status != ItemStatus::Final {
            return Err(MdrError::BusinessLogic(
                "New draft version can be created only for FINAL versions.".into(),
            ));
        }
        Ok(Self {
            content: content.unwrap_or_else(|| self.content.clone()),
            metadata: self
                .metadata
                .new_draft_version(actor, NEW_VERSION_LABEL, now)?,
            ..self.clone()
        })
    }

    /// Retires the latest Final version; the version number is unchanged.
    pub fn inactivate(&self, actor: &str, now: DateTime<Utc>) -> Result<Self> {
        self.assert_library_editable()?;
        Ok(Self {
            metadata: self
                .metadata
                .new_retired_version(actor, RETIRED_VERSION_LABEL, now)?,
            ..self.clone()
        })
    }

    /// Brings a retired item back into circulation as Final, at the version
    /// it was retired with.
    pub fn reactivate(&self, actor: &str, now: DateTime<Utc>) -> Result<Self> {
        self.assert_library_editable()?;
        if self.metadata.status != ItemStatus::Retired {
            return Err(MdrError::BusinessLogic(
                "Only RETIRED version can be reactivated.".into(),
            ));
        }
        Ok(Self {
            metadata: self
                .metadata
                .new_final_version(actor, REACTIVATED_VERSION_LABEL, now)?,
            ..self.clone()
        })
    }

    /// Checks that the item may be deleted: still a draft and never approved
    /// (major version < 1). Once approved, an item is permanent history and
    /// can only be retired.
    pub fn assert_deletable(&self) -> Result<()> {
        if self.metadata.status == ItemStatus::Draft && self.metadata.version.major < 1 {
            return Ok(());
        }
        Err(MdrError::BusinessLogic(
            "The item has been accepted and can no longer be deleted.".into(),
        ))
    }

    /// Lifecycle operations legal in the item's current state.
    pub fn possible_actions(&self) -> BTreeSet<ItemAction> {
        let mut actions = BTreeSet::new();
        match self.metadata.status {
            ItemStatus::Draft => {
                actions.insert(ItemAction::Approve);
                actions.insert(ItemAction::Edit);
                if self.metadata.version.major < 1 {
                    actions.insert(ItemAction::Delete);
                }
            }
            ItemStatus::Final => {
                actions.insert(ItemAction::NewVersion);
                actions.insert(ItemAction::Inactivate);
            }
            ItemStatus::Retired => {
                actions.insert(ItemAction::Reactivate);
            }
        }
        actions
    }

    fn assert_library_editable(&self) -> Result<()> {
        if self.library.is_editable {
            return Ok(());
        }
        Err(MdrError::Forbidden(format!(
            "Library '{}' is not editable.",
            self.library.name
        )))
    }
}
