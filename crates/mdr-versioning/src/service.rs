//! Thin service layer composing the aggregate, the snapshot store and the
//! audit reconstructor into the operations exposed to the REST
//! collaborators. Returns plain data records, never store handles.
//!
//! Every mutating method takes an explicit `actor`; there is no ambient
//! author context.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use mdr_model::{
    ItemAction, ItemStatus, ItemUid, Library, MdrError, Result, VersionMetadata,
};

use crate::aggregate::LibraryItemAggregate;
use crate::audit::{self, VersionRecord};
use crate::content::ItemContent;
use crate::store::{ItemQuery, ItemRepository};

/// Plain data view of one library item version.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ItemRecord<C> {
    pub uid: ItemUid,
    pub library_name: String,
    pub content: C,
    #[serde(flatten)]
    pub metadata: VersionMetadata,
    pub possible_actions: BTreeSet<ItemAction>,
}

impl<C: ItemContent> ItemRecord<C> {
    fn from_aggregate(aggregate: &LibraryItemAggregate<C>) -> Self {
        Self {
            uid: aggregate.uid().clone(),
            library_name: aggregate.library().name.clone(),
            content: aggregate.content().clone(),
            metadata: aggregate.metadata().clone(),
            possible_actions: aggregate.possible_actions(),
        }
    }
}

/// Lifecycle operations over one entity type, backed by a repository.
#[derive(Debug)]
pub struct VersioningService<C, R> {
    repository: R,
    _content: std::marker::PhantomData<C>,
}

impl<C: ItemContent, R: ItemRepository<C>> VersioningService<C, R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            _content: std::marker::PhantomData,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Creates a new draft item in `library_name` at version 0.1.
    pub fn create(&self, library_name: &str, content: C, actor: &str) -> Result<ItemRecord<C>> {
        let library = Library::from_editability_lookup(library_name, |name| {
            self.repository.is_library_editable(name)
        })?;
        let uid = self.repository.generate_uid();
        tracing::debug!(uid = %uid, library = library_name, actor, "creating library item");
        let aggregate =
            LibraryItemAggregate::create(uid, library, content, actor, Utc::now())?;
        let created = self.repository.create(&aggregate)?;
        Ok(ItemRecord::from_aggregate(&created))
    }

    /// Edits the current draft. Identical content is a no-op: the current
    /// record is returned and no new version is written.
    pub fn edit(
        &self,
        uid: &ItemUid,
        content: C,
        change_description: &str,
        actor: &str,
    ) -> Result<ItemRecord<C>> {
        self.mutate(uid, actor, "edit", |aggregate, now| {
            aggregate.edit_draft(actor, content.clone(), change_description, now)
        })
    }

    /// Approves the current draft. Fails while the item is referenced by
    /// dependent items.
    pub fn approve(&self, uid: &ItemUid, actor: &str) -> Result<ItemRecord<C>> {
        tracing::debug!(uid = %uid, actor, action = "approve", "library item transition");
        // The token is captured before the usage check; a reference landing
        // afterwards advances the revision and fails the save.
        let mut loaded = self.repository.find_by_uid(uid, &ItemQuery::latest(), true)?;
        let usage = self.repository.check_usage_count(uid)?;
        if usage > 0 {
            return Err(MdrError::BusinessLogic(format!(
                "Library item '{uid}' is referenced by {usage} dependent item(s) and cannot be \
                 approved."
            )));
        }
        loaded.aggregate = loaded.aggregate.approve(actor, Utc::now())?;
        let saved = self.repository.save(&loaded)?;
        Ok(ItemRecord::from_aggregate(&saved))
    }

    /// Opens a new draft version on top of the latest Final version.
    pub fn create_new_version(
        &self,
        uid: &ItemUid,
        content: Option<C>,
        actor: &str,
    ) -> Result<ItemRecord<C>> {
        self.mutate(uid, actor, "create_new_version", |aggregate, now| {
            aggregate.create_new_version(actor, content.clone(), now)
        })
    }

    /// Retires the latest Final version.
    pub fn inactivate(&self, uid: &ItemUid, actor: &str) -> Result<ItemRecord<C>> {
        self.mutate(uid, actor, "inactivate", |aggregate, now| {
            aggregate.inactivate(actor, now)
        })
    }

    /// Reactivates a retired item back to Final.
    pub fn reactivate(&self, uid: &ItemUid, actor: &str) -> Result<ItemRecord<C>> {
        self.mutate(uid, actor, "reactivate", |aggregate, now| {
            aggregate.reactivate(actor, now)
        })
    }

    /// Permanently removes a never-approved draft, its root identity and
    /// all its edges.
    pub fn delete(&self, uid: &ItemUid) -> Result<()> {
        let loaded = self
            .repository
            .find_by_uid(uid, &ItemQuery::latest(), false)?;
        loaded.aggregate.assert_deletable()?;
        let usage = self.repository.check_usage_count(uid)?;
        if usage > 0 {
            return Err(MdrError::BusinessLogic(format!(
                "Library item '{uid}' is referenced by {usage} dependent item(s) and cannot be \
                 deleted."
            )));
        }
        // The store re-checks both guards under its write lock.
        self.repository.delete(uid)
    }

    /// Resolves one version of the item per the query filters (current
    /// state when the query is empty).
    pub fn get_by_uid(&self, uid: &ItemUid, query: &ItemQuery) -> Result<ItemRecord<C>> {
        let loaded = self.repository.find_by_uid(uid, query, false)?;
        Ok(ItemRecord::from_aggregate(&loaded.aggregate))
    }

    /// The item's full audit trail, newest first, with per-field
    /// changed-flags.
    pub fn get_version_history(&self, uid: &ItemUid) -> Result<Vec<VersionRecord<C>>> {
        Ok(audit::with_changes(self.raw_history(uid)?))
    }

    /// Final versions whose validity interval contains `at_time`.
    pub fn get_releases(
        &self,
        uid: &ItemUid,
        at_time: DateTime<Utc>,
    ) -> Result<Vec<VersionRecord<C>>> {
        Ok(audit::releases_at(self.raw_history(uid)?, at_time))
    }

    /// Current state of all items, optionally filtered.
    pub fn find_all(
        &self,
        status: Option<ItemStatus>,
        library: Option<&str>,
    ) -> Result<Vec<ItemRecord<C>>> {
        Ok(self
            .repository
            .find_all(status, library)?
            .iter()
            .map(ItemRecord::from_aggregate)
            .collect())
    }

    fn raw_history(&self, uid: &ItemUid) -> Result<Vec<VersionRecord<C>>> {
        let library_name = self
            .repository
            .find_by_uid(uid, &ItemQuery::latest(), false)?
            .aggregate
            .library()
            .name
            .clone();
        Ok(self
            .repository
            .all_versions(uid)?
            .into_iter()
            .map(|(content, metadata)| {
                VersionRecord::new(uid.clone(), library_name.clone(), content, metadata)
            })
            .collect())
    }

    /// Load for update, apply the transition, save. The repository's token
    /// check makes the whole span safe without in-process locking.
    fn mutate(
        &self,
        uid: &ItemUid,
        actor: &str,
        action: &str,
        transition: impl Fn(&LibraryItemAggregate<C>, DateTime<Utc>) -> Result<LibraryItemAggregate<C>>,
    ) -> Result<ItemRecord<C>> {
        tracing::debug!(uid = %uid, actor, action, "library item transition");
        let mut loaded = self.repository.find_by_uid(uid, &ItemQuery::latest(), true)?;
        loaded.aggregate = transition(&loaded.aggregate, Utc::now())?;
        let saved = self.repository.save(&loaded)?;
        Ok(ItemRecord::from_aggregate(&saved))
    }
}
