//! The snapshot-store protocol and the optimistic concurrency token.
//!
//! A repository persists root identities, immutable content snapshots and
//! the temporal edges linking them, and resolves "latest" pointers. The
//! engine never holds an in-process lock across load → mutate → save;
//! conflicting writers are detected at save time through the version token
//! captured on a `for_update` load.

use chrono::{DateTime, Utc};
use mdr_model::{ItemStatus, ItemUid, Result, VersionMetadata, VersionNumber};

use crate::aggregate::LibraryItemAggregate;
use crate::content::ItemContent;

/// Composable filters selecting one temporal edge of a root identity.
///
/// An empty query resolves the currently open edge. `status`, `version` and
/// `at_time` select among historical edges, e.g. "this term as of this
/// date".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub status: Option<ItemStatus>,
    pub version: Option<VersionNumber>,
    pub at_time: Option<DateTime<Utc>>,
}

impl ItemQuery {
    /// The empty query: resolve the current state.
    pub fn latest() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_version(mut self, version: VersionNumber) -> Self {
        self.version = Some(version);
        self
    }

    pub fn at_time(mut self, at_time: DateTime<Utc>) -> Self {
        self.at_time = Some(at_time);
        self
    }

    pub fn is_latest(&self) -> bool {
        *self == Self::default()
    }
}

/// Identity of the state a `for_update` load observed.
///
/// The store re-reads the root's revision at save time under its own
/// isolation; a mismatch aborts the save with a `Versioning` error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken {
    pub(crate) uid: ItemUid,
    pub(crate) revision: u64,
}

impl VersionToken {
    pub fn uid(&self) -> &ItemUid {
        &self.uid
    }
}

/// An aggregate together with the concurrency token captured at load time
/// (present only on `for_update` loads).
#[derive(Debug, Clone)]
pub struct LoadedItem<C> {
    pub aggregate: LibraryItemAggregate<C>,
    pub(crate) token: Option<VersionToken>,
}

impl<C> LoadedItem<C> {
    pub fn read_only(aggregate: LibraryItemAggregate<C>) -> Self {
        Self {
            aggregate,
            token: None,
        }
    }

    pub fn token(&self) -> Option<&VersionToken> {
        self.token.as_ref()
    }
}

/// Repository protocol for versioned library items.
pub trait ItemRepository<C: ItemContent> {
    /// Process-wide collision-free identifier generation.
    fn generate_uid(&self) -> ItemUid;

    /// Persists a new root identity with its first snapshot and edge.
    ///
    /// Fails with `AlreadyExists` when the name is already taken within the
    /// target library, and `NotFound` when the library is unknown.
    fn create(&self, aggregate: &LibraryItemAggregate<C>) -> Result<LibraryItemAggregate<C>>;

    /// Resolves one temporal edge of `uid` per `query`.
    ///
    /// `for_update` captures the concurrency token and is supported only
    /// for the latest version (an unfiltered query).
    fn find_by_uid(&self, uid: &ItemUid, query: &ItemQuery, for_update: bool)
    -> Result<LoadedItem<C>>;

    /// Atomically commits a mutated aggregate: re-validates the token,
    /// closes the open edge, writes (or reuses) the content snapshot and
    /// opens the new edge. Returns the persisted aggregate.
    fn save(&self, item: &LoadedItem<C>) -> Result<LibraryItemAggregate<C>>;

    /// Removes the root identity and all its edges. Permitted only while
    /// the item is a draft that never reached Final status and carries no
    /// dependent references; both guards are enforced atomically.
    fn delete(&self, uid: &ItemUid) -> Result<()>;

    /// Current state of every item, optionally filtered by status and
    /// library name. History is ignored.
    fn find_all(
        &self,
        status: Option<ItemStatus>,
        library: Option<&str>,
    ) -> Result<Vec<LibraryItemAggregate<C>>>;

    /// Every temporal edge of `uid` with its content snapshot, newest
    /// first. Input to the audit trail reconstructor.
    fn all_versions(&self, uid: &ItemUid) -> Result<Vec<(C, VersionMetadata)>>;

    /// Count of dependent references to `uid`, from the relationship index
    /// owned by the store. Gates approve and delete.
    fn check_usage_count(&self, uid: &ItemUid) -> Result<usize>;

    /// Editability of a library, `None` when the library is unknown.
    fn is_library_editable(&self, name: &str) -> Option<bool>;
}

/// A shared store is still a store; workers clone the `Arc` and rely on the
/// token check instead of in-process locking.
impl<C: ItemContent, R: ItemRepository<C>> ItemRepository<C> for std::sync::Arc<R> {
    fn generate_uid(&self) -> ItemUid {
        (**self).generate_uid()
    }

    fn create(&self, aggregate: &LibraryItemAggregate<C>) -> Result<LibraryItemAggregate<C>> {
        (**self).create(aggregate)
    }

    fn find_by_uid(
        &self,
        uid: &ItemUid,
        query: &ItemQuery,
        for_update: bool,
    ) -> Result<LoadedItem<C>> {
        (**self).find_by_uid(uid, query, for_update)
    }

    fn save(&self, item: &LoadedItem<C>) -> Result<LibraryItemAggregate<C>> {
        (**self).save(item)
    }

    fn delete(&self, uid: &ItemUid) -> Result<()> {
        (**self).delete(uid)
    }

    fn find_all(
        &self,
        status: Option<ItemStatus>,
        library: Option<&str>,
    ) -> Result<Vec<LibraryItemAggregate<C>>> {
        (**self).find_all(status, library)
    }

    fn all_versions(&self, uid: &ItemUid) -> Result<Vec<(C, VersionMetadata)>> {
        (**self).all_versions(uid)
    }

    fn check_usage_count(&self, uid: &ItemUid) -> Result<usize> {
        (**self).check_usage_count(uid)
    }

    fn is_library_editable(&self, name: &str) -> Option<bool> {
        (**self).is_library_editable(name)
    }
}
