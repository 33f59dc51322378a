//! In-memory snapshot store: append-only temporal edges over a per-root
//! snapshot arena, with an index for the currently open edge.
//!
//! Concurrency control is optimistic. Each root carries a monotonically
//! incrementing revision; `for_update` loads capture it as a token and
//! `save` re-checks it under the store's write lock, so the second of two
//! interleaved writers always fails and nothing partial is ever written.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Duration;
use mdr_model::{ItemStatus, ItemUid, Library, MdrError, Result, VersionMetadata};

use crate::aggregate::LibraryItemAggregate;
use crate::content::ItemContent;
use crate::store::{ItemQuery, ItemRepository, LoadedItem, VersionToken};

/// One temporal edge row: a snapshot reference plus version metadata.
/// Rows are append-only; a closed row (end_date set) is never touched again.
#[derive(Debug, Clone)]
struct EdgeRow {
    snapshot: usize,
    metadata: VersionMetadata,
}

#[derive(Debug)]
struct RootRecord<C> {
    library: String,
    /// Bumped on every committed save; the concurrency token value.
    revision: u64,
    /// Snapshot arena. Successive edits with identical content share an
    /// entry; lifetime is the union of all referencing edges.
    snapshots: Vec<C>,
    /// Edge rows ordered by start_date ascending.
    edges: Vec<EdgeRow>,
    /// Index of the single open edge. Always valid while the root exists.
    current: usize,
}

#[derive(Debug)]
struct Inner<C> {
    roots: BTreeMap<ItemUid, RootRecord<C>>,
    /// Library name -> is_editable. Registered out of band; read-only to
    /// the engine.
    libraries: BTreeMap<String, bool>,
    /// Relationship index: uid -> count of dependent references.
    usage: BTreeMap<ItemUid, usize>,
    /// (library, name) -> uid, for duplicate-name detection.
    names: BTreeMap<(String, String), ItemUid>,
}

/// Arena+index store keeping the whole version graph in process memory.
#[derive(Debug)]
pub struct InMemoryStore<C> {
    uid_prefix: String,
    uid_counter: AtomicU64,
    inner: RwLock<Inner<C>>,
}

impl<C: ItemContent> InMemoryStore<C> {
    /// `uid_prefix` names the entity type, e.g. `"CTTerm"`; generated uids
    /// are `"CTTerm_000001"`, `"CTTerm_000002"`, ...
    pub fn new(uid_prefix: impl Into<String>) -> Self {
        Self {
            uid_prefix: uid_prefix.into(),
            uid_counter: AtomicU64::new(0),
            inner: RwLock::new(Inner {
                roots: BTreeMap::new(),
                libraries: BTreeMap::new(),
                usage: BTreeMap::new(),
                names: BTreeMap::new(),
            }),
        }
    }

    /// Registers a library partition. Libraries are managed by an external
    /// collaborator; the engine only reads the editability flag.
    pub fn register_library(&self, name: impl Into<String>, is_editable: bool) {
        self.write().libraries.insert(name.into(), is_editable);
    }

    /// Records one dependent reference to `uid` in the relationship index.
    ///
    /// Advances the root's revision: the usage count is a precondition of
    /// `approve` and `delete`, so a reference change must invalidate tokens
    /// held by in-flight transactions.
    pub fn add_reference(&self, uid: &ItemUid) -> Result<()> {
        let mut inner = self.write();
        let root = inner
            .roots
            .get_mut(uid)
            .ok_or_else(|| MdrError::not_found("Library item", uid))?;
        root.revision += 1;
        *inner.usage.entry(uid.clone()).or_insert(0) += 1;
        Ok(())
    }

    /// Drops one dependent reference to `uid`. Advances the revision like
    /// `add_reference`.
    pub fn remove_reference(&self, uid: &ItemUid) -> Result<()> {
        let mut inner = self.write();
        let root = inner
            .roots
            .get_mut(uid)
            .ok_or_else(|| MdrError::not_found("Library item", uid))?;
        root.revision += 1;
        let count = inner.usage.entry(uid.clone()).or_insert(0);
        *count = count.saturating_sub(1);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<C>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<C>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: ItemContent> Inner<C> {
    fn root(&self, uid: &ItemUid) -> Result<&RootRecord<C>> {
        self.roots.get(uid).ok_or_else(|| {
            MdrError::NotFound(format!(
                "Library item with UID '{uid}' does not exist - it may have been deleted in a \
                 concurrent transaction."
            ))
        })
    }

    fn library_of(&self, root: &RootRecord<C>) -> Library {
        let is_editable = self.libraries.get(&root.library).copied().unwrap_or(false);
        Library::from_repository_values(root.library.clone(), is_editable)
    }

    fn aggregate_for(
        &self,
        uid: &ItemUid,
        root: &RootRecord<C>,
        edge: &EdgeRow,
    ) -> LibraryItemAggregate<C> {
        LibraryItemAggregate::from_repository_values(
            uid.clone(),
            self.library_of(root),
            root.snapshots[edge.snapshot].clone(),
            edge.metadata.clone(),
        )
    }

    /// Resolves the edge selected by the query, searching the full history.
    fn resolve_edge<'a>(
        &self,
        uid: &ItemUid,
        root: &'a RootRecord<C>,
        query: &ItemQuery,
    ) -> Result<&'a EdgeRow> {
        if query.is_latest() {
            return Ok(&root.edges[root.current]);
        }
        root.edges
            .iter()
            .filter(|edge| query.status.is_none_or(|s| edge.metadata.status == s))
            .filter(|edge| query.version.is_none_or(|v| edge.metadata.version == v))
            .filter(|edge| {
                query.at_time.is_none_or(|t| {
                    edge.metadata.start_date <= t
                        && edge.metadata.end_date.is_none_or(|end| t < end)
                })
            })
            .max_by_key(|edge| edge.metadata.start_date)
            .ok_or_else(|| {
                MdrError::NotFound(format!(
                    "No version of library item '{uid}' matches the requested status, version \
                     and date."
                ))
            })
    }
}

impl<C: ItemContent> ItemRepository<C> for InMemoryStore<C> {
    fn generate_uid(&self) -> ItemUid {
        let n = self.uid_counter.fetch_add(1, Ordering::Relaxed) + 1;
        ItemUid::new(format!("{}_{:06}", self.uid_prefix, n))
            .unwrap_or_else(|_| unreachable!("generated uid is never empty"))
    }

    fn create(&self, aggregate: &LibraryItemAggregate<C>) -> Result<LibraryItemAggregate<C>> {
        let mut inner = self.write();
        let uid = aggregate.uid().clone();
        let library = aggregate.library().name.clone();

        if !inner.libraries.contains_key(&library) {
            return Err(MdrError::not_found("Library", &library));
        }
        if inner.roots.contains_key(&uid) {
            return Err(MdrError::AlreadyExists(format!(
                "Library item with UID '{uid}' already exists."
            )));
        }
        let name_key = (library.clone(), aggregate.content().name().to_string());
        if inner.names.contains_key(&name_key) {
            return Err(MdrError::AlreadyExists(format!(
                "Library item with Name '{}' already exists in the Library '{}'.",
                name_key.1, library
            )));
        }

        inner.names.insert(name_key, uid.clone());
        inner.usage.insert(uid.clone(), 0);
        inner.roots.insert(
            uid.clone(),
            RootRecord {
                library,
                revision: 0,
                snapshots: vec![aggregate.content().clone()],
                edges: vec![EdgeRow {
                    snapshot: 0,
                    metadata: aggregate.metadata().clone(),
                }],
                current: 0,
            },
        );
        tracing::debug!(uid = %uid, "created library item");
        Ok(aggregate.clone())
    }

    fn find_by_uid(
        &self,
        uid: &ItemUid,
        query: &ItemQuery,
        for_update: bool,
    ) -> Result<LoadedItem<C>> {
        if for_update && !query.is_latest() {
            return Err(MdrError::Validation(
                "Retrieval for update is supported only for the latest version.".into(),
            ));
        }
        let inner = self.read();
        let root = inner.root(uid)?;
        let edge = inner.resolve_edge(uid, root, query)?;
        let aggregate = inner.aggregate_for(uid, root, edge);
        let token = for_update.then(|| VersionToken {
            uid: uid.clone(),
            revision: root.revision,
        });
        Ok(LoadedItem { aggregate, token })
    }

    fn save(&self, item: &LoadedItem<C>) -> Result<LibraryItemAggregate<C>> {
        let Some(token) = item.token() else {
            return Err(MdrError::Validation(
                "Only items retrieved for update can be saved.".into(),
            ));
        };
        let aggregate = &item.aggregate;
        let uid = aggregate.uid().clone();

        let mut inner = self.write();
        // Re-validate the token under the write lock. A concurrent save has
        // bumped the revision; this writer loses and rolls back untouched.
        {
            let root = inner.root(&uid)?;
            if root.revision != token.revision {
                tracing::warn!(uid = %uid, "optimistic lock conflict on save");
                return Err(MdrError::Versioning(format!(
                    "Library item '{uid}' was changed by a concurrent transaction after it was \
                     read; reload it and retry."
                )));
            }

            let open = &root.edges[root.current];
            if open.metadata == *aggregate.metadata()
                && root.snapshots[open.snapshot] == *aggregate.content()
            {
                // No-op transition (e.g. an edit with identical content).
                return Ok(aggregate.clone());
            }
        }

        // Keep the name index in step with content renames.
        let new_name = aggregate.content().name().to_string();
        let (library, old_name) = {
            let root = inner.root(&uid)?;
            let open = &root.edges[root.current];
            (
                root.library.clone(),
                root.snapshots[open.snapshot].name().to_string(),
            )
        };
        if new_name != old_name {
            let new_key = (library.clone(), new_name.clone());
            if inner.names.get(&new_key).is_some_and(|owner| *owner != uid) {
                return Err(MdrError::AlreadyExists(format!(
                    "Library item with Name '{new_name}' already exists in the Library \
                     '{library}'."
                )));
            }
            inner.names.remove(&(library.clone(), old_name));
            inner.names.insert(new_key, uid.clone());
        }

        let mut metadata = aggregate.metadata().clone();
        let root = inner
            .roots
            .get_mut(&uid)
            .ok_or_else(|| MdrError::not_found("Library item", &uid))?;

        // Edge start dates are a strict total order per root; clamp forward
        // when the clock has not advanced since the previous edge.
        let previous_start = root.edges[root.current].metadata.start_date;
        if metadata.start_date <= previous_start {
            metadata.start_date = previous_start + Duration::microseconds(1);
        }

        // Close the open edge at the new edge's start, reuse or write the
        // snapshot, then open the new edge.
        root.edges[root.current].metadata.end_date = Some(metadata.start_date);
        let snapshot = match root.snapshots.iter().position(|s| s == aggregate.content()) {
            Some(existing) => existing,
            None => {
                root.snapshots.push(aggregate.content().clone());
                root.snapshots.len() - 1
            }
        };
        root.edges.push(EdgeRow {
            snapshot,
            metadata: metadata.clone(),
        });
        root.current = root.edges.len() - 1;
        root.revision += 1;

        tracing::debug!(
            uid = %uid,
            version = %metadata.version,
            status = %metadata.status,
            "saved library item version"
        );
        let root = inner.root(&uid)?;
        Ok(inner.aggregate_for(&uid, root, &root.edges[root.current]))
    }

    fn delete(&self, uid: &ItemUid) -> Result<()> {
        let mut inner = self.write();
        let root = inner.root(uid)?;
        let open = &root.edges[root.current].metadata;
        if open.status != ItemStatus::Draft || open.version.major >= 1 {
            return Err(MdrError::BusinessLogic(
                "The item has been accepted and can no longer be deleted.".into(),
            ));
        }
        // Re-checked under the write lock: a reference may have landed after
        // the caller's precondition check.
        if inner.usage.get(uid).copied().unwrap_or(0) > 0 {
            return Err(MdrError::BusinessLogic(format!(
                "Library item '{uid}' is referenced by dependent items and cannot be deleted."
            )));
        }
        let library = root.library.clone();
        let name = root.snapshots[root.edges[root.current].snapshot]
            .name()
            .to_string();
        inner.roots.remove(uid);
        inner.names.remove(&(library, name));
        inner.usage.remove(uid);
        tracing::debug!(uid = %uid, "deleted never-approved draft item");
        Ok(())
    }

    fn find_all(
        &self,
        status: Option<ItemStatus>,
        library: Option<&str>,
    ) -> Result<Vec<LibraryItemAggregate<C>>> {
        let inner = self.read();
        let mut items = Vec::new();
        for (uid, root) in &inner.roots {
            if library.is_some_and(|l| l != root.library) {
                continue;
            }
            let edge = &root.edges[root.current];
            if status.is_some_and(|s| edge.metadata.status != s) {
                continue;
            }
            items.push(inner.aggregate_for(uid, root, edge));
        }
        Ok(items)
    }

    fn all_versions(&self, uid: &ItemUid) -> Result<Vec<(C, VersionMetadata)>> {
        let inner = self.read();
        let root = inner.root(uid)?;
        let mut versions: Vec<(C, VersionMetadata)> = root
            .edges
            .iter()
            .map(|edge| (root.snapshots[edge.snapshot].clone(), edge.metadata.clone()))
            .collect();
        versions.sort_by(|a, b| b.1.start_date.cmp(&a.1.start_date));
        Ok(versions)
    }

    fn check_usage_count(&self, uid: &ItemUid) -> Result<usize> {
        let inner = self.read();
        inner.root(uid)?;
        Ok(inner.usage.get(uid).copied().unwrap_or(0))
    }

    fn is_library_editable(&self, name: &str) -> Option<bool> {
        self.read().libraries.get(name).copied()
    }
}
