//! Versioned-item lifecycle engine for the clinical metadata repository.
//!
//! Governs how a library item (a controlled term, a concept, a syntax
//! template, a study definition) moves between Draft, Final and Retired
//! states: version assignment, immutable historical snapshots, audit trail
//! reconstruction, and optimistic detection of concurrent edits.
//!
//! # Architecture
//!
//! - [`content`] - the `ItemContent` seam implemented by entity attribute
//!   structs
//! - [`aggregate`] - the generic library item aggregate and its
//!   side-effect-free lifecycle operations
//! - [`store`] - the repository protocol, query filters and the optimistic
//!   concurrency token
//! - [`memory`] - the arena+index in-memory store implementation
//! - [`audit`] - audit trail reconstruction with recomputed per-field diffs
//! - [`service`] - the collaborator-facing operations returning plain
//!   records
//!
//! # Example
//!
//! ```
//! use mdr_versioning::{InMemoryStore, ItemContent, VersioningService};
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize)]
//! struct Term { name: String, definition: String }
//!
//! impl ItemContent for Term {
//!     fn name(&self) -> &str { &self.name }
//! }
//!
//! let store = InMemoryStore::new("CTTerm");
//! store.register_library("Sponsor", true);
//! let service = VersioningService::new(store);
//!
//! let term = Term { name: "SEX".into(), definition: "Sex of the subject".into() };
//! let created = service.create("Sponsor", term, "alice").unwrap();
//! let approved = service.approve(&created.uid, "alice").unwrap();
//! assert_eq!(approved.metadata.version.to_string(), "1.0");
//! ```

pub mod aggregate;
pub mod audit;
pub mod content;
pub mod memory;
pub mod service;
pub mod store;

pub use aggregate::LibraryItemAggregate;
pub use audit::VersionRecord;
pub use content::ItemContent;
pub use memory::InMemoryStore;
pub use service::{ItemRecord, VersioningService};
pub use store::{ItemQuery, ItemRepository, LoadedItem, VersionToken};
