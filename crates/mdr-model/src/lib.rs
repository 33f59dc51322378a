//! Value objects for the clinical metadata repository versioning engine.
//!
//! This crate holds the pure value logic shared by every versioned library
//! item: version identifiers, lifecycle statuses, the library partition
//! value object, version metadata (the projection of the currently open
//! temporal edge) and the engine error taxonomy.

pub mod error;
pub mod ids;
pub mod library;
pub mod metadata;
pub mod status;
pub mod version;

pub use error::{MdrError, Result};
pub use ids::ItemUid;
pub use library::Library;
pub use metadata::VersionMetadata;
pub use status::{ItemAction, ItemStatus};
pub use version::VersionNumber;
