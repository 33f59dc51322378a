/// The content-snapshot seam: one immutable recorded state of an entity's
/// domain attributes.
///
/// Implementations are plain attribute structs (a controlled term, a syntax
/// template, a study definition). Derived `PartialEq` gives the deep
/// structural equality used for both no-op edit detection and snapshot
/// deduplication; `Serialize` gives the audit trail its per-field view.
pub trait ItemContent: Clone + PartialEq + serde::Serialize {
    /// The item's display name, unique within its library.
    fn name(&self) -> &str;
}
