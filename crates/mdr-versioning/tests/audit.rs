#![allow(missing_docs)]

use mdr_model::{ItemStatus, VersionNumber};
use mdr_versioning::{InMemoryStore, ItemContent, VersioningService};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
struct Term {
    name: String,
    definition: String,
    preferred_term: Option<String>,
}

impl ItemContent for Term {
    fn name(&self) -> &str {
        &self.name
    }
}

fn term(name: &str, definition: &str, preferred_term: Option<&str>) -> Term {
    Term {
        name: name.to_string(),
        definition: definition.to_string(),
        preferred_term: preferred_term.map(str::to_string),
    }
}

fn service() -> VersioningService<Term, InMemoryStore<Term>> {
    let store = InMemoryStore::new("CTTerm");
    store.register_library("Sponsor", true);
    VersioningService::new(store)
}

#[test]
fn history_is_newest_first_with_closed_intervals() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "v1", None), "alice")
        .expect("create");
    service
        .edit(&created.uid, term("SEX", "v2", None), "edit", "alice")
        .expect("edit");
    service.approve(&created.uid, "alice").expect("approve");

    let history = service.get_version_history(&created.uid).expect("history");
    assert_eq!(history.len(), 3);

    let versions: Vec<String> = history
        .iter()
        .map(|r| r.metadata.version.to_string())
        .collect();
    assert_eq!(versions, ["1.0", "0.2", "0.1"]);

    // Strictly ordered, non-overlapping intervals: each closed edge ends
    // exactly where its successor starts.
    assert!(history[0].metadata.end_date.is_none());
    assert_eq!(
        history[1].metadata.end_date,
        Some(history[0].metadata.start_date)
    );
    assert_eq!(
        history[2].metadata.end_date,
        Some(history[1].metadata.start_date)
    );
    assert!(history[2].metadata.start_date < history[1].metadata.start_date);
}

#[test]
fn single_field_edits_flag_exactly_one_field() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "original", Some("Sex")), "alice")
        .expect("create");
    service
        .edit(
            &created.uid,
            term("SEX", "reworded", Some("Sex")),
            "reword definition",
            "alice",
        )
        .expect("edit definition");
    service
        .edit(
            &created.uid,
            term("SEX", "reworded", Some("Subject sex")),
            "change preferred term",
            "alice",
        )
        .expect("edit preferred term");

    let history = service.get_version_history(&created.uid).expect("history");
    assert_eq!(history.len(), 3);

    let newest = &history[0].changes;
    assert!(newest["preferred_term"]);
    assert!(!newest["definition"]);
    assert!(!newest["name"]);

    let middle = &history[1].changes;
    assert!(middle["definition"]);
    assert!(!middle["preferred_term"]);
    assert!(!middle["name"]);

    // The oldest record is the baseline: nothing flagged.
    assert!(history[2].changes.is_empty());
}

#[test]
fn releases_filter_finals_valid_at_a_point_in_time() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "v1", None), "alice")
        .expect("create");
    let first_release = service.approve(&created.uid, "alice").expect("approve");
    service
        .create_new_version(&created.uid, Some(term("SEX", "v2", None)), "alice")
        .expect("new version");
    let second_release = service.approve(&created.uid, "alice").expect("approve");

    // While 1.0 was current.
    let at_first = service
        .get_releases(&created.uid, first_release.metadata.start_date)
        .expect("releases");
    assert_eq!(at_first.len(), 1);
    assert_eq!(at_first[0].metadata.version, VersionNumber::new(1, 0));

    // Now: only the open 2.0 release.
    let now = service
        .get_releases(&created.uid, second_release.metadata.start_date)
        .expect("releases");
    assert_eq!(now.len(), 1);
    assert_eq!(now[0].metadata.version, VersionNumber::new(2, 0));
    assert_eq!(now[0].metadata.status, ItemStatus::Final);

    // Before the first approval there was no release at all.
    let before = service
        .get_releases(&created.uid, created.metadata.start_date)
        .expect("releases");
    assert!(before.is_empty());
}

#[test]
fn reactivation_reuses_the_unchanged_snapshot() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "v1", None), "alice")
        .expect("create");
    service.approve(&created.uid, "alice").expect("approve");
    service.inactivate(&created.uid, "alice").expect("inactivate");
    service.reactivate(&created.uid, "alice").expect("reactivate");

    let history = service.get_version_history(&created.uid).expect("history");
    assert_eq!(history.len(), 4);
    // Content never diverged, so no record flags any attribute change.
    for record in &history[..3] {
        assert!(record.changes.values().all(|changed| !changed));
    }
}
