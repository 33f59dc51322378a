#![allow(missing_docs)]

use mdr_model::{ItemStatus, MdrError, VersionNumber};
use mdr_versioning::{InMemoryStore, ItemContent, ItemQuery, VersioningService};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
struct Term {
    name: String,
    definition: String,
}

impl ItemContent for Term {
    fn name(&self) -> &str {
        &self.name
    }
}

fn term(name: &str, definition: &str) -> Term {
    Term {
        name: name.to_string(),
        definition: definition.to_string(),
    }
}

fn service() -> VersioningService<Term, InMemoryStore<Term>> {
    let store = InMemoryStore::new("CTTerm");
    store.register_library("Sponsor", true);
    store.register_library("CDISC", false);
    VersioningService::new(store)
}

#[test]
fn version_sequence_through_two_release_cycles() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "Sex of the subject"), "alice")
        .expect("create");
    assert_eq!(created.metadata.version, VersionNumber::new(0, 1));
    assert_eq!(created.metadata.status, ItemStatus::Draft);

    let approved = service.approve(&created.uid, "bob").expect("approve");
    assert_eq!(approved.metadata.version, VersionNumber::new(1, 0));

    let draft = service
        .create_new_version(&created.uid, None, "alice")
        .expect("new version");
    assert_eq!(draft.metadata.version, VersionNumber::new(1, 1));
    assert_eq!(draft.metadata.status, ItemStatus::Draft);

    let released = service.approve(&created.uid, "bob").expect("approve");
    assert_eq!(released.metadata.version, VersionNumber::new(2, 0));
}

#[test]
fn edit_bumps_minor_and_identical_edit_is_a_no_op() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "original"), "alice")
        .expect("create");

    let edited = service
        .edit(&created.uid, term("SEX", "reworded"), "rewording", "alice")
        .expect("edit");
    assert_eq!(edited.metadata.version, VersionNumber::new(0, 2));
    assert_eq!(edited.metadata.change_description, "rewording");

    // Identical content: no version bump, no new history entry.
    let unchanged = service
        .edit(&created.uid, term("SEX", "reworded"), "again", "alice")
        .expect("no-op edit");
    assert_eq!(unchanged.metadata.version, VersionNumber::new(0, 2));
    let history = service.get_version_history(&created.uid).expect("history");
    assert_eq!(history.len(), 2);
}

#[test]
fn inactivate_and_reactivate_keep_the_version_number() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "x"), "alice")
        .expect("create");
    service.approve(&created.uid, "alice").expect("approve");

    let retired = service.inactivate(&created.uid, "alice").expect("inactivate");
    assert_eq!(retired.metadata.status, ItemStatus::Retired);
    assert_eq!(retired.metadata.version, VersionNumber::new(1, 0));

    let reactivated = service.reactivate(&created.uid, "alice").expect("reactivate");
    assert_eq!(reactivated.metadata.status, ItemStatus::Final);
    assert_eq!(reactivated.metadata.version, VersionNumber::new(1, 0));
}

#[test]
fn illegal_transitions_surface_business_logic_errors() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "x"), "alice")
        .expect("create");

    // Draft cannot be retired or reactivated.
    assert!(matches!(
        service.inactivate(&created.uid, "alice"),
        Err(MdrError::BusinessLogic(_))
    ));
    assert!(matches!(
        service.reactivate(&created.uid, "alice"),
        Err(MdrError::BusinessLogic(_))
    ));

    service.approve(&created.uid, "alice").expect("approve");
    // Final cannot be approved again or edited.
    assert!(matches!(
        service.approve(&created.uid, "alice"),
        Err(MdrError::BusinessLogic(_))
    ));
    assert!(matches!(
        service.edit(&created.uid, term("SEX", "y"), "d", "alice"),
        Err(MdrError::BusinessLogic(_))
    ));
}

#[test]
fn delete_is_limited_to_never_approved_drafts() {
    let service = service();
    let fresh = service
        .create("Sponsor", term("RACE", "x"), "alice")
        .expect("create");
    service.delete(&fresh.uid).expect("delete draft");
    assert!(matches!(
        service.get_by_uid(&fresh.uid, &ItemQuery::latest()),
        Err(MdrError::NotFound(_))
    ));

    let kept = service
        .create("Sponsor", term("SEX", "x"), "alice")
        .expect("create");
    service.approve(&kept.uid, "alice").expect("approve");
    assert!(matches!(service.delete(&kept.uid), Err(MdrError::BusinessLogic(_))));

    // A post-approval draft (major >= 1) is permanent history too.
    service
        .create_new_version(&kept.uid, None, "alice")
        .expect("new version");
    assert!(matches!(service.delete(&kept.uid), Err(MdrError::BusinessLogic(_))));
}

#[test]
fn non_editable_library_is_forbidden_and_unknown_library_cannot_answer() {
    let service = service();
    assert!(matches!(
        service.create("CDISC", term("SEX", "x"), "alice"),
        Err(MdrError::Forbidden(_))
    ));
    assert!(matches!(
        service.create("Ghost", term("SEX", "x"), "alice"),
        Err(MdrError::BusinessLogic(_))
    ));
}

#[test]
fn duplicate_names_are_rejected_within_a_library() {
    let store = InMemoryStore::new("CTTerm");
    store.register_library("Sponsor", true);
    store.register_library("Partner", true);
    let service = VersioningService::new(store);

    service
        .create("Sponsor", term("SEX", "x"), "alice")
        .expect("create");
    assert!(matches!(
        service.create("Sponsor", term("SEX", "y"), "alice"),
        Err(MdrError::AlreadyExists(_))
    ));
    // Same name in another library is a different item.
    service
        .create("Partner", term("SEX", "y"), "alice")
        .expect("create in other library");
}

#[test]
fn renaming_onto_an_existing_name_is_rejected() {
    let service = service();
    service
        .create("Sponsor", term("SEX", "x"), "alice")
        .expect("create");
    let race = service
        .create("Sponsor", term("RACE", "y"), "alice")
        .expect("create");

    assert!(matches!(
        service.edit(&race.uid, term("SEX", "y"), "rename", "alice"),
        Err(MdrError::AlreadyExists(_))
    ));
    // The failed rename left the item untouched.
    let current = service
        .get_by_uid(&race.uid, &ItemQuery::latest())
        .expect("reload");
    assert_eq!(current.content.name, "RACE");
    assert_eq!(current.metadata.version, VersionNumber::new(0, 1));

    // A rename to a fresh name releases the old one for reuse.
    service
        .edit(&race.uid, term("ETHNIC", "y"), "rename", "alice")
        .expect("rename");
    service
        .create("Sponsor", term("RACE", "z"), "alice")
        .expect("old name freed");
}

#[test]
fn approve_and_delete_are_gated_by_usage_count() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "x"), "alice")
        .expect("create");
    service
        .repository()
        .add_reference(&created.uid)
        .expect("reference");

    assert!(matches!(
        service.approve(&created.uid, "alice"),
        Err(MdrError::BusinessLogic(_))
    ));
    assert!(matches!(service.delete(&created.uid), Err(MdrError::BusinessLogic(_))));

    service
        .repository()
        .remove_reference(&created.uid)
        .expect("unreference");
    service.approve(&created.uid, "alice").expect("approve");
}

#[test]
fn historical_queries_compose_status_version_and_time_filters() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "v1"), "alice")
        .expect("create");
    service.approve(&created.uid, "alice").expect("approve");
    let draft = service
        .create_new_version(&created.uid, Some(term("SEX", "v2")), "alice")
        .expect("new version");

    // Latest regardless of status is the 1.1 draft.
    let latest = service
        .get_by_uid(&created.uid, &ItemQuery::latest())
        .expect("latest");
    assert_eq!(latest.metadata.version, VersionNumber::new(1, 1));

    // Latest Final is still 1.0.
    let final_version = service
        .get_by_uid(&created.uid, &ItemQuery::default().with_status(ItemStatus::Final))
        .expect("final");
    assert_eq!(final_version.metadata.version, VersionNumber::new(1, 0));
    assert_eq!(final_version.content.definition, "v1");

    // Specific version number.
    let v01 = service
        .get_by_uid(
            &created.uid,
            &ItemQuery::default().with_version(VersionNumber::new(0, 1)),
        )
        .expect("0.1");
    assert_eq!(v01.metadata.status, ItemStatus::Draft);

    // As-of query: the instant the draft opened belongs to the draft edge.
    let as_of = service
        .get_by_uid(
            &created.uid,
            &ItemQuery::default().at_time(draft.metadata.start_date),
        )
        .expect("as of");
    assert_eq!(as_of.metadata.version, VersionNumber::new(1, 1));

    // Mismatched combination finds nothing.
    assert!(matches!(
        service.get_by_uid(
            &created.uid,
            &ItemQuery::default()
                .with_status(ItemStatus::Retired)
                .with_version(VersionNumber::new(1, 0)),
        ),
        Err(MdrError::NotFound(_))
    ));
}

#[test]
fn at_most_one_open_edge_per_item() {
    let service = service();
    let created = service
        .create("Sponsor", term("SEX", "v1"), "alice")
        .expect("create");
    service
        .edit(&created.uid, term("SEX", "v2"), "edit", "alice")
        .expect("edit");
    service.approve(&created.uid, "alice").expect("approve");
    service.inactivate(&created.uid, "alice").expect("inactivate");
    service.reactivate(&created.uid, "alice").expect("reactivate");

    let history = service.get_version_history(&created.uid).expect("history");
    let open: Vec<_> = history
        .iter()
        .filter(|record| record.metadata.end_date.is_none())
        .collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].metadata.version, history[0].metadata.version);
}

#[test]
fn find_all_reports_current_state_only() {
    let service = service();
    let a = service
        .create("Sponsor", term("SEX", "x"), "alice")
        .expect("create");
    service
        .create("Sponsor", term("RACE", "y"), "alice")
        .expect("create");
    service.approve(&a.uid, "alice").expect("approve");

    let finals = service
        .find_all(Some(ItemStatus::Final), None)
        .expect("find finals");
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].uid, a.uid);

    let all_sponsor = service.find_all(None, Some("Sponsor")).expect("find all");
    assert_eq!(all_sponsor.len(), 2);
    assert!(service.find_all(None, Some("CDISC")).expect("empty").is_empty());
}
