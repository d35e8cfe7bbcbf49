use ui_scrape::ScrapeError;
use ui_scrape::fingerprint::{ScreenSignature, fingerprint_screen};
use ui_scrape::persist::coordinator::{
    FailedPhase, PersistError, PersistPhase, ScrapeBatch, persist,
};
use ui_scrape::registrar::NoopRegistrar;
use ui_scrape::scrape::cancel::CancelToken;
use ui_scrape::scrape::dedup::MemoryResolver;
use ui_scrape::scrape::model::WalkLimits;
use ui_scrape::scrape::walker::walk;
use ui_scrape::session::engine::{EngineConfig, ScrapeEngine};
use ui_scrape::store::model::{ElementId, ScreenUpsert};
use ui_scrape::store::sqlite::SqliteStore;

use crate::common::fake_tree::{FakeSpec, FakeTree};
use crate::common::faulty_store::{Fault, FaultyStore};
use crate::common::utils::{APP, login_event, login_spec, memory_engine};

mod common;

fn faulty_engine() -> ScrapeEngine<FaultyStore, NoopRegistrar> {
    ScrapeEngine::new(FaultyStore::in_memory(), NoopRegistrar, EngineConfig::default())
}

fn button_only() -> FakeSpec {
    FakeSpec::new("android.widget.FrameLayout")
        .child(FakeSpec::new("android.widget.Button").text("Login").clickable())
}

fn button_with_icon() -> FakeSpec {
    FakeSpec::new("android.widget.FrameLayout").child(
        FakeSpec::new("android.widget.Button")
            .text("Login")
            .clickable()
            .child(FakeSpec::new("android.widget.ImageView").description("lock")),
    )
}

// =========================================================================
// Scenario A: unchanged screen scraped twice
// =========================================================================

#[test]
fn rescrape_of_unchanged_screen_is_idempotent() {
    let mut engine = memory_engine();
    let tree = FakeTree::new(login_spec());

    let first = engine
        .scrape(&login_event(1_000), tree.root(), &CancelToken::detached())
        .unwrap();

    assert_eq!(first.new_element_ids.len(), 3);
    assert_eq!(first.edges_written, 2);
    assert_eq!(first.screen.visit_count, 1);
    assert_eq!(engine.store().count_elements(APP).unwrap(), 3);
    assert_eq!(engine.store().screens_for_app(APP).unwrap().len(), 1);

    let edges = engine.store().edges_for_app(APP).unwrap();
    assert_eq!(edges.len(), 2);
    assert!(edges.iter().all(|e| e.parent_id == first.new_element_ids[0]));

    let second = engine
        .scrape(&login_event(2_000), tree.root(), &CancelToken::detached())
        .unwrap();

    assert!(second.new_element_ids.is_empty());
    assert_eq!(second.cache_hits, 3);
    assert_eq!(second.screen_hash, first.screen_hash);
    assert_eq!(second.screen.visit_count, 2);
    assert!(second.transition.is_none());

    assert_eq!(engine.store().count_elements(APP).unwrap(), 3);
    assert_eq!(engine.store().edges_for_app(APP).unwrap(), edges);
    assert_eq!(engine.store().screens_for_app(APP).unwrap().len(), 1);
    assert_eq!(tree.tracker().outstanding(), 0);
}

#[test]
fn element_rows_keep_their_ids_and_touch_last_seen() {
    let mut engine = memory_engine();
    let tree = FakeTree::new(login_spec());

    let first = engine
        .scrape(&login_event(1_000), tree.root(), &CancelToken::detached())
        .unwrap();
    engine
        .scrape(&login_event(5_000), tree.root(), &CancelToken::detached())
        .unwrap();

    let root = engine.store().element(first.new_element_ids[0]).unwrap().unwrap();
    assert_eq!(root.first_seen_ms, 1_000);
    assert_eq!(root.last_seen_ms, 5_000);
    assert_eq!(root.screen_hash.as_ref(), Some(&first.screen_hash));

    let app = engine.store().app(APP).unwrap().unwrap();
    assert_eq!(app.element_count, 3);
    assert_eq!(app.screen_count, 1);
    assert_eq!(app.first_scraped_ms, 1_000);
    assert_eq!(app.last_scraped_ms, 5_000);
}

// =========================================================================
// Scenario B: cached parent gains a child
// =========================================================================

#[test]
fn new_child_under_cached_parent_gets_an_edge() {
    let mut engine = memory_engine();

    let first = engine
        .scrape(&login_event(1_000), FakeTree::new(button_only()).root(), &CancelToken::detached())
        .unwrap();
    let button_id = first.new_element_ids[1];
    assert!(engine.store().children_of(button_id).unwrap().is_empty());

    let second = engine
        .scrape(&login_event(2_000), FakeTree::new(button_with_icon()).root(), &CancelToken::detached())
        .unwrap();

    assert_eq!(second.new_element_ids.len(), 1, "only the icon is inserted");
    assert_eq!(second.cache_hits, 2);

    let icon_id = second.new_element_ids[0];
    let icon = engine.store().element(icon_id).unwrap().unwrap();
    assert_eq!(icon.class_name, "android.widget.ImageView");

    let children = engine.store().children_of(button_id).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].child_id, icon_id);
    assert_eq!(children[0].depth, 2);
    assert_eq!(engine.store().parent_of(icon_id).unwrap().unwrap().parent_id, button_id);

    assert_eq!(engine.store().count_elements(APP).unwrap(), 3);
    assert_eq!(engine.store().count_edges(APP).unwrap(), 2);
    assert_eq!(engine.store().count_orphan_edges().unwrap(), 0);
}

#[test]
fn removed_children_lose_their_edges() {
    let mut engine = memory_engine();

    engine
        .scrape(&login_event(1_000), FakeTree::new(button_with_icon()).root(), &CancelToken::detached())
        .unwrap();
    assert_eq!(engine.store().count_edges(APP).unwrap(), 2);

    engine
        .scrape(&login_event(2_000), FakeTree::new(button_only()).root(), &CancelToken::detached())
        .unwrap();

    assert_eq!(engine.store().count_edges(APP).unwrap(), 1, "edge set reflects the latest tree");
    assert_eq!(engine.store().count_elements(APP).unwrap(), 3, "elements are never deleted");
}

// =========================================================================
// Scenario C: failure between element insert and edge build
// =========================================================================

#[test]
fn failed_batch_commits_nothing_and_rescrape_recovers() {
    let mut engine = faulty_engine();
    let tree = FakeTree::new(login_spec());
    engine.store_mut().set_fault(Some(Fault::InsertEdges));

    let err = engine
        .scrape(&login_event(1_000), tree.root(), &CancelToken::detached())
        .unwrap_err();

    match &err {
        ScrapeError::Persist(inner) => {
            assert_eq!(inner.phase(), FailedPhase::BuildingEdges);
            assert!(!inner.is_integrity());
        }
        other => panic!("expected persist error, got {other:?}"),
    }

    let store = engine.store().inner();
    assert_eq!(store.count_elements(APP).unwrap(), 0);
    assert_eq!(store.count_edges(APP).unwrap(), 0);
    assert!(store.app(APP).unwrap().is_none());
    assert!(store.screens_for_app(APP).unwrap().is_empty());
    assert!(engine.session(APP).and_then(|s| s.last_screen()).is_none());

    engine.store_mut().set_fault(None);
    let report = engine
        .scrape(&login_event(2_000), tree.root(), &CancelToken::detached())
        .unwrap();
    assert_eq!(report.new_element_ids.len(), 3);
    assert_eq!(report.screen.visit_count, 1);

    engine
        .scrape(&login_event(3_000), tree.root(), &CancelToken::detached())
        .unwrap();
    let store = engine.store().inner();
    assert_eq!(store.count_elements(APP).unwrap(), 3, "no duplicates after recovery");
    assert_eq!(store.count_edges(APP).unwrap(), 2);
}

#[test]
fn failed_rescrape_keeps_previous_edge_set() {
    let mut engine = faulty_engine();
    engine
        .scrape(&login_event(1_000), FakeTree::new(button_only()).root(), &CancelToken::detached())
        .unwrap();
    let before = engine.store().inner().edges_for_app(APP).unwrap();

    for fault in [
        Fault::UpsertElement { after: 0 },
        Fault::InsertEdges,
        Fault::UpsertScreen,
        Fault::Commit,
    ] {
        engine.store_mut().set_fault(Some(fault));
        let result = engine.scrape(
            &login_event(2_000),
            FakeTree::new(button_with_icon()).root(),
            &CancelToken::detached(),
        );
        assert!(result.is_err(), "{fault:?} should fail the batch");

        let store = engine.store().inner();
        assert_eq!(store.count_elements(APP).unwrap(), 2, "{fault:?}: icon rolled back");
        assert_eq!(store.edges_for_app(APP).unwrap(), before, "{fault:?}: old edges restored");
        assert_eq!(store.count_orphan_edges().unwrap(), 0);
    }
}

#[test]
fn partial_element_insert_is_rolled_back() {
    let mut engine = faulty_engine();
    engine.store_mut().set_fault(Some(Fault::UpsertElement { after: 2 }));

    let err = engine
        .scrape(&login_event(1_000), FakeTree::new(login_spec()).root(), &CancelToken::detached())
        .unwrap_err();

    assert!(matches!(
        err,
        ScrapeError::Persist(PersistError::Store { phase: FailedPhase::InsertingElements, .. })
    ));
    assert_eq!(engine.store().inner().count_elements(APP).unwrap(), 0);
}

#[test]
fn undercounted_edges_are_an_integrity_failure() {
    let mut engine = faulty_engine();
    engine.store_mut().set_fault(Some(Fault::UndercountEdges));

    let err = engine
        .scrape(&login_event(1_000), FakeTree::new(login_spec()).root(), &CancelToken::detached())
        .unwrap_err();

    match err {
        ScrapeError::Persist(inner) => {
            assert!(matches!(inner, PersistError::EdgeCountMismatch { expected: 2, inserted: 1 }));
            assert!(inner.is_integrity());
        }
        other => panic!("expected persist error, got {other:?}"),
    }
    assert_eq!(engine.store().inner().count_edges(APP).unwrap(), 0);
    assert_eq!(engine.monitor().consecutive_failures(APP), 1);
}

#[test]
fn screen_context_failure_does_not_fail_the_batch() {
    let mut engine = faulty_engine();
    engine.store_mut().set_fault(Some(Fault::SaveScreenContext));

    let report = engine
        .scrape(&login_event(1_000), FakeTree::new(login_spec()).root(), &CancelToken::detached())
        .unwrap();

    assert!(report.context.is_none());
    assert_eq!(engine.store().inner().count_edges(APP).unwrap(), 2);
    assert!(engine.store().inner().screen_context(&report.screen_hash).unwrap().is_none());
}

// =========================================================================
// persist() directly
// =========================================================================

fn batch_screen(outcome_len: usize, at: i64) -> ScreenUpsert {
    let sig = ScreenSignature::new(APP, "MainActivity", None);
    ScreenUpsert {
        hash: fingerprint_screen(&sig, &[], 10),
        app_id: APP.into(),
        activity: "MainActivity".into(),
        title: None,
        navigation_depth: 0,
        element_count: outcome_len as u32,
        seen_at_ms: at,
    }
}

#[test]
fn persist_walks_every_phase_in_order() {
    let mut store = SqliteStore::in_memory().unwrap();
    let tree = FakeTree::new(login_spec());
    let outcome = walk(tree.root(), APP, &store, &WalkLimits::default(), &CancelToken::detached())
        .unwrap();

    let batch = ScrapeBatch {
        outcome: &outcome,
        screen: batch_screen(outcome.observed.len(), 1_000),
        previous: None,
    };
    let report = persist(&mut store, &batch).unwrap();

    assert_eq!(
        report.phases,
        vec![
            PersistPhase::Collecting,
            PersistPhase::ClearingOldEdges,
            PersistPhase::InsertingElements,
            PersistPhase::Verifying,
            PersistPhase::BuildingEdges,
            PersistPhase::Committed,
        ]
    );
    assert_eq!(report.assigned_ids.len(), 3);
    assert_eq!(report.edges_cleared, 0);
    assert_eq!(report.edges_written, 2);
    assert_eq!(report.app.element_count, 3);
}

#[test]
fn stale_cache_hit_is_caught_before_edges_are_written() {
    let mut store = SqliteStore::in_memory().unwrap();
    let tree = FakeTree::new(login_spec());

    // Learn the root hash, then claim it is persisted as an id that is not.
    let probe = walk(tree.root(), APP, &MemoryResolver::new(), &WalkLimits::default(), &CancelToken::detached())
        .unwrap();
    let mut resolver = MemoryResolver::new();
    resolver.insert(APP, probe.elements[0].hash.clone(), ElementId(999));

    let outcome = walk(tree.root(), APP, &resolver, &WalkLimits::default(), &CancelToken::detached())
        .unwrap();
    let batch = ScrapeBatch {
        outcome: &outcome,
        screen: batch_screen(outcome.observed.len(), 1_000),
        previous: None,
    };

    let err = persist(&mut store, &batch).unwrap_err();

    assert!(matches!(err, PersistError::MissingCacheHits { missing: 1, .. }));
    assert_eq!(err.phase(), FailedPhase::Verifying);
    assert_eq!(store.count_elements(APP).unwrap(), 0);
    assert_eq!(store.count_edges(APP).unwrap(), 0);
}

#[test]
fn apps_are_isolated() {
    let mut engine = memory_engine();
    let tree = FakeTree::new(login_spec());

    engine.scrape(&login_event(1_000), tree.root(), &CancelToken::detached()).unwrap();

    let other = ui_scrape::ScreenEvent::new("com.other.app", "LoginActivity", 1_500);
    let report = engine.scrape(&other, tree.root(), &CancelToken::detached()).unwrap();

    assert_eq!(report.new_element_ids.len(), 3, "same content, different app");
    assert_eq!(engine.store().count_edges(APP).unwrap(), 2);
    assert_eq!(engine.store().count_edges("com.other.app").unwrap(), 2);

    assert!(engine.store_mut().delete_app("com.other.app").unwrap());
    assert_eq!(engine.store().count_elements("com.other.app").unwrap(), 0);
    assert_eq!(engine.store().count_edges("com.other.app").unwrap(), 0);
    assert_eq!(engine.store().count_elements(APP).unwrap(), 3);
    assert!(!engine.store_mut().delete_app("com.other.app").unwrap());
}
