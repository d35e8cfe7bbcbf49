use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tracing::{info, warn};

use crate::cli::config::AppConfig;
use crate::error::ScrapeError;
use crate::registrar::PrefixRegistrar;
use crate::scrape::cancel::ScrapeGeneration;
use crate::session::context::ScreenEvent;
use crate::session::engine::{BatchReport, ScrapeEngine};
use crate::session::worker::{ScrapeWorker, WaitOutcome};
use crate::store::model::{ElementId, ElementRecord, HierarchyEdge};
use crate::store::sqlite::SqliteStore;
use crate::trace::logger::TraceLogger;
use crate::tree::dump::NodeDump;

type CmdResult<T> = Result<T, Box<dyn std::error::Error>>;

/// One entry of a replay file.
#[derive(Debug, Deserialize)]
pub struct RecordedScreen {
    pub event: ScreenEvent,
    pub tree: NodeDump,
}

// ============================================================================
// scrape / replay subcommands
// ============================================================================

pub fn cmd_scrape(
    config: &AppConfig,
    db: &Path,
    tree: &str,
    app: &str,
    activity: &str,
    title: Option<&str>,
    at_ms: Option<i64>,
) -> CmdResult<()> {
    let dump: NodeDump = serde_json::from_str(&std::fs::read_to_string(tree)?)?;

    let mut event = ScreenEvent::new(app, activity, at_ms.unwrap_or_else(now_ms));
    if let Some(title) = title {
        event = event.with_title(title);
    }

    run_batches(config, db, vec![RecordedScreen { event, tree: dump }])?;
    Ok(())
}

pub fn cmd_replay(config: &AppConfig, db: &Path, events: &str) -> CmdResult<()> {
    let recorded: Vec<RecordedScreen> = serde_json::from_str(&std::fs::read_to_string(events)?)?;
    info!(events = recorded.len(), path = events, "replaying screen events");

    let failed = run_batches(config, db, recorded)?;
    if failed > 0 {
        eprintln!("{} batch(es) did not commit", failed);
    }
    Ok(())
}

/// Feed screens through a persistence worker. Returns the number of
/// batches that failed.
fn run_batches(config: &AppConfig, db: &Path, screens: Vec<RecordedScreen>) -> CmdResult<usize> {
    let writer = SqliteStore::open(db)?;
    let reader = SqliteStore::open(db)?;

    let mut engine = ScrapeEngine::new(writer, PrefixRegistrar, config.engine_config());
    if let Some(path) = &config.diagnostics.trace_path {
        let tracer = TraceLogger::new(path);
        if tracer.is_enabled() {
            info!(path = %path, "tracing scrape batches");
        }
        engine = engine.with_tracer(tracer);
    }

    let worker = ScrapeWorker::spawn(
        engine,
        ScrapeGeneration::new(),
        Duration::from_millis(config.persist.wait_timeout_ms),
    );

    let mut failed = 0;
    for RecordedScreen { event, tree } in screens {
        let label = format!("{} / {}", event.app_id, event.activity);
        match worker.handle_event(event, tree.as_node(), &reader) {
            WaitOutcome::Done(Ok(report)) => print_batch(&report),
            WaitOutcome::Done(Err(ScrapeError::EmptyTree)) => {
                println!("{}: empty tree, nothing persisted", label);
            }
            WaitOutcome::Done(Err(err)) => {
                failed += 1;
                eprintln!("{}: {}", label, err);
            }
            WaitOutcome::TimedOut => {
                warn!(screen = %label, "batch still running after wait timeout");
                println!("{}: still persisting", label);
            }
        }
    }

    worker.shutdown();
    Ok(failed)
}

fn print_batch(report: &BatchReport) {
    println!(
        "{} screen {} (visit {}): {} new, {} cached, {} edges",
        report.app_id,
        short(report.screen_hash.as_str()),
        report.screen.visit_count,
        report.new_element_ids.len(),
        report.cache_hits,
        report.edges_written,
    );
    if let Some(context) = &report.context {
        println!(
            "  {} / {} at level {}{}",
            context.screen_type,
            context.form_context,
            context.navigation_level,
            context
                .primary_action
                .as_deref()
                .map(|a| format!(", primary action '{}'", a))
                .unwrap_or_default(),
        );
    }
    if let Some(transition) = &report.transition {
        println!(
            "  from {} (seen {}x, avg {:.0} ms)",
            short(transition.from_hash.as_str()),
            transition.count,
            transition.avg_duration_ms,
        );
    }
}

// ============================================================================
// Query subcommands
// ============================================================================

pub fn cmd_stats(db: &Path, app: &str) -> CmdResult<()> {
    let store = SqliteStore::open(db)?;
    let Some(record) = store.app(app)? else {
        println!("No scrapes recorded for {}", app);
        return Ok(());
    };

    println!("App:         {}", record.app_id);
    println!("Elements:    {}", record.element_count);
    println!("Screens:     {}", record.screen_count);
    println!("Edges:       {}", store.count_edges(app)?);
    println!("Transitions: {}", store.transitions_for_app(app)?.len());
    println!("First seen:  {}", record.first_scraped_ms);
    println!("Last seen:   {}", record.last_scraped_ms);
    Ok(())
}

pub fn cmd_hierarchy(db: &Path, app: &str) -> CmdResult<()> {
    let store = SqliteStore::open(db)?;
    let elements = store.elements_for_app(app)?;
    let edges = store.edges_for_app(app)?;

    if elements.is_empty() {
        println!("No elements stored for {}", app);
        return Ok(());
    }

    let lines = render_hierarchy(&elements, &edges);
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// Indented outline of the stored forest. Every element no edge points at
/// starts a tree, so elements absent from the latest scrape show up as
/// lone roots.
pub fn render_hierarchy(elements: &[ElementRecord], edges: &[HierarchyEdge]) -> Vec<String> {
    let by_id: HashMap<ElementId, &ElementRecord> = elements.iter().map(|e| (e.id, e)).collect();
    let mut children: BTreeMap<ElementId, Vec<&HierarchyEdge>> = BTreeMap::new();
    let mut has_parent = HashSet::new();
    for edge in edges {
        children.entry(edge.parent_id).or_default().push(edge);
        has_parent.insert(edge.child_id);
    }
    for list in children.values_mut() {
        list.sort_by_key(|e| e.order);
    }

    let mut lines = Vec::new();
    let mut stack: Vec<(ElementId, usize)> = elements
        .iter()
        .filter(|e| !has_parent.contains(&e.id))
        .map(|e| (e.id, 0))
        .rev()
        .collect();
    let mut seen = HashSet::new();

    while let Some((id, indent)) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(element) = by_id.get(&id) {
            lines.push(format!("{}{}", "  ".repeat(indent), describe(element)));
        }
        if let Some(kids) = children.get(&id) {
            for edge in kids.iter().rev() {
                stack.push((edge.child_id, indent + 1));
            }
        }
    }
    lines
}

fn describe(element: &ElementRecord) -> String {
    let mut out = format!("#{} {}", element.id, element.class_name);
    if let Some(rid) = &element.resource_id {
        out.push_str(&format!(" [{}]", rid));
    }
    if let Some(label) = element.text.as_ref().or(element.description.as_ref()) {
        out.push_str(&format!(" \"{}\"", label));
    }
    if let Some(group) = &element.form_group {
        out.push_str(&format!(" {}", group));
    }
    out
}

pub fn cmd_screens(db: &Path, app: &str) -> CmdResult<()> {
    let store = SqliteStore::open(db)?;
    let screens = store.screens_for_app(app)?;
    if screens.is_empty() {
        println!("No screens recorded for {}", app);
        return Ok(());
    }

    for screen in &screens {
        let context = store.screen_context(&screen.hash)?;
        println!(
            "{}  {:<40} visits={:<4} depth={} elements={}{}",
            short(screen.hash.as_str()),
            screen.title.as_deref().unwrap_or(&screen.activity),
            screen.visit_count,
            screen.navigation_depth,
            screen.element_count,
            context
                .map(|c| format!("  {}", c.context.screen_type))
                .unwrap_or_default(),
        );
    }
    Ok(())
}

pub fn cmd_transitions(db: &Path, app: &str) -> CmdResult<()> {
    let store = SqliteStore::open(db)?;
    let transitions = store.transitions_for_app(app)?;
    if transitions.is_empty() {
        println!("No transitions recorded for {}", app);
        return Ok(());
    }

    for t in &transitions {
        println!(
            "{} -> {}  count={} avg={:.0}ms",
            short(t.from_hash.as_str()),
            short(t.to_hash.as_str()),
            t.count,
            t.avg_duration_ms,
        );
    }
    Ok(())
}

pub fn cmd_delete_app(db: &Path, app: &str) -> CmdResult<()> {
    let mut store = SqliteStore::open(db)?;
    if store.delete_app(app)? {
        println!("Deleted {}", app);
    } else {
        println!("No data for {}", app);
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn short(hex: &str) -> &str {
    &hex[..hex.len().min(12)]
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
