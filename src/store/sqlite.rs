use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, params_from_iter};
use tracing::debug;

use crate::fingerprint::{ElementHash, ScreenHash};
use crate::scrape::dedup::{DedupResolver, Resolution};
use crate::scrape::model::ScrapedElement;
use crate::screen::screen_model::{FormContext, ScreenContext, ScreenType, ValidationTag};

use super::error::StoreError;
use super::model::{
    AppRecord, ElementId, ElementRecord, HierarchyEdge, ScreenContextRecord, ScreenRecord,
    ScreenTransition, ScreenUpsert,
};
use super::{ScrapeStore, StoreTx};

/// Bound parameters per `IN (...)` query.
const IN_CHUNK: usize = 500;

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS apps (
  app_id TEXT PRIMARY KEY,
  element_count INTEGER NOT NULL DEFAULT 0,
  screen_count INTEGER NOT NULL DEFAULT 0,
  first_scraped_ms INTEGER NOT NULL,
  last_scraped_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS elements (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  app_id TEXT NOT NULL REFERENCES apps(app_id) ON DELETE CASCADE,
  element_hash TEXT NOT NULL,
  class_name TEXT NOT NULL,
  resource_id TEXT,
  text TEXT,
  description TEXT,
  clickable INTEGER NOT NULL,
  editable INTEGER NOT NULL,
  depth INTEGER NOT NULL,
  traversal_index INTEGER NOT NULL,
  path TEXT NOT NULL,
  screen_hash TEXT,
  external_id TEXT,
  form_group TEXT,
  validation TEXT,
  first_seen_ms INTEGER NOT NULL,
  last_seen_ms INTEGER NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_elements_app_hash ON elements(app_id, element_hash);

CREATE TABLE IF NOT EXISTS hierarchy_edges (
  app_id TEXT NOT NULL REFERENCES apps(app_id) ON DELETE CASCADE,
  parent_id INTEGER NOT NULL REFERENCES elements(id) ON DELETE CASCADE,
  child_id INTEGER NOT NULL REFERENCES elements(id) ON DELETE CASCADE,
  child_order INTEGER NOT NULL,
  depth INTEGER NOT NULL,
  PRIMARY KEY (parent_id, child_id)
);
CREATE INDEX IF NOT EXISTS idx_edges_app ON hierarchy_edges(app_id);
CREATE INDEX IF NOT EXISTS idx_edges_child ON hierarchy_edges(child_id);

CREATE TABLE IF NOT EXISTS screens (
  screen_hash TEXT PRIMARY KEY,
  app_id TEXT NOT NULL REFERENCES apps(app_id) ON DELETE CASCADE,
  activity TEXT NOT NULL,
  title TEXT,
  navigation_depth INTEGER NOT NULL,
  element_count INTEGER NOT NULL,
  visit_count INTEGER NOT NULL,
  first_seen_ms INTEGER NOT NULL,
  last_seen_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_screens_app ON screens(app_id);

CREATE TABLE IF NOT EXISTS screen_transitions (
  app_id TEXT NOT NULL REFERENCES apps(app_id) ON DELETE CASCADE,
  from_hash TEXT NOT NULL REFERENCES screens(screen_hash) ON DELETE CASCADE,
  to_hash TEXT NOT NULL REFERENCES screens(screen_hash) ON DELETE CASCADE,
  count INTEGER NOT NULL,
  first_seen_ms INTEGER NOT NULL,
  last_seen_ms INTEGER NOT NULL,
  avg_duration_ms REAL NOT NULL,
  PRIMARY KEY (from_hash, to_hash)
);
CREATE INDEX IF NOT EXISTS idx_transitions_app ON screen_transitions(app_id);

CREATE TABLE IF NOT EXISTS screen_contexts (
  screen_hash TEXT PRIMARY KEY REFERENCES screens(screen_hash) ON DELETE CASCADE,
  app_id TEXT NOT NULL REFERENCES apps(app_id) ON DELETE CASCADE,
  screen_type TEXT NOT NULL,
  form_context TEXT NOT NULL,
  primary_action TEXT,
  navigation_level INTEGER NOT NULL,
  classified_at_ms INTEGER NOT NULL
);
"#;

const ELEMENT_COLUMNS: &str = "id, app_id, element_hash, class_name, resource_id, text, description, \
     clickable, editable, depth, traversal_index, path, screen_hash, external_id, form_group, \
     validation, first_seen_ms, last_seen_ms";

const SCREEN_COLUMNS: &str = "screen_hash, app_id, activity, title, navigation_depth, element_count, \
     visit_count, first_seen_ms, last_seen_ms";

const TRANSITION_COLUMNS: &str =
    "app_id, from_hash, to_hash, count, first_seen_ms, last_seen_ms, avg_duration_ms";

const APP_COLUMNS: &str = "app_id, element_count, screen_count, first_scraped_ms, last_scraped_ms";

// ============================================================================
// SqliteStore
// ============================================================================

/// SQLite-backed scrape store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!(path = %path.display(), journal_mode = %mode, "store opened");
        Self::bootstrap(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // ------------------------------------------------------------------------
    // Read queries for downstream consumers
    // ------------------------------------------------------------------------

    pub fn app(&self, app_id: &str) -> Result<Option<AppRecord>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {APP_COLUMNS} FROM apps WHERE app_id = ?1"),
                params![app_id],
                map_app,
            )
            .optional()?)
    }

    pub fn element(&self, id: ElementId) -> Result<Option<ElementRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ELEMENT_COLUMNS} FROM elements WHERE id = ?1"),
                params![id.0],
                ElementRow::from_row,
            )
            .optional()?;
        row.map(ElementRow::into_record).transpose()
    }

    pub fn element_by_hash(
        &self,
        app_id: &str,
        hash: &ElementHash,
    ) -> Result<Option<ElementRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ELEMENT_COLUMNS} FROM elements WHERE app_id = ?1 AND element_hash = ?2"
                ),
                params![app_id, hash.as_str()],
                ElementRow::from_row,
            )
            .optional()?;
        row.map(ElementRow::into_record).transpose()
    }

    pub fn elements_for_app(&self, app_id: &str) -> Result<Vec<ElementRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ELEMENT_COLUMNS} FROM elements WHERE app_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map(params![app_id], ElementRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ElementRow::into_record).collect()
    }

    pub fn edges_for_app(&self, app_id: &str) -> Result<Vec<HierarchyEdge>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT parent_id, child_id, child_order, depth FROM hierarchy_edges
             WHERE app_id = ?1 ORDER BY depth, parent_id, child_order",
        )?;
        let edges = stmt
            .query_map(params![app_id], map_edge)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    pub fn children_of(&self, parent: ElementId) -> Result<Vec<HierarchyEdge>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT parent_id, child_id, child_order, depth FROM hierarchy_edges
             WHERE parent_id = ?1 ORDER BY child_order",
        )?;
        let edges = stmt
            .query_map(params![parent.0], map_edge)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    pub fn parent_of(&self, child: ElementId) -> Result<Option<HierarchyEdge>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT parent_id, child_id, child_order, depth FROM hierarchy_edges
                 WHERE child_id = ?1 LIMIT 1",
                params![child.0],
                map_edge,
            )
            .optional()?)
    }

    pub fn screen(&self, hash: &ScreenHash) -> Result<Option<ScreenRecord>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {SCREEN_COLUMNS} FROM screens WHERE screen_hash = ?1"),
                params![hash.as_str()],
                map_screen,
            )
            .optional()?)
    }

    pub fn screens_for_app(&self, app_id: &str) -> Result<Vec<ScreenRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SCREEN_COLUMNS} FROM screens WHERE app_id = ?1 ORDER BY first_seen_ms, screen_hash"
        ))?;
        let screens = stmt
            .query_map(params![app_id], map_screen)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(screens)
    }

    pub fn screen_context(
        &self,
        hash: &ScreenHash,
    ) -> Result<Option<ScreenContextRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT screen_hash, app_id, screen_type, form_context, primary_action,
                        navigation_level, classified_at_ms
                 FROM screen_contexts WHERE screen_hash = ?1",
                params![hash.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, u32>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((hash, app_id, screen_type, form_context, primary_action, level, at)) = row
        else {
            return Ok(None);
        };

        let screen_type = ScreenType::parse(&screen_type).ok_or_else(|| StoreError::Corrupt {
            table: "screen_contexts",
            detail: format!("unknown screen_type '{screen_type}'"),
        })?;
        let form_context =
            FormContext::parse(&form_context).ok_or_else(|| StoreError::Corrupt {
                table: "screen_contexts",
                detail: format!("unknown form_context '{form_context}'"),
            })?;

        Ok(Some(ScreenContextRecord {
            screen_hash: ScreenHash::from_hex(hash),
            app_id,
            context: ScreenContext {
                screen_type,
                form_context,
                primary_action,
                navigation_level: level,
            },
            classified_at_ms: at,
        }))
    }

    pub fn transitions_from(&self, from: &ScreenHash) -> Result<Vec<ScreenTransition>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRANSITION_COLUMNS} FROM screen_transitions
             WHERE from_hash = ?1 ORDER BY count DESC, to_hash"
        ))?;
        let transitions = stmt
            .query_map(params![from.as_str()], map_transition)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(transitions)
    }

    pub fn transitions_for_app(&self, app_id: &str) -> Result<Vec<ScreenTransition>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRANSITION_COLUMNS} FROM screen_transitions
             WHERE app_id = ?1 ORDER BY first_seen_ms, from_hash, to_hash"
        ))?;
        let transitions = stmt
            .query_map(params![app_id], map_transition)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(transitions)
    }

    pub fn count_elements(&self, app_id: &str) -> Result<usize, StoreError> {
        count(&self.conn, "SELECT COUNT(*) FROM elements WHERE app_id = ?1", app_id)
    }

    pub fn count_edges(&self, app_id: &str) -> Result<usize, StoreError> {
        count(&self.conn, "SELECT COUNT(*) FROM hierarchy_edges WHERE app_id = ?1", app_id)
    }

    /// Edges whose endpoints are missing from `elements`. Always empty while
    /// foreign keys are enforced.
    pub fn count_orphan_edges(&self) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM hierarchy_edges e
             WHERE NOT EXISTS (SELECT 1 FROM elements p WHERE p.id = e.parent_id)
                OR NOT EXISTS (SELECT 1 FROM elements c WHERE c.id = e.child_id)",
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Delete an app and, through cascades, everything it owns.
    pub fn delete_app(&mut self, app_id: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM apps WHERE app_id = ?1", params![app_id])?;
        debug!(app_id, deleted, "app deleted");
        Ok(deleted > 0)
    }
}

impl DedupResolver for SqliteStore {
    fn resolve(&self, app_id: &str, hash: &ElementHash) -> Result<Resolution, StoreError> {
        let id: Option<i64> = self
            .conn
            .prepare_cached("SELECT id FROM elements WHERE app_id = ?1 AND element_hash = ?2")?
            .query_row(params![app_id, hash.as_str()], |row| row.get(0))
            .optional()?;

        Ok(match id {
            Some(id) => Resolution::Found(ElementId(id)),
            None => Resolution::NotFound,
        })
    }
}

impl ScrapeStore for SqliteStore {
    type Tx<'a> = SqliteTx<'a>;

    fn begin(&mut self) -> Result<SqliteTx<'_>, StoreError> {
        Ok(SqliteTx {
            tx: self.conn.transaction()?,
        })
    }

    fn save_screen_context(
        &mut self,
        app_id: &str,
        screen_hash: &ScreenHash,
        context: &ScreenContext,
        classified_at_ms: i64,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO screen_contexts
               (screen_hash, app_id, screen_type, form_context, primary_action, navigation_level, classified_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(screen_hash) DO UPDATE SET
               screen_type = excluded.screen_type,
               form_context = excluded.form_context,
               primary_action = excluded.primary_action,
               navigation_level = excluded.navigation_level,
               classified_at_ms = excluded.classified_at_ms",
            params![
                screen_hash.as_str(),
                app_id,
                context.screen_type.as_str(),
                context.form_context.as_str(),
                context.primary_action,
                context.navigation_level,
                classified_at_ms,
            ],
        )?;
        Ok(())
    }

    fn set_external_id(&mut self, id: ElementId, external_id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE elements SET external_id = ?2 WHERE id = ?1",
            params![id.0, external_id],
        )?;
        Ok(())
    }
}

// ============================================================================
// SqliteTx
// ============================================================================

/// One batch transaction. Rolls back when dropped uncommitted.
pub struct SqliteTx<'conn> {
    tx: Transaction<'conn>,
}

impl StoreTx for SqliteTx<'_> {
    fn ensure_app(&mut self, app_id: &str, now_ms: i64) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO apps (app_id, first_scraped_ms, last_scraped_ms) VALUES (?1, ?2, ?2)
             ON CONFLICT(app_id) DO NOTHING",
            params![app_id, now_ms],
        )?;
        Ok(())
    }

    fn delete_edges_for_app(&mut self, app_id: &str) -> Result<usize, StoreError> {
        Ok(self
            .tx
            .execute("DELETE FROM hierarchy_edges WHERE app_id = ?1", params![app_id])?)
    }

    fn upsert_element(
        &mut self,
        app_id: &str,
        screen_hash: &ScreenHash,
        element: &ScrapedElement,
        now_ms: i64,
    ) -> Result<ElementId, StoreError> {
        let id: i64 = self
            .tx
            .prepare_cached(
                "INSERT INTO elements
                   (app_id, element_hash, class_name, resource_id, text, description,
                    clickable, editable, depth, traversal_index, path, screen_hash,
                    form_group, validation, first_seen_ms, last_seen_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
                 ON CONFLICT(app_id, element_hash) DO UPDATE SET last_seen_ms = excluded.last_seen_ms
                 RETURNING id",
            )?
            .query_row(
                params![
                    app_id,
                    element.hash.as_str(),
                    element.class_name,
                    element.resource_id,
                    element.text,
                    element.description,
                    element.clickable,
                    element.editable,
                    element.depth,
                    element.traversal_index,
                    element.path,
                    screen_hash.as_str(),
                    element.form_group,
                    element.validation.map(|v| v.as_str()),
                    now_ms,
                ],
                |row| row.get(0),
            )?;
        Ok(ElementId(id))
    }

    fn count_elements_with_hashes(
        &mut self,
        app_id: &str,
        hashes: &[&ElementHash],
    ) -> Result<usize, StoreError> {
        let mut total = 0;
        for chunk in hashes.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT COUNT(*) FROM elements WHERE app_id = ? AND element_hash IN ({})",
                placeholders(chunk.len())
            );
            let values = std::iter::once(app_id).chain(chunk.iter().map(|h| h.as_str()));
            let n: i64 = self
                .tx
                .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
            total += n as usize;
        }
        Ok(total)
    }

    fn count_elements_with_ids(&mut self, app_id: &str, ids: &[ElementId]) -> Result<usize, StoreError> {
        let mut total = 0;
        for chunk in ids.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT COUNT(*) FROM elements WHERE app_id = ?1 AND id IN ({})",
                numbered_placeholders(2, chunk.len())
            );
            let mut values: Vec<rusqlite::types::Value> = Vec::with_capacity(chunk.len() + 1);
            values.push(app_id.to_string().into());
            values.extend(chunk.iter().map(|id| id.0.into()));
            let n: i64 = self
                .tx
                .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
            total += n as usize;
        }
        Ok(total)
    }

    fn insert_edges(&mut self, app_id: &str, edges: &[HierarchyEdge]) -> Result<usize, StoreError> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO hierarchy_edges (app_id, parent_id, child_id, child_order, depth)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut inserted = 0;
        for edge in edges {
            inserted += stmt.execute(params![
                app_id,
                edge.parent_id.0,
                edge.child_id.0,
                edge.order,
                edge.depth
            ])?;
        }
        Ok(inserted)
    }

    fn upsert_screen(&mut self, screen: &ScreenUpsert) -> Result<ScreenRecord, StoreError> {
        Ok(self.tx.query_row(
            &format!(
                "INSERT INTO screens
                   (screen_hash, app_id, activity, title, navigation_depth, element_count,
                    visit_count, first_seen_ms, last_seen_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)
                 ON CONFLICT(screen_hash) DO UPDATE SET
                   visit_count = visit_count + 1,
                   last_seen_ms = excluded.last_seen_ms
                 RETURNING {SCREEN_COLUMNS}"
            ),
            params![
                screen.hash.as_str(),
                screen.app_id,
                screen.activity,
                screen.title,
                screen.navigation_depth,
                screen.element_count,
                screen.seen_at_ms,
            ],
            map_screen,
        )?)
    }

    fn record_transition(
        &mut self,
        app_id: &str,
        from: &ScreenHash,
        to: &ScreenHash,
        seen_at_ms: i64,
        duration_ms: i64,
    ) -> Result<ScreenTransition, StoreError> {
        Ok(self.tx.query_row(
            &format!(
                "INSERT INTO screen_transitions
                   (app_id, from_hash, to_hash, count, first_seen_ms, last_seen_ms, avg_duration_ms)
                 VALUES (?1, ?2, ?3, 1, ?4, ?4, ?5)
                 ON CONFLICT(from_hash, to_hash) DO UPDATE SET
                   avg_duration_ms = (avg_duration_ms * count + excluded.avg_duration_ms) / (count + 1),
                   count = count + 1,
                   last_seen_ms = excluded.last_seen_ms
                 RETURNING {TRANSITION_COLUMNS}"
            ),
            params![app_id, from.as_str(), to.as_str(), seen_at_ms, duration_ms as f64],
            map_transition,
        )?)
    }

    fn refresh_app_counts(&mut self, app_id: &str, now_ms: i64) -> Result<AppRecord, StoreError> {
        Ok(self.tx.query_row(
            &format!(
                "UPDATE apps SET
                   element_count = (SELECT COUNT(*) FROM elements WHERE app_id = ?1),
                   screen_count = (SELECT COUNT(*) FROM screens WHERE app_id = ?1),
                   last_scraped_ms = ?2
                 WHERE app_id = ?1
                 RETURNING {APP_COLUMNS}"
            ),
            params![app_id, now_ms],
            map_app,
        )?)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}

// ============================================================================
// Row mapping
// ============================================================================

struct ElementRow {
    id: i64,
    app_id: String,
    hash: String,
    class_name: String,
    resource_id: Option<String>,
    text: Option<String>,
    description: Option<String>,
    clickable: bool,
    editable: bool,
    depth: u32,
    traversal_index: u32,
    path: String,
    screen_hash: Option<String>,
    external_id: Option<String>,
    form_group: Option<String>,
    validation: Option<String>,
    first_seen_ms: i64,
    last_seen_ms: i64,
}

impl ElementRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            app_id: row.get(1)?,
            hash: row.get(2)?,
            class_name: row.get(3)?,
            resource_id: row.get(4)?,
            text: row.get(5)?,
            description: row.get(6)?,
            clickable: row.get(7)?,
            editable: row.get(8)?,
            depth: row.get(9)?,
            traversal_index: row.get(10)?,
            path: row.get(11)?,
            screen_hash: row.get(12)?,
            external_id: row.get(13)?,
            form_group: row.get(14)?,
            validation: row.get(15)?,
            first_seen_ms: row.get(16)?,
            last_seen_ms: row.get(17)?,
        })
    }

    fn into_record(self) -> Result<ElementRecord, StoreError> {
        let validation = match self.validation {
            Some(label) => Some(ValidationTag::parse(&label).ok_or_else(|| {
                StoreError::Corrupt {
                    table: "elements",
                    detail: format!("unknown validation tag '{label}' on element {}", self.id),
                }
            })?),
            None => None,
        };

        Ok(ElementRecord {
            id: ElementId(self.id),
            app_id: self.app_id,
            hash: ElementHash::from_hex(self.hash),
            class_name: self.class_name,
            resource_id: self.resource_id,
            text: self.text,
            description: self.description,
            clickable: self.clickable,
            editable: self.editable,
            depth: self.depth,
            traversal_index: self.traversal_index,
            path: self.path,
            screen_hash: self.screen_hash.map(ScreenHash::from_hex),
            external_id: self.external_id,
            form_group: self.form_group,
            validation,
            first_seen_ms: self.first_seen_ms,
            last_seen_ms: self.last_seen_ms,
        })
    }
}

fn map_edge(row: &Row<'_>) -> rusqlite::Result<HierarchyEdge> {
    Ok(HierarchyEdge {
        parent_id: ElementId(row.get(0)?),
        child_id: ElementId(row.get(1)?),
        order: row.get(2)?,
        depth: row.get(3)?,
    })
}

fn map_screen(row: &Row<'_>) -> rusqlite::Result<ScreenRecord> {
    Ok(ScreenRecord {
        hash: ScreenHash::from_hex(row.get::<_, String>(0)?),
        app_id: row.get(1)?,
        activity: row.get(2)?,
        title: row.get(3)?,
        navigation_depth: row.get(4)?,
        element_count: row.get(5)?,
        visit_count: row.get(6)?,
        first_seen_ms: row.get(7)?,
        last_seen_ms: row.get(8)?,
    })
}

fn map_transition(row: &Row<'_>) -> rusqlite::Result<ScreenTransition> {
    Ok(ScreenTransition {
        app_id: row.get(0)?,
        from_hash: ScreenHash::from_hex(row.get::<_, String>(1)?),
        to_hash: ScreenHash::from_hex(row.get::<_, String>(2)?),
        count: row.get(3)?,
        first_seen_ms: row.get(4)?,
        last_seen_ms: row.get(5)?,
        avg_duration_ms: row.get(6)?,
    })
}

fn map_app(row: &Row<'_>) -> rusqlite::Result<AppRecord> {
    Ok(AppRecord {
        app_id: row.get(0)?,
        element_count: row.get::<_, i64>(1)? as u64,
        screen_count: row.get::<_, i64>(2)? as u64,
        first_scraped_ms: row.get(3)?,
        last_scraped_ms: row.get(4)?,
    })
}

fn count(conn: &Connection, sql: &str, app_id: &str) -> Result<usize, StoreError> {
    let n: i64 = conn.query_row(sql, params![app_id], |row| row.get(0))?;
    Ok(n as usize)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn numbered_placeholders(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}
