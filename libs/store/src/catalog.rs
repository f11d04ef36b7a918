//! Catalog tables: guides, features, pages and reports

use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;
use tracing::debug;
use types::{CatalogEntity, DataOverview, EntityKind, Guide, GuideState, GuideStep};

use crate::error::{Result, StoreError};
use crate::store::Store;

const GUIDE_COLUMNS: &str =
    "id, name, state, launch_method, app_id, steps_json, created_at, last_updated_at";

const CATALOG_COLUMNS: &str = "id, name, kind, app_id, created_at, last_updated_at";

struct GuideRow {
    id: String,
    name: String,
    state: String,
    launch_method: Option<String>,
    app_id: Option<i64>,
    steps_json: String,
    created_at: Option<i64>,
    last_updated_at: Option<i64>,
}

impl GuideRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            state: row.get(2)?,
            launch_method: row.get(3)?,
            app_id: row.get(4)?,
            steps_json: row.get(5)?,
            created_at: row.get(6)?,
            last_updated_at: row.get(7)?,
        })
    }

    fn into_guide(self) -> Result<Guide> {
        let steps: Vec<GuideStep> = serde_json::from_str(&self.steps_json)?;
        Ok(Guide {
            id: self.id,
            name: self.name,
            state: GuideState::from_db(&self.state),
            launch_method: self.launch_method,
            app_id: self.app_id,
            steps,
            created_at: self.created_at,
            last_updated_at: self.last_updated_at,
        })
    }
}

fn catalog_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntity> {
    Ok(CatalogEntity {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        app_id: row.get(3)?,
        created_at: row.get(4)?,
        last_updated_at: row.get(5)?,
    })
}

fn catalog_table(kind: EntityKind) -> Result<&'static str> {
    match kind {
        EntityKind::Guide => Err(StoreError::UnsupportedKind(kind)),
        other => Ok(other.table()),
    }
}

impl Store {
    /// Insert or replace guides; each item carries its raw API document
    pub fn upsert_guides(&self, guides: &[(Guide, Value)], synced_at: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO guides (id, name, state, launch_method, app_id, steps_json,
                                         created_at, last_updated_at, raw_json, synced_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        state = excluded.state,
                        launch_method = excluded.launch_method,
                        app_id = excluded.app_id,
                        steps_json = excluded.steps_json,
                        created_at = excluded.created_at,
                        last_updated_at = excluded.last_updated_at,
                        raw_json = excluded.raw_json,
                        synced_at = excluded.synced_at",
                )?;

                for (guide, raw) in guides {
                    stmt.execute(params![
                        guide.id,
                        guide.name,
                        guide.state.as_str(),
                        guide.launch_method,
                        guide.app_id,
                        serde_json::to_string(&guide.steps)?,
                        guide.created_at,
                        guide.last_updated_at,
                        raw.to_string(),
                        synced_at,
                    ])?;
                }
            }
            tx.commit()?;

            debug!("Upserted {} guides", guides.len());
            Ok(guides.len())
        })
    }

    /// Insert or replace features, pages or reports
    pub fn upsert_catalog(
        &self,
        kind: EntityKind,
        items: &[(CatalogEntity, Value)],
        synced_at: i64,
    ) -> Result<usize> {
        let table = catalog_table(kind)?;

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let sql = format!(
                    "INSERT INTO {table} ({CATALOG_COLUMNS}, raw_json, synced_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        kind = excluded.kind,
                        app_id = excluded.app_id,
                        created_at = excluded.created_at,
                        last_updated_at = excluded.last_updated_at,
                        raw_json = excluded.raw_json,
                        synced_at = excluded.synced_at"
                );
                let mut stmt = tx.prepare(&sql)?;

                for (entity, raw) in items {
                    stmt.execute(params![
                        entity.id,
                        entity.name,
                        entity.kind,
                        entity.app_id,
                        entity.created_at,
                        entity.last_updated_at,
                        raw.to_string(),
                        synced_at,
                    ])?;
                }
            }
            tx.commit()?;

            debug!("Upserted {} {}", items.len(), kind);
            Ok(items.len())
        })
    }

    /// All guides ordered by name
    pub fn list_guides(&self) -> Result<Vec<Guide>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GUIDE_COLUMNS} FROM guides ORDER BY name COLLATE NOCASE, id"
            ))?;
            let rows = stmt
                .query_map([], GuideRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(GuideRow::into_guide).collect()
        })
    }

    pub fn get_guide(&self, id: &str) -> Result<Option<Guide>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {GUIDE_COLUMNS} FROM guides WHERE id = ?1"),
                    params![id],
                    GuideRow::from_row,
                )
                .optional()?;
            row.map(GuideRow::into_guide).transpose()
        })
    }

    /// Features, pages or reports ordered by name
    pub fn list_catalog(&self, kind: EntityKind) -> Result<Vec<CatalogEntity>> {
        let table = catalog_table(kind)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CATALOG_COLUMNS} FROM {table} ORDER BY name COLLATE NOCASE, id"
            ))?;
            let items = stmt
                .query_map([], catalog_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
    }

    pub fn count(&self, kind: EntityKind) -> Result<u64> {
        let table = kind.table();
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    /// Number of guides per state
    pub fn guide_state_counts(&self) -> Result<Vec<(GuideState, u64)>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT state, COUNT(*) FROM guides GROUP BY state ORDER BY state")?;
            let counts = stmt
                .query_map([], |row| {
                    let state: String = row.get(0)?;
                    let count: i64 = row.get(1)?;
                    Ok((GuideState::from_db(&state), count as u64))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(counts)
        })
    }

    /// Catalog totals for the dashboard landing page
    pub fn data_overview(&self) -> Result<DataOverview> {
        let mut overview = DataOverview {
            guides: self.count(EntityKind::Guide)?,
            features: self.count(EntityKind::Feature)?,
            pages: self.count(EntityKind::Page)?,
            reports: self.count(EntityKind::Report)?,
            last_synced_at: self.last_successful_sync_at()?,
            ..Default::default()
        };

        for (state, count) in self.guide_state_counts()? {
            overview.record_guide_state(state, count);
        }

        Ok(overview)
    }
}
