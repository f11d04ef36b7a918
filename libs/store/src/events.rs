//! Raw guide events and per-day usage rows

use rusqlite::{params, Row};
use tracing::debug;
use types::{GuideEvent, GuideEventKind, UsageEvent, UsageTarget};

use crate::error::Result;
use crate::store::Store;

fn guide_event_from_row(row: &Row<'_>) -> rusqlite::Result<GuideEvent> {
    let step_id: String = row.get(1)?;
    let kind: String = row.get(4)?;
    Ok(GuideEvent {
        guide_id: row.get(0)?,
        guide_step_id: (!step_id.is_empty()).then_some(step_id),
        visitor_id: row.get(2)?,
        account_id: row.get(3)?,
        kind: GuideEventKind::from_db(&kind),
        browser_time: row.get(5)?,
        country: row.get(6)?,
        region: row.get(7)?,
        user_agent: row.get(8)?,
    })
}

fn usage_event_from_row(target_kind: UsageTarget, row: &Row<'_>) -> rusqlite::Result<UsageEvent> {
    Ok(UsageEvent {
        target_kind,
        target_id: row.get(0)?,
        visitor_id: row.get(1)?,
        day: row.get(2)?,
        account_id: row.get(3)?,
        num_events: row.get(4)?,
        num_minutes: row.get(5)?,
        rage_clicks: row.get(6)?,
        dead_clicks: row.get(7)?,
        error_clicks: row.get(8)?,
        u_turns: row.get(9)?,
        country: row.get(10)?,
        user_agent: row.get(11)?,
    })
}

impl Store {
    /// Insert guide events, ignoring ones already stored
    ///
    /// Returns the number of rows actually inserted.
    pub fn insert_guide_events(&self, events: &[GuideEvent]) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO guide_events
                        (guide_id, step_id, visitor_id, account_id, kind, browser_time,
                         country, region, user_agent)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;

                for event in events {
                    inserted += stmt.execute(params![
                        event.guide_id,
                        event.guide_step_id.as_deref().unwrap_or(""),
                        event.visitor_id,
                        event.account_id,
                        event.kind.as_str(),
                        event.browser_time,
                        event.country,
                        event.region,
                        event.user_agent,
                    ])?;
                }
            }
            tx.commit()?;

            debug!(
                "Inserted {} of {} guide events ({} duplicates)",
                inserted,
                events.len(),
                events.len() - inserted
            );
            Ok(inserted)
        })
    }

    /// Insert or replace usage rows; a re-fetched day overwrites its counters
    pub fn upsert_usage_events(&self, rows: &[UsageEvent]) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO usage_events
                        (target_kind, target_id, visitor_id, day, account_id, num_events,
                         num_minutes, rage_clicks, dead_clicks, error_clicks, u_turns,
                         country, user_agent)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                     ON CONFLICT(target_kind, target_id, visitor_id, day) DO UPDATE SET
                        account_id = excluded.account_id,
                        num_events = excluded.num_events,
                        num_minutes = excluded.num_minutes,
                        rage_clicks = excluded.rage_clicks,
                        dead_clicks = excluded.dead_clicks,
                        error_clicks = excluded.error_clicks,
                        u_turns = excluded.u_turns,
                        country = excluded.country,
                        user_agent = excluded.user_agent",
                )?;

                for row in rows {
                    stmt.execute(params![
                        row.target_kind.as_str(),
                        row.target_id,
                        row.visitor_id,
                        row.day,
                        row.account_id,
                        row.num_events,
                        row.num_minutes,
                        row.rage_clicks,
                        row.dead_clicks,
                        row.error_clicks,
                        row.u_turns,
                        row.country,
                        row.user_agent,
                    ])?;
                }
            }
            tx.commit()?;

            debug!("Upserted {} usage rows", rows.len());
            Ok(rows.len())
        })
    }

    /// Events for one guide at or after `since_ms`, oldest first
    pub fn guide_events(&self, guide_id: &str, since_ms: i64) -> Result<Vec<GuideEvent>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT guide_id, step_id, visitor_id, account_id, kind, browser_time,
                        country, region, user_agent
                 FROM guide_events
                 WHERE guide_id = ?1 AND browser_time >= ?2
                 ORDER BY browser_time, id",
            )?;
            let events = stmt
                .query_map(params![guide_id, since_ms], guide_event_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(events)
        })
    }

    /// Usage rows for one feature or page from the day containing `since_ms`
    pub fn usage_events(
        &self,
        target: UsageTarget,
        target_id: &str,
        since_ms: i64,
    ) -> Result<Vec<UsageEvent>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT target_id, visitor_id, day, account_id, num_events, num_minutes,
                        rage_clicks, dead_clicks, error_clicks, u_turns, country, user_agent
                 FROM usage_events
                 WHERE target_kind = ?1 AND target_id = ?2 AND day >= ?3
                 ORDER BY day, visitor_id",
            )?;
            let rows = stmt
                .query_map(
                    params![target.as_str(), target_id, types::day_bucket_ms(since_ms)],
                    |row| usage_event_from_row(target, row),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Delete events older than `before_ms`; returns the number of rows removed
    pub fn prune_events(&self, before_ms: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let guide_rows = tx.execute(
                "DELETE FROM guide_events WHERE browser_time < ?1",
                params![before_ms],
            )?;
            let usage_rows =
                tx.execute("DELETE FROM usage_events WHERE day < ?1", params![before_ms])?;
            tx.commit()?;

            debug!(
                "Pruned {} guide events and {} usage rows older than {}",
                guide_rows, usage_rows, before_ms
            );
            Ok(guide_rows + usage_rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::MS_PER_DAY;

    fn event(visitor: &str, step: Option<&str>, kind: GuideEventKind, at: i64) -> GuideEvent {
        GuideEvent {
            guide_id: "g1".to_string(),
            guide_step_id: step.map(str::to_string),
            visitor_id: visitor.to_string(),
            account_id: None,
            kind,
            browser_time: at,
            country: Some("US".to_string()),
            region: None,
            user_agent: None,
        }
    }

    fn usage(visitor: &str, day: i64, num_events: u64, rage: u64) -> UsageEvent {
        UsageEvent {
            target_kind: UsageTarget::Feature,
            target_id: "f1".to_string(),
            visitor_id: visitor.to_string(),
            account_id: Some("acme".to_string()),
            day,
            num_events,
            num_minutes: 1,
            rage_clicks: rage,
            dead_clicks: 0,
            error_clicks: 0,
            u_turns: 0,
            country: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_duplicate_guide_events_ignored() {
        let store = Store::in_memory().unwrap();
        let batch = vec![
            event("v1", Some("s1"), GuideEventKind::Seen, 100),
            event("v1", None, GuideEventKind::Dismissed, 200),
        ];

        assert_eq!(store.insert_guide_events(&batch).unwrap(), 2);
        assert_eq!(store.insert_guide_events(&batch).unwrap(), 0);

        let stored = store.guide_events("g1", 0).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].guide_step_id.as_deref(), Some("s1"));
        assert!(stored[1].guide_step_id.is_none());
        assert_eq!(stored[1].kind, GuideEventKind::Dismissed);
    }

    #[test]
    fn test_guide_events_since_filter() {
        let store = Store::in_memory().unwrap();
        store
            .insert_guide_events(&[
                event("v1", Some("s1"), GuideEventKind::Seen, 100),
                event("v2", Some("s1"), GuideEventKind::Seen, 500),
            ])
            .unwrap();

        let recent = store.guide_events("g1", 300).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].visitor_id, "v2");
        assert!(store.guide_events("other", 0).unwrap().is_empty());
    }

    #[test]
    fn test_usage_refetch_replaces_counters() {
        let store = Store::in_memory().unwrap();
        store.upsert_usage_events(&[usage("v1", 0, 5, 1)]).unwrap();
        store.upsert_usage_events(&[usage("v1", 0, 8, 0)]).unwrap();

        let rows = store.usage_events(UsageTarget::Feature, "f1", 0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].num_events, 8);
        assert_eq!(rows[0].rage_clicks, 0);
        assert_eq!(rows[0].account_id.as_deref(), Some("acme"));

        assert!(store
            .usage_events(UsageTarget::Page, "f1", 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_usage_since_uses_day_bucket() {
        let store = Store::in_memory().unwrap();
        store
            .upsert_usage_events(&[usage("v1", 0, 1, 0), usage("v1", MS_PER_DAY, 1, 0)])
            .unwrap();

        // Mid-day cut-off still includes that whole day
        let rows = store
            .usage_events(UsageTarget::Feature, "f1", MS_PER_DAY + 1000)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].day, MS_PER_DAY);
    }

    #[test]
    fn test_prune_events() {
        let store = Store::in_memory().unwrap();
        store
            .insert_guide_events(&[
                event("v1", None, GuideEventKind::Seen, 10),
                event("v1", None, GuideEventKind::Seen, 5 * MS_PER_DAY),
            ])
            .unwrap();
        store
            .upsert_usage_events(&[usage("v1", 0, 1, 0), usage("v1", 5 * MS_PER_DAY, 1, 0)])
            .unwrap();

        assert_eq!(store.prune_events(MS_PER_DAY).unwrap(), 2);
        assert_eq!(store.guide_events("g1", 0).unwrap().len(), 1);
        assert_eq!(
            store
                .usage_events(UsageTarget::Feature, "f1", 0)
                .unwrap()
                .len(),
            1
        );
    }
}
