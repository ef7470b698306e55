use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::models::{EntityType, NewStatusChange, StatusChange};
use super::{run, DbPool};

/// Appends one audit row. Usable inside another statement sequence on the
/// same connection.
pub(crate) fn insert_status_change(
    conn: &Connection,
    change: &NewStatusChange,
) -> rusqlite::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO status_changes (id, entity_type, entity_id, old_status, new_status,
                                     changed_by, changed_at, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            change.entity_type,
            change.entity_id,
            change.old_status,
            change.new_status,
            change.changed_by,
            Utc::now(),
            change.notes
        ],
    )?;
    Ok(id)
}

pub async fn record_status_change(pool: &DbPool, change: NewStatusChange) -> anyhow::Result<String> {
    run(pool, move |conn| insert_status_change(conn, &change)).await
}

/// History for one entity, newest first.
pub async fn get_status_history(
    pool: &DbPool,
    entity_type: EntityType,
    entity_id: &str,
) -> anyhow::Result<Vec<StatusChange>> {
    let entity_id = entity_id.to_string();
    run(pool, move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, entity_type, entity_id, old_status, new_status, changed_by, changed_at, notes
             FROM status_changes
             WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY changed_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![entity_type, entity_id], StatusChange::from_row)?;
        rows.collect()
    })
    .await
}
