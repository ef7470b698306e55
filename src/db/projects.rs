use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::models::{EntityType, NewStatusChange, ProjectInput, ProjectStatus, ShelterProject};
use super::status_changes::insert_status_change;
use super::{run, DbPool};

const PROJECT_COLUMNS: &str = "id, shelter_id, title, description, category, target_amount, \
     current_amount, start_date, end_date, image_url, status, created_at, updated_at";

fn fetch_project(conn: &Connection, id: &str) -> rusqlite::Result<Option<ShelterProject>> {
    conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM shelter_projects WHERE id = ?1"),
        params![id],
        ShelterProject::from_row,
    )
    .optional()
}

/// Inserts when `input.id` is absent (status `active`, nothing raised yet),
/// otherwise updates the project's editable fields within `shelter_id`.
pub async fn save_project(
    pool: &DbPool,
    shelter_id: &str,
    input: ProjectInput,
) -> anyhow::Result<Option<ShelterProject>> {
    let shelter_id = shelter_id.to_string();
    run(pool, move |conn| {
        let now = Utc::now();
        match input.id.clone() {
            None => {
                let id = Uuid::new_v4().to_string();
                conn.execute(
                    &format!(
                        "INSERT INTO shelter_projects ({PROJECT_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10, ?11, ?11)"
                    ),
                    params![
                        id,
                        shelter_id,
                        input.title,
                        input.description,
                        input.category,
                        input.target_amount,
                        input.start_date,
                        input.end_date,
                        input.image_url,
                        ProjectStatus::Active,
                        now
                    ],
                )?;
                fetch_project(conn, &id)
            }
            Some(id) => {
                let changed = conn.execute(
                    "UPDATE shelter_projects
                     SET title = ?3, description = ?4, category = ?5, target_amount = ?6,
                         start_date = ?7, end_date = ?8, image_url = ?9, updated_at = ?10
                     WHERE id = ?1 AND shelter_id = ?2",
                    params![
                        id,
                        shelter_id,
                        input.title,
                        input.description,
                        input.category,
                        input.target_amount,
                        input.start_date,
                        input.end_date,
                        input.image_url,
                        now
                    ],
                )?;
                if changed == 0 {
                    return Ok(None);
                }
                fetch_project(conn, &id)
            }
        }
    })
    .await
}

pub async fn get_project(pool: &DbPool, id: &str) -> anyhow::Result<Option<ShelterProject>> {
    let id = id.to_string();
    run(pool, move |conn| fetch_project(conn, &id)).await
}

/// Newest first, optionally narrowed to one status.
pub async fn list_projects_by_shelter(
    pool: &DbPool,
    shelter_id: &str,
    status: Option<ProjectStatus>,
) -> anyhow::Result<Vec<ShelterProject>> {
    let shelter_id = shelter_id.to_string();
    run(pool, move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM shelter_projects
             WHERE shelter_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![shelter_id, status], ShelterProject::from_row)?;
        rows.collect()
    })
    .await
}

pub async fn update_project_status(
    pool: &DbPool,
    id: &str,
    status: ProjectStatus,
    changed_by: &str,
) -> anyhow::Result<Option<ShelterProject>> {
    let id = id.to_string();
    let changed_by = changed_by.to_string();
    run(pool, move |conn| {
        let Some(existing) = fetch_project(conn, &id)? else {
            return Ok(None);
        };
        conn.execute(
            "UPDATE shelter_projects SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status, Utc::now()],
        )?;
        insert_status_change(
            conn,
            &NewStatusChange {
                entity_type: EntityType::Project,
                entity_id: id.clone(),
                old_status: Some(existing.status.as_str().to_string()),
                new_status: status.as_str().to_string(),
                changed_by: Some(changed_by),
                notes: None,
            },
        )?;
        fetch_project(conn, &id)
    })
    .await
}

pub(crate) fn add_to_project_amount(conn: &Connection, id: &str, amount: f64) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE shelter_projects SET current_amount = current_amount + ?2, updated_at = ?3
         WHERE id = ?1",
        params![id, amount, Utc::now()],
    )?;
    Ok(changed > 0)
}
