use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::models::{Shelter, ShelterInput};
use super::{run, DbPool};

pub(crate) const SHELTER_COLUMNS: &str = "id, name, address, contact_number, email, description, \
     logo_url, admin_id, is_verified, created_at, updated_at";

pub(crate) fn fetch_shelter(conn: &Connection, id: &str) -> rusqlite::Result<Option<Shelter>> {
    conn.query_row(
        &format!("SELECT {SHELTER_COLUMNS} FROM shelters WHERE id = ?1"),
        params![id],
        Shelter::from_row,
    )
    .optional()
}

/// Registers a shelter owned by `admin_id`. New shelters start unverified.
pub async fn create_shelter(
    pool: &DbPool,
    admin_id: &str,
    input: ShelterInput,
) -> anyhow::Result<Shelter> {
    let admin_id = admin_id.to_string();
    let shelter = run(pool, move |conn| {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO shelters (id, name, address, contact_number, email, description,
                                   admin_id, is_verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
            params![
                id,
                input.name,
                input.address,
                input.contact_number,
                input.email,
                input.description,
                admin_id,
                now
            ],
        )?;
        fetch_shelter(conn, &id)
    })
    .await?;

    shelter.ok_or_else(|| anyhow::anyhow!("shelter missing after insert"))
}

pub async fn get_shelter(pool: &DbPool, id: &str) -> anyhow::Result<Option<Shelter>> {
    let id = id.to_string();
    run(pool, move |conn| fetch_shelter(conn, &id)).await
}

pub async fn list_shelters_by_admin(pool: &DbPool, admin_id: &str) -> anyhow::Result<Vec<Shelter>> {
    let admin_id = admin_id.to_string();
    run(pool, move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {SHELTER_COLUMNS} FROM shelters WHERE admin_id = ?1 ORDER BY name"
        ))?;
        let rows = stmt.query_map(params![admin_id], Shelter::from_row)?;
        rows.collect()
    })
    .await
}

pub async fn list_verified_shelters(
    pool: &DbPool,
    limit: Option<u32>,
) -> anyhow::Result<Vec<Shelter>> {
    run(pool, move |conn| {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(i64::from).unwrap_or(-1);
        let mut stmt = conn.prepare(&format!(
            "SELECT {SHELTER_COLUMNS} FROM shelters WHERE is_verified = 1 ORDER BY name LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], Shelter::from_row)?;
        rows.collect()
    })
    .await
}

pub async fn set_shelter_verified(pool: &DbPool, id: &str, verified: bool) -> anyhow::Result<bool> {
    let id = id.to_string();
    run(pool, move |conn| {
        let changed = conn.execute(
            "UPDATE shelters SET is_verified = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, verified, Utc::now()],
        )?;
        Ok(changed > 0)
    })
    .await
}

pub async fn set_shelter_logo(pool: &DbPool, id: &str, logo_url: &str) -> anyhow::Result<bool> {
    let id = id.to_string();
    let logo_url = logo_url.to_string();
    run(pool, move |conn| {
        let changed = conn.execute(
            "UPDATE shelters SET logo_url = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, logo_url, Utc::now()],
        )?;
        Ok(changed > 0)
    })
    .await
}
