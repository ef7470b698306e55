use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{Profile, Role};
use super::{run, DbPool};

const PROFILE_COLUMNS: &str = "id, email, full_name, avatar_url, role, created_at, updated_at";

fn fetch_profile(conn: &Connection, id: &str) -> rusqlite::Result<Option<Profile>> {
    conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
        params![id],
        Profile::from_row,
    )
    .optional()
}

pub async fn get_profile(pool: &DbPool, id: &str) -> anyhow::Result<Option<Profile>> {
    let id = id.to_string();
    run(pool, move |conn| fetch_profile(conn, &id)).await
}

/// Returns the profile for `id`, creating it with the `user` role on first sight.
pub async fn ensure_profile(
    pool: &DbPool,
    id: &str,
    email: &str,
    full_name: Option<String>,
) -> anyhow::Result<Profile> {
    let id = id.to_string();
    let email = email.to_string();
    let profile = run(pool, move |conn| {
        let now = Utc::now();
        let inserted = conn.execute(
            "INSERT INTO profiles (id, email, full_name, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id) DO NOTHING",
            params![id, email, full_name, Role::User, now],
        )?;
        if inserted > 0 {
            tracing::info!("Created profile {}", id);
        }
        fetch_profile(conn, &id)
    })
    .await?;

    profile.ok_or_else(|| anyhow::anyhow!("profile vanished after upsert"))
}

/// Fields left as `None` keep their stored value.
pub async fn update_profile(
    pool: &DbPool,
    id: &str,
    full_name: Option<String>,
    avatar_url: Option<String>,
) -> anyhow::Result<Option<Profile>> {
    let id = id.to_string();
    run(pool, move |conn| {
        let changed = conn.execute(
            "UPDATE profiles
             SET full_name = COALESCE(?2, full_name), avatar_url = COALESCE(?3, avatar_url),
                 updated_at = ?4
             WHERE id = ?1",
            params![id, full_name, avatar_url, Utc::now()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        fetch_profile(conn, &id)
    })
    .await
}

pub async fn set_profile_role(pool: &DbPool, id: &str, role: Role) -> anyhow::Result<bool> {
    let id = id.to_string();
    run(pool, move |conn| {
        let changed = conn.execute(
            "UPDATE profiles SET role = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, role, Utc::now()],
        )?;
        Ok(changed > 0)
    })
    .await
}
