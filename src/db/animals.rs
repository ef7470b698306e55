use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

use super::models::{
    Animal, AnimalInput, AnimalPhoto, AnimalStatus, AnimalWithPhotos, EntityType, FeaturedAnimal,
    NewStatusChange,
};
use super::shelters::fetch_shelter;
use super::status_changes::insert_status_change;
use super::{run, write_transaction, DbPool};

const ANIMAL_COLUMNS: &str = "id, shelter_id, name, type, breed, age_years, age_months, gender, \
     size, weight_kg, description, medical_history, behavior_notes, special_needs, status, \
     treatment_details, primary_image_url, is_featured, created_at, updated_at";

const PHOTO_COLUMNS: &str = "id, animal_id, url, is_primary, uploaded_by, metadata, created_at";

fn fetch_animal(conn: &Connection, id: &str) -> rusqlite::Result<Option<Animal>> {
    conn.query_row(
        &format!("SELECT {ANIMAL_COLUMNS} FROM animals WHERE id = ?1"),
        params![id],
        Animal::from_row,
    )
    .optional()
}

fn animal_status_change(
    animal_id: &str,
    old_status: Option<AnimalStatus>,
    new_status: AnimalStatus,
    changed_by: &str,
    notes: Option<String>,
) -> NewStatusChange {
    NewStatusChange {
        entity_type: EntityType::Animal,
        entity_id: animal_id.to_string(),
        old_status: old_status.map(|s| s.as_str().to_string()),
        new_status: new_status.as_str().to_string(),
        changed_by: Some(changed_by.to_string()),
        notes,
    }
}

/// Inserts the animal when `input.id` is absent, updates it otherwise.
///
/// Updates are scoped to `shelter_id`; `Ok(None)` means no such animal in
/// that shelter. Status transitions are appended to the status history.
pub async fn save_animal(
    pool: &DbPool,
    shelter_id: &str,
    input: AnimalInput,
    changed_by: &str,
) -> anyhow::Result<Option<Animal>> {
    let shelter_id = shelter_id.to_string();
    let changed_by = changed_by.to_string();
    run(pool, move |conn| {
        let now = Utc::now();
        match input.id.clone() {
            None => {
                let id = Uuid::new_v4().to_string();
                conn.execute(
                    &format!(
                        "INSERT INTO animals ({ANIMAL_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                                 ?15, ?16, ?17, ?18, ?19, ?19)"
                    ),
                    params![
                        id,
                        shelter_id,
                        input.name,
                        input.kind,
                        input.breed,
                        input.age_years,
                        input.age_months,
                        input.gender,
                        input.size,
                        input.weight_kg,
                        input.description,
                        input.medical_history,
                        input.behavior_notes,
                        input.special_needs,
                        input.status,
                        input.treatment_details,
                        input.primary_image_url,
                        input.is_featured,
                        now
                    ],
                )?;
                insert_status_change(
                    conn,
                    &animal_status_change(&id, None, input.status, &changed_by, None),
                )?;
                fetch_animal(conn, &id)
            }
            Some(id) => {
                let Some(existing) = fetch_animal(conn, &id)? else {
                    return Ok(None);
                };
                if existing.shelter_id != shelter_id {
                    return Ok(None);
                }
                conn.execute(
                    "UPDATE animals SET name = ?2, type = ?3, breed = ?4, age_years = ?5,
                         age_months = ?6, gender = ?7, size = ?8, weight_kg = ?9,
                         description = ?10, medical_history = ?11, behavior_notes = ?12,
                         special_needs = ?13, status = ?14, treatment_details = ?15,
                         primary_image_url = ?16, is_featured = ?17, updated_at = ?18
                     WHERE id = ?1",
                    params![
                        id,
                        input.name,
                        input.kind,
                        input.breed,
                        input.age_years,
                        input.age_months,
                        input.gender,
                        input.size,
                        input.weight_kg,
                        input.description,
                        input.medical_history,
                        input.behavior_notes,
                        input.special_needs,
                        input.status,
                        input.treatment_details,
                        input.primary_image_url,
                        input.is_featured,
                        now
                    ],
                )?;
                if existing.status != input.status {
                    insert_status_change(
                        conn,
                        &animal_status_change(
                            &id,
                            Some(existing.status),
                            input.status,
                            &changed_by,
                            None,
                        ),
                    )?;
                }
                fetch_animal(conn, &id)
            }
        }
    })
    .await
}

pub async fn get_animal(pool: &DbPool, id: &str) -> anyhow::Result<Option<Animal>> {
    let id = id.to_string();
    run(pool, move |conn| fetch_animal(conn, &id)).await
}

/// Animal row plus its photos, primary photo first. The two reads are
/// independent; nothing ties them to one snapshot.
pub async fn get_animal_with_photos(
    pool: &DbPool,
    id: &str,
) -> anyhow::Result<Option<AnimalWithPhotos>> {
    let Some(animal) = get_animal(pool, id).await? else {
        return Ok(None);
    };

    let animal_id = id.to_string();
    let photos = run(pool, move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM animal_photos
             WHERE animal_id = ?1
             ORDER BY is_primary DESC, created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![animal_id], AnimalPhoto::from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
    })
    .await?;

    Ok(Some(AnimalWithPhotos { animal, photos }))
}

/// Newest first.
pub async fn list_animals_by_shelter(pool: &DbPool, shelter_id: &str) -> anyhow::Result<Vec<Animal>> {
    let shelter_id = shelter_id.to_string();
    run(pool, move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ANIMAL_COLUMNS} FROM animals
             WHERE shelter_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![shelter_id], Animal::from_row)?;
        rows.collect()
    })
    .await
}

pub async fn list_featured_animals(pool: &DbPool, limit: u32) -> anyhow::Result<Vec<FeaturedAnimal>> {
    run(pool, move |conn| {
        let animals = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ANIMAL_COLUMNS} FROM animals
                 WHERE is_featured = 1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], Animal::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        animals
            .into_iter()
            .map(|animal| {
                let shelter = fetch_shelter(conn, &animal.shelter_id)?;
                Ok(FeaturedAnimal { animal, shelter })
            })
            .collect()
    })
    .await
}

/// Sets the status and appends a status change. Treatment details only
/// survive while the animal is under treatment.
pub async fn update_animal_status(
    pool: &DbPool,
    id: &str,
    status: AnimalStatus,
    changed_by: &str,
    notes: Option<String>,
) -> anyhow::Result<Option<Animal>> {
    let id = id.to_string();
    let changed_by = changed_by.to_string();
    run(pool, move |conn| {
        let tx = write_transaction(conn)?;
        let Some(existing) = fetch_animal(&tx, &id)? else {
            return Ok(None);
        };
        tx.execute(
            "UPDATE animals
             SET status = ?2,
                 treatment_details = CASE WHEN ?2 = 'under_treatment' THEN treatment_details ELSE NULL END,
                 updated_at = ?3
             WHERE id = ?1",
            params![id, status, Utc::now()],
        )?;
        insert_status_change(
            &tx,
            &animal_status_change(&id, Some(existing.status), status, &changed_by, notes),
        )?;
        let updated = fetch_animal(&tx, &id)?;
        tx.commit()?;
        Ok(updated)
    })
    .await
}

/// Records an uploaded photo. A new primary photo demotes the previous one
/// and becomes the animal's `primary_image_url`.
pub async fn add_animal_photo(
    pool: &DbPool,
    animal_id: &str,
    url: &str,
    is_primary: bool,
    uploaded_by: &str,
    metadata: Option<Value>,
) -> anyhow::Result<AnimalPhoto> {
    let animal_id = animal_id.to_string();
    let url = url.to_string();
    let uploaded_by = uploaded_by.to_string();
    run(pool, move |conn| {
        let tx = write_transaction(conn)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        if is_primary {
            tx.execute(
                "UPDATE animal_photos SET is_primary = 0 WHERE animal_id = ?1",
                params![animal_id],
            )?;
            tx.execute(
                "UPDATE animals SET primary_image_url = ?2, updated_at = ?3 WHERE id = ?1",
                params![animal_id, url, now],
            )?;
        }
        tx.execute(
            &format!(
                "INSERT INTO animal_photos ({PHOTO_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ),
            params![id, animal_id, url, is_primary, uploaded_by, metadata, now],
        )?;
        let photo = tx.query_row(
            &format!("SELECT {PHOTO_COLUMNS} FROM animal_photos WHERE id = ?1"),
            params![id],
            AnimalPhoto::from_row,
        )?;
        tx.commit()?;
        Ok(photo)
    })
    .await
}
