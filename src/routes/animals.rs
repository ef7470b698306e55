use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::{self, AuthenticatedUser};
use crate::db::{
    self,
    models::{Animal, AnimalPhoto, AnimalStatus, EntityType, StatusChange},
};
use crate::display::{AnimalProfileView, AnimalView};
use crate::error::AppError;
use crate::forms::AnimalForm;
use crate::routes::UploadRequest;
use crate::storage::{self, UploadTicket};
use crate::AppState;

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AnimalStatus,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct PhotoRequest {
    pub key: String,
    #[serde(default)]
    pub is_primary: bool,
    pub metadata: Option<Value>,
}

/// Loads the animal and checks the caller administers its shelter.
pub(crate) async fn owned_animal(
    state: &AppState,
    animal_id: &str,
    user: &AuthenticatedUser,
) -> Result<Animal, AppError> {
    let animal = db::get_animal(&state.db, animal_id)
        .await?
        .ok_or(AppError::NotFound("Animal"))?;
    auth::require_shelter_owner(state, &animal.shelter_id, user).await?;
    Ok(animal)
}

pub async fn list_shelter_animals(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(shelter_id): Path<String>,
) -> Result<Json<Vec<AnimalView>>, AppError> {
    auth::require_shelter_owner(&state, &shelter_id, &user).await?;
    let animals = db::list_animals_by_shelter(&state.db, &shelter_id).await?;
    Ok(Json(animals.into_iter().map(AnimalView::from).collect()))
}

/// Creates an animal, or updates one when the form carries an id.
pub async fn save_animal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(shelter_id): Path<String>,
    Json(form): Json<AnimalForm>,
) -> Result<(StatusCode, Json<AnimalView>), AppError> {
    auth::require_shelter_owner(&state, &shelter_id, &user).await?;
    let input = form.validate()?;
    let status = if input.id.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    let animal = db::save_animal(&state.db, &shelter_id, input, &user.id)
        .await?
        .ok_or(AppError::NotFound("Animal"))?;
    Ok((status, Json(animal.into())))
}

pub async fn update_animal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(mut form): Json<AnimalForm>,
) -> Result<Json<AnimalView>, AppError> {
    let existing = owned_animal(&state, &id, &user).await?;
    form.id = Some(id);
    let input = form.validate()?;

    let animal = db::save_animal(&state.db, &existing.shelter_id, input, &user.id)
        .await?
        .ok_or(AppError::NotFound("Animal"))?;
    Ok(Json(animal.into()))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<AnimalView>, AppError> {
    owned_animal(&state, &id, &user).await?;
    let notes = req.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

    let animal = db::update_animal_status(&state.db, &id, req.status, &user.id, notes)
        .await?
        .ok_or(AppError::NotFound("Animal"))?;
    tracing::info!("Animal {} moved to {} by {}", id, req.status, user.id);
    Ok(Json(animal.into()))
}

pub async fn get_public_animal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnimalProfileView>, AppError> {
    let found = db::get_animal_with_photos(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound("Animal"))?;
    Ok(Json(AnimalProfileView {
        animal: found.animal.into(),
        photos: found.photos,
    }))
}

pub async fn status_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusChange>>, AppError> {
    owned_animal(&state, &id, &user).await?;
    Ok(Json(db::get_status_history(&state.db, EntityType::Animal, &id).await?))
}

pub async fn photo_upload_url(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadTicket>, AppError> {
    owned_animal(&state, &id, &user).await?;
    let ext = req.extension()?;
    let ticket = state.storage.presign_upload(storage::animal_photo_key(&id, ext)).await?;
    Ok(Json(ticket))
}

/// Records a photo the client has already uploaded under the animal's prefix.
pub async fn add_photo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<PhotoRequest>,
) -> Result<(StatusCode, Json<AnimalPhoto>), AppError> {
    owned_animal(&state, &id, &user).await?;
    if !storage::key_belongs_to(&req.key, &format!("animals/{}", id)) {
        return Err(AppError::Validation("Invalid storage key".to_string()));
    }

    let url = state.storage.public_url(&req.key);
    let photo = db::add_animal_photo(&state.db, &id, &url, req.is_primary, &user.id, req.metadata).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}
