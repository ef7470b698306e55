use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthenticatedUser};
use crate::db::{
    self,
    models::{Role, Shelter},
};
use crate::display::{AnimalView, ProjectView};
use crate::error::AppError;
use crate::forms::ShelterForm;
use crate::routes::UploadRequest;
use crate::storage::{self, UploadTicket};
use crate::AppState;

#[derive(Serialize)]
pub struct ShelterPage {
    #[serde(flatten)]
    pub shelter: Shelter,
    /// True when the viewer administers this shelter.
    pub is_admin: bool,
    pub animals: Vec<AnimalView>,
    pub projects: Vec<ProjectView>,
}

#[derive(Deserialize)]
pub struct VerificationRequest {
    pub is_verified: bool,
}

#[derive(Deserialize)]
pub struct LogoRequest {
    pub key: String,
}

pub async fn list_public_shelters(State(state): State<AppState>) -> Result<Json<Vec<Shelter>>, AppError> {
    Ok(Json(db::list_verified_shelters(&state.db, None).await?))
}

pub async fn get_public_shelter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    viewer: Option<AuthenticatedUser>,
) -> Result<Json<ShelterPage>, AppError> {
    let shelter = db::get_shelter(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound("Shelter"))?;
    let is_admin = viewer.is_some_and(|user| shelter.is_administered_by(&user.id));

    let animals = db::list_animals_by_shelter(&state.db, &id).await?;
    let projects = db::list_projects_by_shelter(&state.db, &id, None).await?;

    Ok(Json(ShelterPage {
        shelter,
        is_admin,
        animals: animals.into_iter().map(AnimalView::from).collect(),
        projects: projects.into_iter().map(ProjectView::from).collect(),
    }))
}

pub async fn register_shelter(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(form): Json<ShelterForm>,
) -> Result<(StatusCode, Json<Shelter>), AppError> {
    let profile = auth::load_profile(&state, &user).await?;
    auth::require_role(&profile, &[Role::Admin, Role::ShelterAdmin])?;

    let input = form.validate()?;
    let shelter = db::create_shelter(&state.db, &user.id, input).await?;
    tracing::info!("Shelter {} registered by {}", shelter.id, user.id);
    Ok((StatusCode::CREATED, Json(shelter)))
}

/// Shelters administered by the calling admin.
pub async fn list_my_shelters(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Shelter>>, AppError> {
    let profile = auth::load_profile(&state, &user).await?;
    auth::require_role(&profile, &[Role::Admin])?;
    Ok(Json(db::list_shelters_by_admin(&state.db, &user.id).await?))
}

pub async fn set_verification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<VerificationRequest>,
) -> Result<Json<Shelter>, AppError> {
    let profile = auth::load_profile(&state, &user).await?;
    auth::require_role(&profile, &[Role::Admin])?;

    if !db::set_shelter_verified(&state.db, &id, req.is_verified).await? {
        return Err(AppError::NotFound("Shelter"));
    }
    tracing::info!("Shelter {} verification set to {} by {}", id, req.is_verified, user.id);

    let shelter = db::get_shelter(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound("Shelter"))?;
    Ok(Json(shelter))
}

pub async fn logo_upload_url(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadTicket>, AppError> {
    auth::require_shelter_owner(&state, &id, &user).await?;
    let ext = req.extension()?;
    let ticket = state.storage.presign_upload(storage::shelter_logo_key(&id, ext)).await?;
    Ok(Json(ticket))
}

pub async fn set_logo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<LogoRequest>,
) -> Result<Json<Shelter>, AppError> {
    auth::require_shelter_owner(&state, &id, &user).await?;
    if !storage::key_belongs_to(&req.key, &format!("shelters/{}", id)) {
        return Err(AppError::Validation("Invalid storage key".to_string()));
    }

    let url = state.storage.public_url(&req.key);
    db::set_shelter_logo(&state.db, &id, &url).await?;
    let shelter = db::get_shelter(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound("Shelter"))?;
    Ok(Json(shelter))
}
