use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::auth::{self, AuthenticatedUser};
use crate::db::{self, models::ProjectStatus};
use crate::display::ProjectView;
use crate::error::AppError;
use crate::forms::ProjectForm;
use crate::routes::UploadRequest;
use crate::storage::{self, UploadTicket};
use crate::AppState;

#[derive(Deserialize)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
}

#[derive(Deserialize)]
pub struct ProjectStatusRequest {
    pub status: ProjectStatus,
}

pub async fn list_shelter_projects(
    State(state): State<AppState>,
    Path(shelter_id): Path<String>,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<Vec<ProjectView>>, AppError> {
    if db::get_shelter(&state.db, &shelter_id).await?.is_none() {
        return Err(AppError::NotFound("Shelter"));
    }
    let projects = db::list_projects_by_shelter(&state.db, &shelter_id, filter.status).await?;
    Ok(Json(projects.into_iter().map(ProjectView::from).collect()))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectView>, AppError> {
    let project = db::get_project(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound("Project"))?;
    Ok(Json(project.into()))
}

pub async fn save_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(shelter_id): Path<String>,
    Json(form): Json<ProjectForm>,
) -> Result<(StatusCode, Json<ProjectView>), AppError> {
    auth::require_shelter_owner(&state, &shelter_id, &user).await?;
    let input = form.validate()?;
    let status = if input.id.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    let project = db::save_project(&state.db, &shelter_id, input)
        .await?
        .ok_or(AppError::NotFound("Project"))?;
    Ok((status, Json(project.into())))
}

pub async fn image_upload_url(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(shelter_id): Path<String>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadTicket>, AppError> {
    auth::require_shelter_owner(&state, &shelter_id, &user).await?;
    let ext = req.extension()?;
    let ticket = state
        .storage
        .presign_upload(storage::project_image_key(&shelter_id, ext))
        .await?;
    Ok(Json(ticket))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<ProjectStatusRequest>,
) -> Result<Json<ProjectView>, AppError> {
    let project = db::get_project(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound("Project"))?;
    auth::require_shelter_owner(&state, &project.shelter_id, &user).await?;

    let updated = db::update_project_status(&state.db, &id, req.status, &user.id)
        .await?
        .ok_or(AppError::NotFound("Project"))?;
    tracing::info!("Project {} moved to {} by {}", id, req.status, user.id);
    Ok(Json(updated.into()))
}
