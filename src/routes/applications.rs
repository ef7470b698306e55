use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::AuthenticatedUser;
use crate::db::{
    self,
    models::{AdoptionApplication, ApplicationStatus},
};
use crate::error::AppError;
use crate::forms::ReviewForm;
use crate::routes::animals::owned_animal;
use crate::AppState;

#[derive(Deserialize)]
pub struct ApplicationRequest {
    #[serde(default)]
    pub application_data: Value,
}

#[derive(Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
}

pub async fn create_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(animal_id): Path<String>,
    Json(req): Json<ApplicationRequest>,
) -> Result<(StatusCode, Json<AdoptionApplication>), AppError> {
    if db::get_animal(&state.db, &animal_id).await?.is_none() {
        return Err(AppError::NotFound("Animal"));
    }

    let existing = db::list_applications_by_user(&state.db, &user.id).await?;
    if existing
        .iter()
        .any(|a| a.animal_id == animal_id && a.status == ApplicationStatus::Pending)
    {
        return Err(AppError::Conflict(
            "You already have a pending application for this animal".to_string(),
        ));
    }

    let data = match req.application_data {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    let application = db::create_adoption_application(&state.db, &animal_id, &user.id, data).await?;
    tracing::info!("Application {} submitted for animal {}", application.id, animal_id);
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn list_my_applications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<AdoptionApplication>>, AppError> {
    Ok(Json(db::list_applications_by_user(&state.db, &user.id).await?))
}

pub async fn list_animal_applications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(animal_id): Path<String>,
    Query(filter): Query<ApplicationFilter>,
) -> Result<Json<Vec<AdoptionApplication>>, AppError> {
    owned_animal(&state, &animal_id, &user).await?;
    Ok(Json(
        db::list_adoption_applications(&state.db, &animal_id, filter.status).await?,
    ))
}

pub async fn review_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(form): Json<ReviewForm>,
) -> Result<Json<AdoptionApplication>, AppError> {
    let decision = form.decision()?;
    let application = db::get_adoption_application(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound("Application"))?;
    owned_animal(&state, &application.animal_id, &user).await?;

    let reviewed = db::review_adoption_application(
        &state.db,
        &id,
        decision,
        form.review_notes.trim(),
        &user.id,
    )
    .await?
    .ok_or_else(|| AppError::Conflict("Application is no longer pending".to_string()))?;

    tracing::info!("Application {} {} by {}", id, decision, user.id);
    Ok(Json(reviewed))
}

pub async fn withdraw_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<AdoptionApplication>, AppError> {
    let application = db::get_adoption_application(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound("Application"))?;
    if application.user_id != user.id {
        return Err(AppError::Forbidden);
    }

    let withdrawn = db::withdraw_adoption_application(&state.db, &id, &user.id)
        .await?
        .ok_or_else(|| AppError::Conflict("Application is no longer pending".to_string()))?;
    Ok(Json(withdrawn))
}
