use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthenticatedUser};
use crate::db::{
    self,
    models::{Donation, NewDonation, ProjectStatus},
};
use crate::error::AppError;
use crate::forms::DonationForm;
use crate::payments::CheckoutSession;
use crate::AppState;

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub donation: Donation,
    pub checkout: CheckoutSession,
}

#[derive(Deserialize)]
pub struct SuccessQuery {
    pub session_id: String,
}

/// Checks the shelter and project a donation points at. A project donation
/// inherits the project's shelter.
async fn resolve_targets(state: &AppState, donation: &mut NewDonation) -> Result<(), AppError> {
    if let Some(project_id) = donation.project_id.as_deref() {
        let project = db::get_project(&state.db, project_id)
            .await?
            .ok_or(AppError::NotFound("Project"))?;
        if project.status != ProjectStatus::Active {
            return Err(AppError::Validation(
                "Project is not accepting donations".to_string(),
            ));
        }
        if donation
            .shelter_id
            .as_deref()
            .is_some_and(|id| id != project.shelter_id)
        {
            return Err(AppError::Validation(
                "Project does not belong to this shelter".to_string(),
            ));
        }
        donation.shelter_id = Some(project.shelter_id);
    }

    if let Some(shelter_id) = donation.shelter_id.as_deref() {
        if db::get_shelter(&state.db, shelter_id).await?.is_none() {
            return Err(AppError::NotFound("Shelter"));
        }
    }
    Ok(())
}

async fn start_checkout(
    state: &AppState,
    mut donation: NewDonation,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    resolve_targets(state, &mut donation).await?;
    let donation = db::create_donation(&state.db, donation).await?;
    let checkout = state.payments.begin_checkout(&donation);
    tracing::info!("Donation {} pending checkout", donation.id);
    Ok((StatusCode::CREATED, Json(CheckoutResponse { donation, checkout })))
}

pub async fn checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(form): Json<DonationForm>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let profile = auth::load_profile(&state, &user).await?;
    let donation = form.validate_for_donor(&profile.id, &profile.email)?;
    start_checkout(&state, donation).await
}

pub async fn anonymous_checkout(
    State(state): State<AppState>,
    Json(form): Json<DonationForm>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let donation = form.validate_anonymous()?;
    start_checkout(&state, donation).await
}

pub async fn list_my_donations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Donation>>, AppError> {
    Ok(Json(db::list_donations_by_donor(&state.db, &user.id).await?))
}

/// Landing point after the gateway redirect; settles the donation.
pub async fn checkout_success(
    State(state): State<AppState>,
    Query(query): Query<SuccessQuery>,
) -> Result<Json<Donation>, AppError> {
    let reference = state.payments.payment_reference(&query.session_id);
    let donation = db::complete_donation(&state.db, &query.session_id, Some(reference))
        .await?
        .ok_or(AppError::NotFound("Donation"))?;
    tracing::info!("Donation {} is {}", donation.id, donation.status);
    Ok(Json(donation))
}
