use axum::extract::{Json, Path, State};
use serde::Deserialize;

use crate::auth::{self, AuthenticatedUser};
use crate::db::{
    self,
    models::{Profile, Role},
};
use crate::error::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn set_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(profile_id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<Profile>, AppError> {
    let caller = auth::load_profile(&state, &user).await?;
    auth::require_role(&caller, &[Role::Admin])?;
    if profile_id == caller.id && req.role != Role::Admin {
        return Err(AppError::Conflict("Admins cannot demote themselves".to_string()));
    }

    if !db::set_profile_role(&state.db, &profile_id, req.role).await? {
        return Err(AppError::NotFound("Profile"));
    }
    tracing::info!("Profile {} role set to {} by {}", profile_id, req.role, caller.id);

    let profile = db::get_profile(&state.db, &profile_id)
        .await?
        .ok_or(AppError::NotFound("Profile"))?;
    Ok(Json(profile))
}
