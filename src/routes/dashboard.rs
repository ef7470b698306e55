use axum::extract::{Json, State};
use serde::Serialize;

use crate::auth::{self, AuthenticatedUser};
use crate::db::{
    self,
    models::{AdoptionApplication, Donation, Profile, Role, Shelter},
};
use crate::display::{AnimalView, ProjectView};
use crate::error::AppError;
use crate::AppState;

#[derive(Serialize)]
pub struct ManagedShelter {
    #[serde(flatten)]
    pub shelter: Shelter,
    pub animals: Vec<AnimalView>,
    pub projects: Vec<ProjectView>,
}

#[derive(Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardView {
    ShelterAdmin { shelter: Option<ManagedShelter> },
    Admin { shelters: Vec<Shelter> },
    User {
        donations: Vec<Donation>,
        applications: Vec<AdoptionApplication>,
    },
}

#[derive(Serialize)]
pub struct Dashboard {
    pub profile: Profile,
    #[serde(flatten)]
    pub view: DashboardView,
}

/// Role-branched summary for the signed-in user.
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Dashboard>, AppError> {
    let profile = auth::load_profile(&state, &user).await?;

    let view = match profile.role {
        Role::ShelterAdmin => {
            // A shelter admin runs at most one shelter; take the first by name.
            let shelter = db::list_shelters_by_admin(&state.db, &profile.id)
                .await?
                .into_iter()
                .next();
            let shelter = match shelter {
                Some(shelter) => {
                    let animals = db::list_animals_by_shelter(&state.db, &shelter.id).await?;
                    let projects = db::list_projects_by_shelter(&state.db, &shelter.id, None).await?;
                    Some(ManagedShelter {
                        shelter,
                        animals: animals.into_iter().map(AnimalView::from).collect(),
                        projects: projects.into_iter().map(ProjectView::from).collect(),
                    })
                }
                None => None,
            };
            DashboardView::ShelterAdmin { shelter }
        }
        Role::Admin => DashboardView::Admin {
            shelters: db::list_shelters_by_admin(&state.db, &profile.id).await?,
        },
        Role::User => DashboardView::User {
            donations: db::list_donations_by_donor(&state.db, &profile.id).await?,
            applications: db::list_applications_by_user(&state.db, &profile.id).await?,
        },
    };

    Ok(Json(Dashboard { profile, view }))
}
