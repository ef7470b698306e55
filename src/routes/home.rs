use axum::extract::{Json, State};
use serde::Serialize;

use crate::db::{self, models::Shelter};
use crate::display::{AnimalView, FeaturedAnimalView};
use crate::error::AppError;
use crate::AppState;

const HOME_SECTION_LIMIT: u32 = 3;

#[derive(Serialize)]
pub struct HomePage {
    pub featured_animals: Vec<FeaturedAnimalView>,
    pub shelters: Vec<Shelter>,
}

pub async fn home(State(state): State<AppState>) -> Result<Json<HomePage>, AppError> {
    let featured = db::list_featured_animals(&state.db, HOME_SECTION_LIMIT).await?;
    let shelters = db::list_verified_shelters(&state.db, Some(HOME_SECTION_LIMIT)).await?;

    Ok(Json(HomePage {
        featured_animals: featured
            .into_iter()
            .map(|f| FeaturedAnimalView {
                animal: AnimalView::from(f.animal),
                shelter: f.shelter,
            })
            .collect(),
        shelters,
    }))
}
