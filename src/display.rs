use serde::Serialize;

use crate::db::models::{Animal, AnimalPhoto, Shelter, ShelterProject};

pub fn age_label(years: Option<i64>, months: Option<i64>) -> String {
    if years.is_none() && months.is_none() {
        return "Unknown Age".to_string();
    }
    let years = years.unwrap_or(0);
    let months = months.unwrap_or(0);
    if years == 0 && months == 0 {
        return "Newborn".to_string();
    }

    let mut parts = Vec::with_capacity(2);
    if years > 0 {
        parts.push(format!("{}y", years));
    }
    if months > 0 {
        parts.push(format!("{}m", months));
    }
    parts.join(" ")
}

/// Human label for an animal status. Values outside the known set are
/// returned as-is.
pub fn status_label(status: &str) -> String {
    match status {
        "for_rescuing" => "For Rescuing",
        "found_forever_home" => "Found Forever Home",
        "found_foster" => "Found Foster Home",
        "under_treatment" => "Under Treatment",
        other => other,
    }
    .to_string()
}

/// Funding progress, capped at 100. A zero target counts as fully funded
/// once anything has been raised.
pub fn progress_percent(current: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    (current / target * 100.0).clamp(0.0, 100.0)
}

#[derive(Serialize, Debug, Clone)]
pub struct AnimalView {
    #[serde(flatten)]
    pub animal: Animal,
    pub age_label: String,
    pub status_label: String,
}

impl From<Animal> for AnimalView {
    fn from(animal: Animal) -> Self {
        Self {
            age_label: age_label(animal.age_years, animal.age_months),
            status_label: status_label(animal.status.as_str()),
            animal,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct AnimalProfileView {
    #[serde(flatten)]
    pub animal: AnimalView,
    pub photos: Vec<AnimalPhoto>,
}

#[derive(Serialize, Debug, Clone)]
pub struct FeaturedAnimalView {
    #[serde(flatten)]
    pub animal: AnimalView,
    pub shelter: Option<Shelter>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: ShelterProject,
    pub progress_percent: f64,
}

impl From<ShelterProject> for ProjectView {
    fn from(project: ShelterProject) -> Self {
        Self {
            progress_percent: progress_percent(project.current_amount, project.target_amount),
            project,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_labels() {
        assert_eq!(age_label(None, None), "Unknown Age");
        assert_eq!(age_label(Some(0), Some(0)), "Newborn");
        assert_eq!(age_label(Some(2), Some(0)), "2y");
        assert_eq!(age_label(Some(1), Some(3)), "1y 3m");
        assert_eq!(age_label(Some(0), Some(5)), "5m");
        assert_eq!(age_label(None, Some(4)), "4m");
    }

    #[test]
    fn status_labels_pass_unknown_values_through() {
        assert_eq!(status_label("for_rescuing"), "For Rescuing");
        assert_eq!(status_label("found_forever_home"), "Found Forever Home");
        assert_eq!(status_label("found_foster"), "Found Foster Home");
        assert_eq!(status_label("under_treatment"), "Under Treatment");
        assert_eq!(status_label("available"), "available");
    }

    #[test]
    fn progress_is_capped() {
        assert_eq!(progress_percent(250.0, 1000.0), 25.0);
        assert_eq!(progress_percent(1500.0, 1000.0), 100.0);
        assert_eq!(progress_percent(0.0, 0.0), 0.0);
        assert_eq!(progress_percent(10.0, 0.0), 100.0);
    }
}
