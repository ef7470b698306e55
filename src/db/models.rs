use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// Enums stored as TEXT columns and exchanged as snake_case JSON strings.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownVariant| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

text_enum!(Role {
    User => "user",
    Admin => "admin",
    ShelterAdmin => "shelter_admin",
});

text_enum!(AnimalType {
    Dog => "dog",
    Cat => "cat",
    Other => "other",
});

text_enum!(Gender {
    Male => "male",
    Female => "female",
});

text_enum!(AnimalSize {
    Small => "small",
    Medium => "medium",
    Large => "large",
});

text_enum!(AnimalStatus {
    ForRescuing => "for_rescuing",
    FoundForeverHome => "found_forever_home",
    FoundFoster => "found_foster",
    UnderTreatment => "under_treatment",
});

text_enum!(ApplicationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Withdrawn => "withdrawn",
});

text_enum!(EntityType {
    Animal => "animal",
    Application => "application",
    Project => "project",
    Donation => "donation",
});

text_enum!(ProjectCategory {
    Infrastructure => "infrastructure",
    Medical => "medical",
    FoodSupplies => "food_supplies",
    Equipment => "equipment",
    Other => "other",
});

text_enum!(ProjectStatus {
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

text_enum!(DonationType {
    General => "general",
    Medical => "medical",
    Shelter => "shelter",
});

text_enum!(DonationStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
});

impl Default for AnimalType {
    fn default() -> Self {
        AnimalType::Dog
    }
}

impl Default for AnimalStatus {
    fn default() -> Self {
        AnimalStatus::ForRescuing
    }
}

impl Default for ProjectCategory {
    fn default() -> Self {
        ProjectCategory::Other
    }
}

impl Default for DonationType {
    fn default() -> Self {
        DonationType::General
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email")?,
            full_name: row.get("full_name")?,
            avatar_url: row.get("avatar_url")?,
            role: row.get("role")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Shelter {
    pub id: String,
    pub name: String,
    pub address: String,
    pub contact_number: String,
    pub email: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub admin_id: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shelter {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            address: row.get("address")?,
            contact_number: row.get("contact_number")?,
            email: row.get("email")?,
            description: row.get("description")?,
            logo_url: row.get("logo_url")?,
            admin_id: row.get("admin_id")?,
            is_verified: row.get("is_verified")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn is_administered_by(&self, user_id: &str) -> bool {
        self.admin_id.as_deref() == Some(user_id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Animal {
    pub id: String,
    pub shelter_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AnimalType,
    pub breed: Option<String>,
    pub age_years: Option<i64>,
    pub age_months: Option<i64>,
    pub gender: Option<Gender>,
    pub size: Option<AnimalSize>,
    pub weight_kg: Option<f64>,
    pub description: Option<String>,
    pub medical_history: Option<String>,
    pub behavior_notes: Option<String>,
    pub special_needs: Option<String>,
    pub status: AnimalStatus,
    pub treatment_details: Option<String>,
    pub primary_image_url: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Animal {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            shelter_id: row.get("shelter_id")?,
            name: row.get("name")?,
            kind: row.get("type")?,
            breed: row.get("breed")?,
            age_years: row.get("age_years")?,
            age_months: row.get("age_months")?,
            gender: row.get("gender")?,
            size: row.get("size")?,
            weight_kg: row.get("weight_kg")?,
            description: row.get("description")?,
            medical_history: row.get("medical_history")?,
            behavior_notes: row.get("behavior_notes")?,
            special_needs: row.get("special_needs")?,
            status: row.get("status")?,
            treatment_details: row.get("treatment_details")?,
            primary_image_url: row.get("primary_image_url")?,
            is_featured: row.get("is_featured")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnimalPhoto {
    pub id: String,
    pub animal_id: String,
    pub url: String,
    pub is_primary: bool,
    pub uploaded_by: String,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl AnimalPhoto {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            animal_id: row.get("animal_id")?,
            url: row.get("url")?,
            is_primary: row.get("is_primary")?,
            uploaded_by: row.get("uploaded_by")?,
            metadata: row.get("metadata")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct AnimalWithPhotos {
    #[serde(flatten)]
    pub animal: Animal,
    pub photos: Vec<AnimalPhoto>,
}

#[derive(Serialize, Debug, Clone)]
pub struct FeaturedAnimal {
    #[serde(flatten)]
    pub animal: Animal,
    pub shelter: Option<Shelter>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdoptionApplication {
    pub id: String,
    pub animal_id: String,
    pub user_id: String,
    pub status: ApplicationStatus,
    pub application_data: Value,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdoptionApplication {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            animal_id: row.get("animal_id")?,
            user_id: row.get("user_id")?,
            status: row.get("status")?,
            application_data: row.get("application_data")?,
            review_notes: row.get("review_notes")?,
            reviewed_by: row.get("reviewed_by")?,
            reviewed_at: row.get("reviewed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StatusChange {
    pub id: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub old_status: Option<String>,
    pub new_status: String,
    pub changed_by: Option<String>,
    pub changed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl StatusChange {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            entity_type: row.get("entity_type")?,
            entity_id: row.get("entity_id")?,
            old_status: row.get("old_status")?,
            new_status: row.get("new_status")?,
            changed_by: row.get("changed_by")?,
            changed_at: row.get("changed_at")?,
            notes: row.get("notes")?,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ShelterProject {
    pub id: String,
    pub shelter_id: String,
    pub title: String,
    pub description: String,
    pub category: ProjectCategory,
    pub target_amount: f64,
    pub current_amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub image_url: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShelterProject {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            shelter_id: row.get("shelter_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            category: row.get("category")?,
            target_amount: row.get("target_amount")?,
            current_amount: row.get("current_amount")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            image_url: row.get("image_url")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donation {
    pub id: String,
    pub shelter_id: Option<String>,
    pub project_id: Option<String>,
    pub donor_id: Option<String>,
    pub email: Option<String>,
    pub amount: i64,
    pub is_anonymous: bool,
    pub donation_type: DonationType,
    pub status: DonationStatus,
    pub payment_intent_id: Option<String>,
    pub impact_report_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donation {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            shelter_id: row.get("shelter_id")?,
            project_id: row.get("project_id")?,
            donor_id: row.get("donor_id")?,
            email: row.get("email")?,
            amount: row.get("amount")?,
            is_anonymous: row.get("is_anonymous")?,
            donation_type: row.get("donation_type")?,
            status: row.get("status")?,
            payment_intent_id: row.get("payment_intent_id")?,
            impact_report_sent: row.get("impact_report_sent")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// Validated write payloads, produced by `crate::forms`.

#[derive(Debug, Clone, PartialEq)]
pub struct ShelterInput {
    pub name: String,
    pub address: String,
    pub contact_number: String,
    pub email: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimalInput {
    pub id: Option<String>,
    pub name: String,
    pub kind: AnimalType,
    pub breed: Option<String>,
    pub age_years: Option<i64>,
    pub age_months: Option<i64>,
    pub gender: Option<Gender>,
    pub size: Option<AnimalSize>,
    pub weight_kg: Option<f64>,
    pub description: Option<String>,
    pub medical_history: Option<String>,
    pub behavior_notes: Option<String>,
    pub special_needs: Option<String>,
    pub status: AnimalStatus,
    pub treatment_details: Option<String>,
    pub primary_image_url: Option<String>,
    pub is_featured: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInput {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub category: ProjectCategory,
    pub target_amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDonation {
    pub shelter_id: Option<String>,
    pub project_id: Option<String>,
    pub donor_id: Option<String>,
    pub email: Option<String>,
    pub amount: i64,
    pub is_anonymous: bool,
    pub donation_type: DonationType,
}

#[derive(Debug, Clone)]
pub struct NewStatusChange {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub old_status: Option<String>,
    pub new_status: String,
    pub changed_by: Option<String>,
    pub notes: Option<String>,
}
