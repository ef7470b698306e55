use adoptable::db::{
    self,
    models::{
        AnimalInput, AnimalStatus, AnimalType, ApplicationStatus, DonationStatus, DonationType,
        EntityType, NewDonation, NewStatusChange, ProjectCategory, ProjectInput, ProjectStatus,
        Role, ShelterInput,
    },
    DbPool,
};
use chrono::NaiveDate;
use serde_json::json;

async fn pool_with_shelter() -> (DbPool, String) {
    let pool = db::init_pool(":memory:").await.expect("init pool");
    db::ensure_profile(&pool, "admin-1", "admin@example.com", Some("Shelter Admin".into()))
        .await
        .expect("admin profile");
    let shelter = db::create_shelter(
        &pool,
        "admin-1",
        ShelterInput {
            name: "Happy Paws".into(),
            address: "12 Rizal St".into(),
            contact_number: "0917 000 0000".into(),
            email: "hello@happypaws.ph".into(),
            description: Some("Dogs and cats".into()),
        },
    )
    .await
    .expect("create_shelter");
    (pool, shelter.id)
}

fn animal(name: &str) -> AnimalInput {
    AnimalInput {
        id: None,
        name: name.into(),
        kind: AnimalType::Dog,
        breed: Some("Aspin".into()),
        age_years: Some(2),
        age_months: Some(0),
        gender: None,
        size: None,
        weight_kg: Some(12.5),
        description: None,
        medical_history: None,
        behavior_notes: None,
        special_needs: None,
        status: AnimalStatus::ForRescuing,
        treatment_details: None,
        primary_image_url: None,
        is_featured: true,
    }
}

fn project(title: &str, target: f64) -> ProjectInput {
    ProjectInput {
        id: None,
        title: title.into(),
        description: "Fundraiser".into(),
        category: ProjectCategory::Infrastructure,
        target_amount: target,
        start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2026, 12, 31).expect("valid date"),
        image_url: None,
    }
}

#[tokio::test]
async fn profiles_are_created_once_and_roles_change() {
    let pool = db::init_pool(":memory:").await.expect("init pool");

    let first = db::ensure_profile(&pool, "u-1", "u1@example.com", Some("First".into()))
        .await
        .expect("ensure_profile");
    assert_eq!(first.role, Role::User);

    let again = db::ensure_profile(&pool, "u-1", "other@example.com", None)
        .await
        .expect("ensure_profile again");
    assert_eq!(again.email, "u1@example.com");
    assert_eq!(again.full_name.as_deref(), Some("First"));

    assert!(db::set_profile_role(&pool, "u-1", Role::ShelterAdmin).await.expect("set role"));
    assert!(!db::set_profile_role(&pool, "missing", Role::Admin).await.expect("set role"));

    let updated = db::update_profile(&pool, "u-1", Some("Renamed".into()), None)
        .await
        .expect("update_profile")
        .expect("profile exists");
    assert_eq!(updated.role, Role::ShelterAdmin);
    assert_eq!(updated.full_name.as_deref(), Some("Renamed"));
}

#[tokio::test]
async fn shelters_start_unverified() {
    let (pool, shelter_id) = pool_with_shelter().await;

    let shelter = db::get_shelter(&pool, &shelter_id).await.expect("get").expect("exists");
    assert!(!shelter.is_verified);
    assert!(shelter.is_administered_by("admin-1"));
    assert!(db::list_verified_shelters(&pool, None).await.expect("list").is_empty());

    assert!(db::set_shelter_verified(&pool, &shelter_id, true).await.expect("verify"));
    let verified = db::list_verified_shelters(&pool, Some(3)).await.expect("list");
    assert_eq!(verified.len(), 1);

    let mine = db::list_shelters_by_admin(&pool, "admin-1").await.expect("mine");
    assert_eq!(mine[0].id, shelter_id);
}

#[tokio::test]
async fn animal_save_and_status_history() {
    let (pool, shelter_id) = pool_with_shelter().await;

    let created = db::save_animal(&pool, &shelter_id, animal("Bantay"), "admin-1")
        .await
        .expect("insert")
        .expect("inserted row");
    assert_eq!(created.status, AnimalStatus::ForRescuing);

    let mut edit = animal("Bantay Jr");
    edit.id = Some(created.id.clone());
    edit.status = AnimalStatus::UnderTreatment;
    edit.treatment_details = Some("Deworming".into());
    let edited = db::save_animal(&pool, &shelter_id, edit, "admin-1")
        .await
        .expect("update")
        .expect("updated row");
    assert_eq!(edited.name, "Bantay Jr");
    assert_eq!(edited.treatment_details.as_deref(), Some("Deworming"));

    let moved = db::update_animal_status(
        &pool,
        &created.id,
        AnimalStatus::FoundForeverHome,
        "admin-1",
        Some("Adopted by the Cruz family".into()),
    )
    .await
    .expect("status")
    .expect("animal exists");
    assert_eq!(moved.status, AnimalStatus::FoundForeverHome);
    assert_eq!(moved.treatment_details, None);

    let history = db::get_status_history(&pool, EntityType::Animal, &created.id)
        .await
        .expect("history");
    let statuses: Vec<_> = history.iter().map(|c| c.new_status.as_str()).collect();
    assert_eq!(statuses, ["found_forever_home", "under_treatment", "for_rescuing"]);
    assert_eq!(history[2].old_status, None);
    assert_eq!(history[0].notes.as_deref(), Some("Adopted by the Cruz family"));
}

#[tokio::test]
async fn animal_updates_are_scoped_to_shelter() {
    let (pool, shelter_id) = pool_with_shelter().await;
    let other = db::create_shelter(
        &pool,
        "admin-1",
        ShelterInput {
            name: "Second Chance".into(),
            address: "5 Mabini St".into(),
            contact_number: "0918 000 0000".into(),
            email: "hi@secondchance.ph".into(),
            description: None,
        },
    )
    .await
    .expect("second shelter");

    let created = db::save_animal(&pool, &shelter_id, animal("Bantay"), "admin-1")
        .await
        .expect("insert")
        .expect("row");
    let mut edit = animal("Hijacked");
    edit.id = Some(created.id.clone());
    let result = db::save_animal(&pool, &other.id, edit, "admin-1").await.expect("update");
    assert!(result.is_none());
}

#[tokio::test]
async fn featured_animals_carry_their_shelter() {
    let (pool, shelter_id) = pool_with_shelter().await;
    for name in ["A", "B", "C", "D"] {
        db::save_animal(&pool, &shelter_id, animal(name), "admin-1")
            .await
            .expect("insert");
    }
    let mut hidden = animal("Hidden");
    hidden.is_featured = false;
    db::save_animal(&pool, &shelter_id, hidden, "admin-1").await.expect("insert");

    let featured = db::list_featured_animals(&pool, 3).await.expect("featured");
    assert_eq!(featured.len(), 3);
    assert_eq!(featured[0].animal.name, "D");
    assert!(featured
        .iter()
        .all(|f| f.shelter.as_ref().map(|s| s.id.as_str()) == Some(shelter_id.as_str())));

    let all = db::list_animals_by_shelter(&pool, &shelter_id).await.expect("list");
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].name, "Hidden");
}

#[tokio::test]
async fn only_one_primary_photo() {
    let (pool, shelter_id) = pool_with_shelter().await;
    let created = db::save_animal(&pool, &shelter_id, animal("Bantay"), "admin-1")
        .await
        .expect("insert")
        .expect("row");

    db::add_animal_photo(&pool, &created.id, "https://cdn/a.jpg", true, "admin-1", None)
        .await
        .expect("first photo");
    db::add_animal_photo(
        &pool,
        &created.id,
        "https://cdn/b.jpg",
        false,
        "admin-1",
        Some(json!({ "description": "Playing" })),
    )
    .await
    .expect("second photo");
    db::add_animal_photo(&pool, &created.id, "https://cdn/c.jpg", true, "admin-1", None)
        .await
        .expect("third photo");

    let found = db::get_animal_with_photos(&pool, &created.id)
        .await
        .expect("with photos")
        .expect("exists");
    assert_eq!(found.photos.len(), 3);
    assert_eq!(found.photos.iter().filter(|p| p.is_primary).count(), 1);
    assert_eq!(found.photos[0].url, "https://cdn/c.jpg");
    assert_eq!(found.animal.primary_image_url.as_deref(), Some("https://cdn/c.jpg"));

    assert!(db::get_animal_with_photos(&pool, "missing").await.expect("query").is_none());
}

#[tokio::test]
async fn application_review_flow() {
    let (pool, shelter_id) = pool_with_shelter().await;
    db::ensure_profile(&pool, "adopter-1", "adopter@example.com", None)
        .await
        .expect("adopter");
    let created = db::save_animal(&pool, &shelter_id, animal("Bantay"), "admin-1")
        .await
        .expect("insert")
        .expect("row");

    let first = db::create_adoption_application(
        &pool,
        &created.id,
        "adopter-1",
        json!({ "home": "house with yard" }),
    )
    .await
    .expect("apply");
    assert_eq!(first.status, ApplicationStatus::Pending);
    let second = db::create_adoption_application(&pool, &created.id, "adopter-1", json!({}))
        .await
        .expect("apply again");

    let reviewed = db::review_adoption_application(
        &pool,
        &first.id,
        ApplicationStatus::Approved,
        "Great fit",
        "admin-1",
    )
    .await
    .expect("review")
    .expect("was pending");
    assert_eq!(reviewed.status, ApplicationStatus::Approved);
    assert_eq!(reviewed.reviewed_by.as_deref(), Some("admin-1"));
    assert!(reviewed.reviewed_at.is_some());

    let again = db::review_adoption_application(
        &pool,
        &first.id,
        ApplicationStatus::Rejected,
        "",
        "admin-1",
    )
    .await
    .expect("second review");
    assert!(again.is_none());

    assert!(db::withdraw_adoption_application(&pool, &second.id, "someone-else")
        .await
        .expect("withdraw")
        .is_none());
    let withdrawn = db::withdraw_adoption_application(&pool, &second.id, "adopter-1")
        .await
        .expect("withdraw")
        .expect("was pending");
    assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);

    let pending = db::list_adoption_applications(&pool, &created.id, Some(ApplicationStatus::Pending))
        .await
        .expect("pending");
    assert!(pending.is_empty());
    let all = db::list_adoption_applications(&pool, &created.id, None).await.expect("all");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.id);

    let mine = db::list_applications_by_user(&pool, "adopter-1").await.expect("mine");
    assert_eq!(mine.len(), 2);

    let history = db::get_status_history(&pool, EntityType::Application, &first.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].notes.as_deref(), Some("Great fit"));
}

#[tokio::test]
async fn projects_start_active_and_filter_by_status() {
    let (pool, shelter_id) = pool_with_shelter().await;

    let kennels = db::save_project(&pool, &shelter_id, project("Kennels", 50_000.0))
        .await
        .expect("insert")
        .expect("row");
    assert_eq!(kennels.status, ProjectStatus::Active);
    assert_eq!(kennels.current_amount, 0.0);
    let vaccines = db::save_project(&pool, &shelter_id, project("Vaccines", 10_000.0))
        .await
        .expect("insert")
        .expect("row");

    let mut edit = project("Kennels and roofing", 60_000.0);
    edit.id = Some(kennels.id.clone());
    let edited = db::save_project(&pool, &shelter_id, edit.clone())
        .await
        .expect("update")
        .expect("row");
    assert_eq!(edited.title, "Kennels and roofing");
    assert!(db::save_project(&pool, "other-shelter", edit).await.expect("update").is_none());

    db::update_project_status(&pool, &vaccines.id, ProjectStatus::Completed, "admin-1")
        .await
        .expect("status")
        .expect("exists");

    let active = db::list_projects_by_shelter(&pool, &shelter_id, Some(ProjectStatus::Active))
        .await
        .expect("active");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, kennels.id);

    let all = db::list_projects_by_shelter(&pool, &shelter_id, None).await.expect("all");
    assert_eq!(all[0].id, vaccines.id);
}

#[tokio::test]
async fn completing_a_donation_credits_project_once() {
    let (pool, shelter_id) = pool_with_shelter().await;
    db::ensure_profile(&pool, "donor-1", "donor@example.com", None)
        .await
        .expect("donor");
    let kennels = db::save_project(&pool, &shelter_id, project("Kennels", 5_000.0))
        .await
        .expect("insert")
        .expect("row");

    let donation = db::create_donation(
        &pool,
        NewDonation {
            shelter_id: Some(shelter_id.clone()),
            project_id: Some(kennels.id.clone()),
            donor_id: Some("donor-1".into()),
            email: Some("donor@example.com".into()),
            amount: 1000,
            is_anonymous: false,
            donation_type: DonationType::Shelter,
        },
    )
    .await
    .expect("create_donation");
    assert_eq!(donation.status, DonationStatus::Pending);
    assert!(!donation.impact_report_sent);

    let completed = db::complete_donation(&pool, &donation.id, Some("sim_1".into()))
        .await
        .expect("complete")
        .expect("exists");
    assert_eq!(completed.status, DonationStatus::Completed);
    assert_eq!(completed.payment_intent_id.as_deref(), Some("sim_1"));

    db::complete_donation(&pool, &donation.id, Some("sim_1".into()))
        .await
        .expect("complete again");
    let project = db::get_project(&pool, &kennels.id).await.expect("get").expect("exists");
    assert_eq!(project.current_amount, 1000.0);

    let history = db::get_status_history(&pool, EntityType::Donation, &donation.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);

    let mine = db::list_donations_by_donor(&pool, "donor-1").await.expect("mine");
    assert_eq!(mine.len(), 1);
    assert!(db::complete_donation(&pool, "missing", None).await.expect("query").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_confirmations_on_a_file_database_all_succeed() {
    let path = std::env::temp_dir().join(format!("adoptable-{}.db", uuid::Uuid::new_v4()));
    let pool = db::init_pool(path.to_str().expect("utf-8 temp path"))
        .await
        .expect("init pool");
    db::ensure_profile(&pool, "admin-1", "admin@example.com", None)
        .await
        .expect("admin profile");
    let shelter = db::create_shelter(
        &pool,
        "admin-1",
        ShelterInput {
            name: "Happy Paws".into(),
            address: "12 Rizal St".into(),
            contact_number: "0917 000 0000".into(),
            email: "hello@happypaws.ph".into(),
            description: None,
        },
    )
    .await
    .expect("create_shelter");
    let kennels = db::save_project(&pool, &shelter.id, project("Kennels", 50_000.0))
        .await
        .expect("insert")
        .expect("row");

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let donation = db::create_donation(
            &pool,
            NewDonation {
                shelter_id: Some(shelter.id.clone()),
                project_id: Some(kennels.id.clone()),
                donor_id: None,
                email: Some("anon@example.com".into()),
                amount: 1000,
                is_anonymous: true,
                donation_type: DonationType::Shelter,
            },
        )
        .await
        .expect("create_donation");
        for _ in 0..8 {
            let pool = pool.clone();
            let id = donation.id.clone();
            tasks.push(tokio::spawn(async move {
                db::complete_donation(&pool, &id, Some(format!("sim_{id}"))).await
            }));
        }
    }

    for task in tasks {
        let completed = task.await.expect("join").expect("complete_donation");
        assert_eq!(completed.map(|d| d.status), Some(DonationStatus::Completed));
    }

    let project = db::get_project(&pool, &kennels.id).await.expect("get").expect("exists");
    assert_eq!(project.current_amount, 5000.0);

    drop(pool);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn donations_below_minimum_are_refused_by_the_database() {
    let pool = db::init_pool(":memory:").await.expect("init pool");
    let result = db::create_donation(
        &pool,
        NewDonation {
            shelter_id: None,
            project_id: None,
            donor_id: None,
            email: Some("anon@example.com".into()),
            amount: 99,
            is_anonymous: true,
            donation_type: DonationType::General,
        },
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn status_changes_can_be_recorded_directly() {
    let pool = db::init_pool(":memory:").await.expect("init pool");
    let id = db::record_status_change(
        &pool,
        NewStatusChange {
            entity_type: EntityType::Project,
            entity_id: "p-1".into(),
            old_status: None,
            new_status: "active".into(),
            changed_by: None,
            notes: Some("imported".into()),
        },
    )
    .await
    .expect("record");

    let history = db::get_status_history(&pool, EntityType::Project, "p-1").await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, id);
}
