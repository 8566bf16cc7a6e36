//! Rebinding licenses on user activation and deletion.

use digital_products::db::queries;
use digital_products::events::{UserActivated, UserDeleted};
use digital_products::hooks::HookDecision;
use digital_products::user_lifecycle::{ReleaseReport, handle_user_activated, handle_user_deleted};

mod common;
use common::*;

#[test]
fn test_activation_binds_email_matched_licenses() {
    let state = create_test_app_state();
    let mut conn = state.db.get().unwrap();
    let pt = create_test_product_type(&state, &conn, "plugin");
    let a = create_test_product(&state, &conn, &pt.id, "PLUGIN-A");
    let b = create_test_product(&state, &conn, &pt.id, "PLUGIN-B");
    issue(&state, &mut conn, license_for_email(&a.id, "new@example.com"));
    issue(&state, &mut conn, license_for_email(&b.id, "NEW@example.com"));
    issue(&state, &mut conn, license_for_email(&b.id, "other@example.com"));

    let event = UserActivated {
        user: test_user("user-1", "new@example.com"),
    };
    let bound = handle_user_activated(&mut conn, &state.licenses, &event).unwrap();

    assert_eq!(bound, 2);
    let owned = state
        .licenses
        .find(&conn, &LicenseQuery::default().user_id("user-1"))
        .unwrap();
    assert_eq!(owned.len(), 2);
}

#[test]
fn test_activation_with_assignment_disabled_binds_nothing() {
    let state = create_test_app_state_with(LicenseSettings {
        auto_assign_licenses_on_user_registration: false,
        ..LicenseSettings::default()
    });
    let mut conn = state.db.get().unwrap();
    let pt = create_test_product_type(&state, &conn, "plugin");
    let product = create_test_product(&state, &conn, &pt.id, "PLUGIN-1");
    issue(&state, &mut conn, license_for_email(&product.id, "new@example.com"));
    issue(&state, &mut conn, license_for_email(&product.id, "new@example.com"));

    let event = UserActivated {
        user: test_user("user-1", "new@example.com"),
    };
    let bound = handle_user_activated(&mut conn, &state.licenses, &event).unwrap();

    assert_eq!(bound, 0);
    assert_eq!(
        state
            .licenses
            .count(&conn, &LicenseQuery::default().user_id("user-1"))
            .unwrap(),
        0
    );
    // The account mirror is still refreshed
    assert!(
        queries::get_user_by_id(&conn, "user-1")
            .unwrap()
            .is_some()
    );
}

#[test]
fn test_activation_leaves_already_bound_licenses_alone() {
    let state = create_test_app_state();
    let mut conn = state.db.get().unwrap();
    let pt = create_test_product_type(&state, &conn, "plugin");
    let product = create_test_product(&state, &conn, &pt.id, "PLUGIN-1");
    create_test_user(&conn, "user-old", "old@example.com");
    let held = issue(
        &state,
        &mut conn,
        CreateLicense {
            owner_email: Some("shared@example.com".to_string()),
            ..license_for_user(&product.id, "user-old")
        },
    );

    let event = UserActivated {
        user: test_user("user-new", "shared@example.com"),
    };
    let bound = handle_user_activated(&mut conn, &state.licenses, &event).unwrap();

    assert_eq!(bound, 0);
    let stored = state.licenses.find_by_id(&conn, &held.id).unwrap().unwrap();
    assert_eq!(stored.user_id.as_deref(), Some("user-old"));
}

#[test]
fn test_deletion_releases_licenses_to_email() {
    let state = create_test_app_state();
    let mut conn = state.db.get().unwrap();
    let pt = create_test_product_type(&state, &conn, "plugin");
    let product = create_test_product(&state, &conn, &pt.id, "PLUGIN-1");
    let user = create_test_user(&conn, "user-1", "leaving@example.com");
    let license = issue(&state, &mut conn, license_for_user(&product.id, &user.id));
    assert!(license.owner_email.is_none());

    let event = UserDeleted { user: user.clone() };
    let report = handle_user_deleted(&mut conn, &state.licenses, &event).unwrap();

    assert_eq!(report, ReleaseReport { released: 1, vetoed: 0 });
    let stored = state.licenses.find_by_id(&conn, &license.id).unwrap().unwrap();
    assert!(stored.user_id.is_none());
    assert_eq!(stored.owner_email.as_deref(), Some("leaving@example.com"));
    assert!(
        queries::get_user_by_id(&conn, &user.id)
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_deletion_of_user_without_licenses() {
    let state = create_test_app_state();
    let mut conn = state.db.get().unwrap();
    let user = create_test_user(&conn, "user-1", "idle@example.com");

    let report =
        handle_user_deleted(&mut conn, &state.licenses, &UserDeleted { user }).unwrap();

    assert_eq!(report, ReleaseReport::default());
}

#[test]
fn test_activation_takes_over_licenses_of_stale_account_with_same_email() {
    let state = create_test_app_state();
    let mut conn = state.db.get().unwrap();
    let pt = create_test_product_type(&state, &conn, "plugin");
    let product = create_test_product(&state, &conn, &pt.id, "PLUGIN-1");
    create_test_user(&conn, "user-old", "a@example.com");
    // Bound at purchase, so the license carries no email of its own
    let license = issue(&state, &mut conn, license_for_email(&product.id, "a@example.com"));
    assert_eq!(license.user_id.as_deref(), Some("user-old"));
    assert!(license.owner_email.is_none());

    let event = UserActivated {
        user: test_user("user-new", "a@example.com"),
    };
    let bound = handle_user_activated(&mut conn, &state.licenses, &event).unwrap();

    assert_eq!(bound, 1);
    let stored = state.licenses.find_by_id(&conn, &license.id).unwrap().unwrap();
    assert_eq!(stored.user_id.as_deref(), Some("user-new"));
    assert!(queries::get_user_by_id(&conn, "user-old").unwrap().is_none());
}

#[test]
fn test_activation_conflicts_when_stale_account_release_is_vetoed() {
    let state = with_license_service(create_test_app_state(), |mut svc| {
        svc.hooks_mut().on_before_save(|event| {
            if !event.is_new && event.license.user_id.is_none() {
                HookDecision::Veto
            } else {
                HookDecision::Proceed
            }
        });
        svc
    });
    let mut conn = state.db.get().unwrap();
    let pt = create_test_product_type(&state, &conn, "plugin");
    let product = create_test_product(&state, &conn, &pt.id, "PLUGIN-1");
    create_test_user(&conn, "user-old", "a@example.com");
    let license = issue(&state, &mut conn, license_for_user(&product.id, "user-old"));

    let event = UserActivated {
        user: test_user("user-new", "a@example.com"),
    };
    let err = handle_user_activated(&mut conn, &state.licenses, &event).unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    let stored = state.licenses.find_by_id(&conn, &license.id).unwrap().unwrap();
    assert_eq!(stored.user_id.as_deref(), Some("user-old"));
    assert!(queries::get_user_by_id(&conn, "user-old").unwrap().is_some());
    assert!(queries::get_user_by_id(&conn, "user-new").unwrap().is_none());
}

#[test]
fn test_upsert_keeps_stale_account_that_still_owns_licenses() {
    let state = create_test_app_state();
    let mut conn = state.db.get().unwrap();
    let pt = create_test_product_type(&state, &conn, "plugin");
    let product = create_test_product(&state, &conn, &pt.id, "PLUGIN-1");
    create_test_user(&conn, "user-old", "a@example.com");
    let license = issue(&state, &mut conn, license_for_user(&product.id, "user-old"));

    let result = queries::upsert_user(&conn, &test_user("user-new", "a@example.com"));

    assert!(result.is_err());
    let stored = state.licenses.find_by_id(&conn, &license.id).unwrap().unwrap();
    assert_eq!(stored.user_id.as_deref(), Some("user-old"));
    assert!(queries::get_user_by_id(&conn, "user-old").unwrap().is_some());
}

#[test]
fn test_deletion_with_vetoed_release_keeps_account() {
    let state = with_license_service(create_test_app_state(), |mut svc| {
        svc.hooks_mut().on_before_save(|event| {
            if !event.is_new && event.license.user_id.is_none() {
                HookDecision::Veto
            } else {
                HookDecision::Proceed
            }
        });
        svc
    });
    let mut conn = state.db.get().unwrap();
    let pt = create_test_product_type(&state, &conn, "plugin");
    let product = create_test_product(&state, &conn, &pt.id, "PLUGIN-1");
    let user = create_test_user(&conn, "user-1", "leaving@example.com");
    let license = issue(&state, &mut conn, license_for_user(&product.id, &user.id));

    let report =
        handle_user_deleted(&mut conn, &state.licenses, &UserDeleted { user: user.clone() })
            .unwrap();

    assert_eq!(report, ReleaseReport { released: 0, vetoed: 1 });
    let stored = state.licenses.find_by_id(&conn, &license.id).unwrap().unwrap();
    assert_eq!(stored.user_id.as_deref(), Some("user-1"));
    let mirror = queries::get_user_by_id(&conn, &user.id).unwrap().unwrap();
    assert_eq!(stored.licensed_to(Some(&mirror)), Some("leaving@example.com"));
}
