//! Rebinding licenses as user accounts come and go.
//!
//! A license must stay reachable by some email. Before an account mirror
//! goes away its licenses are released onto the account email; if a hook
//! vetoes any release the mirror is kept so the vetoed licenses still
//! resolve to an address.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::events::{UserActivated, UserDeleted};
use crate::models::{LicenseQuery, SaveOutcome, UpdateLicense, User};
use crate::services::LicenseService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
    pub released: usize,
    /// Releases a before-save hook declined; those licenses keep their account
    pub vetoed: usize,
}

/// Move every license bound to `user` back onto the account email.
fn release_licenses(
    conn: &mut Connection,
    licenses: &LicenseService,
    user: &User,
) -> Result<ReleaseReport> {
    let owned = licenses.find(conn, &LicenseQuery::unfiltered().user_id(&user.id))?;
    let mut report = ReleaseReport::default();
    for license in owned {
        let changes = UpdateLicense {
            owner_email: Some(Some(user.email.clone())),
            user_id: Some(None),
            ..UpdateLicense::default()
        };
        match licenses.update(conn, &license.id, changes)? {
            SaveOutcome::Saved(_) => report.released += 1,
            SaveOutcome::Vetoed => report.vetoed += 1,
        }
    }
    Ok(report)
}

/// Bind unassigned licenses carrying the user's email to the activated account.
///
/// A stale mirror holding the same email under another id has its licenses
/// released first, so they are picked up by this activation. Fails with
/// `Conflict` when a hook keeps any of them on the stale account.
///
/// Returns how many licenses were bound. Does nothing beyond refreshing the
/// user mirror when auto-assignment on registration is disabled.
pub fn handle_user_activated(
    conn: &mut Connection,
    licenses: &LicenseService,
    event: &UserActivated,
) -> Result<usize> {
    if let Some(stale) = queries::get_user_by_email(conn, &event.user.email)? {
        if stale.id != event.user.id {
            let report = release_licenses(conn, licenses, &stale)?;
            if report.vetoed > 0 {
                return Err(AppError::Conflict(format!(
                    "Email {} is still held by user {}: {} license(s) could not be released",
                    stale.email, stale.id, report.vetoed
                )));
            }
            tracing::info!(
                "Replacing stale user {} with {}, released {} license(s)",
                stale.id,
                event.user.id,
                report.released
            );
        }
    }

    let user = queries::upsert_user(conn, &event.user)?;

    if !licenses.settings().auto_assign_licenses_on_user_registration {
        return Ok(0);
    }

    let matching = licenses.find(conn, &LicenseQuery::default().owner_email(&user.email))?;
    let mut bound = 0;
    for license in matching.into_iter().filter(|l| l.user_id.is_none()) {
        let changes = UpdateLicense {
            user_id: Some(Some(user.id.clone())),
            ..UpdateLicense::default()
        };
        if let SaveOutcome::Saved(_) = licenses.update(conn, &license.id, changes)? {
            bound += 1;
        }
    }

    if bound > 0 {
        tracing::info!("Bound {} license(s) to activated user {}", bound, user.id);
    }
    Ok(bound)
}

/// Detach licenses from a deleted account, keeping them reachable by email.
///
/// The user mirror is removed only when every license was released.
pub fn handle_user_deleted(
    conn: &mut Connection,
    licenses: &LicenseService,
    event: &UserDeleted,
) -> Result<ReleaseReport> {
    let user = &event.user;
    let report = release_licenses(conn, licenses, user)?;

    if report.vetoed > 0 {
        tracing::warn!(
            "Keeping user {}: {} license release(s) vetoed",
            user.id,
            report.vetoed
        );
    } else {
        queries::delete_user(conn, &user.id)?;
    }

    if report.released > 0 {
        tracing::info!(
            "Released {} license(s) from deleted user {}",
            report.released,
            user.id
        );
    }
    Ok(report)
}
