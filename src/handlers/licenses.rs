use axum::{
    Json,
    extract::{Path, State},
};

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::models::License;

/// GET /licenses/{id}
pub async fn get_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<License>> {
    let conn = state.db.get()?;
    let license = state
        .licenses
        .find_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound(format!("No license exists with the ID “{}”", id)))?;
    Ok(Json(license))
}
