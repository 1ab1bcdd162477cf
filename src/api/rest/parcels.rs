use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::models::parcel::{Parcel, ParcelId};
use crate::models::stats::ParcelStats;
use crate::state::AppState;
use crate::store::{FieldUpdate, ParcelDraft};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/parcels", get(list_parcels).post(create_parcel))
        .route(
            "/parcels/:id",
            get(get_parcel).patch(update_parcel).delete(delete_parcel),
        )
        .route("/statistics", get(statistics))
        // JSON read endpoint kept at its original path as well.
        .route("/api/parcels", get(list_parcels))
}

/// Path ids that fail to parse can never match a stored parcel, so they
/// surface as not-found rather than a malformed-request error.
fn parse_id(raw: &str) -> Result<ParcelId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Parcel not found".to_string()))
}

async fn list_parcels(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Parcel>>, AppError> {
    let store = state.store()?;
    Ok(Json(store.parcels().to_vec()))
}

async fn create_parcel(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ParcelDraft>,
) -> Result<(StatusCode, Json<Parcel>), AppError> {
    let mut store = state.store_mut()?;

    match store.create(&draft) {
        Ok(parcel) => {
            state.metrics.record("create", "success");
            state.metrics.parcels_total.set(store.len() as i64);
            info!(id = %parcel.id, tracking_number = %parcel.tracking_number, "parcel created");
            Ok((StatusCode::CREATED, Json(parcel)))
        }
        Err(errors) => {
            state.metrics.record("create", "rejected");
            Err(AppError::Validation(errors))
        }
    }
}

async fn get_parcel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Parcel>, AppError> {
    let id = parse_id(&id)?;
    let store = state.store()?;

    let parcel = store
        .get(id)
        .ok_or_else(|| AppError::NotFound("Parcel not found".to_string()))?;

    Ok(Json(parcel.clone()))
}

async fn update_parcel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<FieldUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&id)?;
    let mut store = state.store_mut()?;

    match store.update_field(id, &update) {
        Ok(message) => {
            state.metrics.record("update", "success");
            info!(id = %id, "parcel field updated");
            Ok(Json(json!({ "message": message })))
        }
        Err(err) => {
            state.metrics.record("update", "rejected");
            Err(err)
        }
    }
}

async fn delete_parcel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&id)?;
    let mut store = state.store_mut()?;

    match store.remove(id) {
        Ok(removed) => {
            state.metrics.record("delete", "success");
            state.metrics.parcels_total.set(store.len() as i64);
            info!(id = %removed.id, tracking_number = %removed.tracking_number, "parcel removed");
            Ok(Json(json!({
                "message": format!("Parcel {} removed successfully!", removed.tracking_number)
            })))
        }
        Err(err) => {
            state.metrics.record("delete", "rejected");
            Err(err)
        }
    }
}

async fn statistics(State(state): State<Arc<AppState>>) -> Result<Json<ParcelStats>, AppError> {
    let store = state.store()?;
    Ok(Json(store.stats()))
}
