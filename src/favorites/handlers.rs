use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::services::AuthUser,
    error::{unique_violation, ApiError, FieldError},
    favorites::{
        dto::{AddFavoriteRequest, RemovedResponse},
        repo::Favorite,
    },
    state::AppState,
};

pub fn favorites_routes() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/:id", delete(remove_favorite))
        .route("/favorites/city/:city_name", delete(remove_favorite_by_city))
}

#[instrument(skip(state))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Favorite>>, ApiError> {
    let favorites = Favorite::list_by_user(&state.db, user_id).await?;
    Ok(Json(favorites))
}

#[instrument(skip(state, payload))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<AddFavoriteRequest>,
) -> Result<(StatusCode, Json<Favorite>), ApiError> {
    let mut errors = Vec::new();
    if payload.city_name.is_empty() {
        errors.push(FieldError::new("cityName", "City name is required"));
    }
    if payload.country.is_empty() {
        errors.push(FieldError::new("country", "Country is required"));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if Favorite::find_by_city(&state.db, user_id, &payload.city_name)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("City already in favorites".into()));
    }

    let favorite =
        match Favorite::create(&state.db, user_id, &payload.city_name, &payload.country).await {
            Ok(f) => f,
            Err(e) => {
                // A concurrent add for the same city can pass the pre-check;
                // the unique constraint rejects it and the caller sees the
                // same conflict either way.
                if unique_violation(&e).is_some() {
                    warn!(user_id = %user_id, city = %payload.city_name, "duplicate favorite lost the race");
                    return Err(ApiError::Conflict("City already in favorites".into()));
                }
                return Err(e.into());
            }
        };

    info!(user_id = %user_id, favorite_id = %favorite.id, city = %favorite.city_name, "favorite added");
    Ok((StatusCode::CREATED, Json(favorite)))
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RemovedResponse>, ApiError> {
    // Not-found for someone else's favorite too, so existence is never
    // confirmed to non-owners.
    if !Favorite::delete_by_id(&state.db, user_id, id).await? {
        return Err(ApiError::NotFound("Favorite not found".into()));
    }
    info!(user_id = %user_id, favorite_id = %id, "favorite removed");
    Ok(Json(RemovedResponse::removed()))
}

#[instrument(skip(state))]
pub async fn remove_favorite_by_city(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(city_name): Path<String>,
) -> Result<Json<RemovedResponse>, ApiError> {
    if !Favorite::delete_by_city(&state.db, user_id, &city_name).await? {
        return Err(ApiError::NotFound("Favorite not found".into()));
    }
    info!(user_id = %user_id, city = %city_name, "favorite removed by city");
    Ok(Json(RemovedResponse::removed()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Validation runs before any query, so this exercises the handler
    // against a lazy pool that never connects.
    #[tokio::test]
    async fn add_rejects_empty_fields_with_field_errors() {
        let state = AppState::fake();
        let payload = AddFavoriteRequest {
            city_name: "".into(),
            country: "".into(),
        };
        let err = add_favorite(State(state), AuthUser(Uuid::new_v4()), Json(payload))
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(fields) => {
                let named: Vec<&str> = fields.iter().map(|f| f.field).collect();
                assert_eq!(named, vec!["cityName", "country"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
