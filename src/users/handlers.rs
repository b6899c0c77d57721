use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{instrument, warn};

use crate::{
    auth::password::hash_password,
    state::AppState,
    users::dto::{
        ChangeUserRequest, ChangeUserResponse, CreateUserRequest, CreateUserResponse,
        DeleteUserRequest, DeleteUserResponse, SearchQuery,
    },
    users::model::{User, UserUpdate},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/search", get(search_users))
        .route("/users/:id", get(get_user))
        .route("/users/create", post(create_user))
        .route("/users/change", post(change_user))
        .route("/users/delete", post(delete_user))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn unavailable() -> (StatusCode, String) {
    (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable".into())
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<User>, (StatusCode, String)> {
    let mut store = state.store();
    if !store.connect().await {
        return Err(unavailable());
    }
    let user = store.get_by_id(id).await;
    store.disconnect().await;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err((StatusCode::NOT_FOUND, "User not found".into())),
    }
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, (StatusCode, String)> {
    let mut store = state.store();
    if !store.connect().await {
        return Err(unavailable());
    }
    let users = store.get_all().await;
    store.disconnect().await;

    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<User>>, (StatusCode, String)> {
    let mut store = state.store();
    if !store.connect().await {
        return Err(unavailable());
    }
    let users = store.search_by_name(&query.name).await;
    store.disconnect().await;

    Ok(Json(users))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let hash =
        hash_password(&payload.password).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let mut store = state.store();
    if !store.connect().await {
        return Err(unavailable());
    }

    // Ensure email is not taken
    if store.get_by_email(&payload.email).await.is_some() {
        store.disconnect().await;
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }

    let id = store
        .insert(&payload.name, &payload.email, payload.age, &hash)
        .await;
    store.disconnect().await;

    match id {
        Some(id) => Ok((
            StatusCode::CREATED,
            Json(CreateUserResponse {
                id,
                status: "created".into(),
            }),
        )),
        None => Err((StatusCode::INTERNAL_SERVER_ERROR, "Create user failed".into())),
    }
}

#[instrument(skip(state, payload))]
pub async fn change_user(
    State(state): State<AppState>,
    Json(mut payload): Json<ChangeUserRequest>,
) -> Result<Json<ChangeUserResponse>, (StatusCode, String)> {
    if let Some(email) = payload.email.as_mut() {
        *email = email.trim().to_lowercase();
        if !is_valid_email(email) {
            warn!(email = %email, "invalid email");
            return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
        }
    }

    let password = match payload.password.as_deref() {
        Some(plain) if plain.len() < 8 => {
            warn!("password too short");
            return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
        }
        Some(plain) => Some(
            hash_password(plain).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?,
        ),
        None => None,
    };

    let fields = UserUpdate {
        name: payload.name,
        email: payload.email,
        age: payload.age,
        password,
    };
    if fields.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No fields to update".into()));
    }

    let mut store = state.store();
    if !store.connect().await {
        return Err(unavailable());
    }
    let updated = store.update(payload.id, &fields).await;
    store.disconnect().await;

    if !updated {
        return Err((StatusCode::NOT_FOUND, "User not found".into()));
    }

    Ok(Json(ChangeUserResponse {
        result: true,
        status: "updated".into(),
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Json(payload): Json<DeleteUserRequest>,
) -> Result<Json<DeleteUserResponse>, (StatusCode, String)> {
    let mut store = state.store();
    if !store.connect().await {
        return Err(unavailable());
    }
    let deleted = store.delete(payload.id).await;
    store.disconnect().await;

    if !deleted {
        return Err((StatusCode::NOT_FOUND, "User not found".into()));
    }

    Ok(Json(DeleteUserResponse {
        result: true,
        status: "deleted".into(),
    }))
}

#[cfg(test)]
mod email_tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("zhangsan@example.com"));
        assert!(is_valid_email("a.b+tag@sub.domain.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("@example.com"));
    }
}
