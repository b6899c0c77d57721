use serde::{Deserialize, Serialize};

/// Request body for user creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub password: String,
}

/// Response returned after creating a user.
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub id: i32,
    pub status: String,
}

/// Request body for a partial update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct ChangeUserRequest {
    pub id: i32,
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChangeUserResponse {
    pub result: bool,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserRequest {
    pub id: i32,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserResponse {
    pub result: bool,
    pub status: String,
}

/// Query string for the name search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: String,
}
