//! The JSON endpoints for managing categories.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    category::core::{
        Category, CategoryId, create_category, delete_category, get_category, list_categories,
        update_category,
    },
    db::lock_connection,
    json::{JsonBody, PathParam, required_text},
    user::UserID,
};

/// The state needed to manage categories.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a request to create or rename a category.
#[derive(Debug, Deserialize)]
pub struct CategoryData {
    /// The name of the category.
    pub nome: Option<String>,
}

/// A confirmation message for operations without a resource to return.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

const NAME_REQUIRED: &str = "nome is required";

/// Create a category for the logged-in user.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(data): JsonBody<CategoryData>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let name = required_text(data.nome, NAME_REQUIRED)?;
    let connection = lock_connection(&state.db_connection)?;

    let category = create_category(&name, user_id, &connection)?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// List the logged-in user's categories.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_categories(user_id, &connection).map(Json)
}

/// Get one of the logged-in user's categories.
pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    PathParam(category_id): PathParam<CategoryId>,
) -> Result<Json<Category>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_category(category_id, user_id, &connection).map(Json)
}

/// Rename one of the logged-in user's categories.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    PathParam(category_id): PathParam<CategoryId>,
    JsonBody(data): JsonBody<CategoryData>,
) -> Result<Json<Category>, Error> {
    let name = required_text(data.nome, NAME_REQUIRED)?;
    let connection = lock_connection(&state.db_connection)?;

    update_category(category_id, &name, user_id, &connection).map(Json)
}

/// Delete one of the logged-in user's categories.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    PathParam(category_id): PathParam<CategoryId>,
) -> Result<Json<MessageResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_category(category_id, user_id, &connection)?;
    tracing::info!("User {user_id} deleted category {category_id}");

    Ok(Json(MessageResponse {
        message: "Category deleted",
    }))
}
