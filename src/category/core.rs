use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::{
    Error,
    db::{RowsAffected, map_delete_error},
    user::UserID,
};

pub type CategoryId = i64;

/// A label for transactions, owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    /// The id for the category.
    pub id: CategoryId,
    /// The display name of the category.
    #[serde(rename = "nome")]
    pub name: String,
    /// The user that owns the category.
    #[serde(rename = "usuario_id")]
    pub user_id: UserID,
}

pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS categorias (
            id INTEGER PRIMARY KEY,
            nome TEXT NOT NULL,
            usuario_id INTEGER NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_categorias_usuario ON categorias(usuario_id)",
        (),
    )?;

    Ok(())
}

fn map_row_to_category(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        user_id: UserID::new(row.get(2)?),
    })
}

pub fn create_category(
    name: &str,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection.execute(
        "INSERT INTO categorias (nome, usuario_id) VALUES (?1, ?2)",
        params![name, user_id.as_i64()],
    )?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
        user_id,
    })
}

/// Get the categories of `user_id`, sorted by name.
pub fn list_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, nome, usuario_id FROM categorias WHERE usuario_id = ?1 ORDER BY nome, id",
        )?
        .query_map(params![user_id.as_i64()], map_row_to_category)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// Get a category by its ID.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not exist or belongs to
/// another user.
pub fn get_category(
    id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .query_row(
            "SELECT id, nome, usuario_id FROM categorias WHERE id = ?1 AND usuario_id = ?2",
            params![id, user_id.as_i64()],
            map_row_to_category,
        )
        .optional()?
        .ok_or(Error::NotFound("category"))
}

/// Check that the category `id` exists and belongs to `user_id`.
pub fn ensure_category_owned(
    id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    get_category(id, user_id, connection).map(|_| ())
}

pub fn update_category(
    id: CategoryId,
    name: &str,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .query_row(
            "UPDATE categorias SET nome = ?1 WHERE id = ?2 AND usuario_id = ?3
            RETURNING id, nome, usuario_id",
            params![name, id, user_id.as_i64()],
            map_row_to_category,
        )
        .optional()?
        .ok_or(Error::NotFound("category"))
}

/// Delete a category that no transaction refers to.
///
/// # Errors
///
/// Returns a:
/// - [Error::NotFound] if the category does not exist or belongs to another user,
/// - [Error::ResourceInUse] if transactions still refer to the category.
pub fn delete_category(
    id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected: RowsAffected = connection
        .execute(
            "DELETE FROM categorias WHERE id = ?1 AND usuario_id = ?2",
            params![id, user_id.as_i64()],
        )
        .map_err(|error| map_delete_error(error, "category"))?;

    if rows_affected == 0 {
        return Err(Error::NotFound("category"));
    }

    Ok(())
}
