use std::collections::HashSet;

use crate::{
    authentication::permissions::ActionType,
    error::{QueryError, RecipeError},
    jwt::SessionData,
    schema::{RecipeMinified, Uuid},
};

use super::recipes::require_recipe;

use sqlx::{Pool, Postgres};

pub async fn is_favorited(
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND recipe_id = $2)",
    )
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

/// The subset of `recipe_ids` the viewer has favorited. Always empty for
/// anonymous viewers.
pub(crate) async fn viewer_favorites_among(
    viewer: Option<&SessionData>,
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, potion::Error> {
    let Some(session) = viewer else {
        return Ok(HashSet::new());
    };

    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT recipe_id FROM favorites WHERE user_id = $1 AND recipe_id = ANY($2)")
            .bind(session.user_id)
            .bind(recipe_ids)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn add_to_favorites(
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeMinified, potion::Error> {
    session.authenticate(ActionType::ManageOwnFavorites)?;
    let recipe = require_recipe(recipe_id, pool).await?;

    let query = sqlx::query(
        "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(recipe.id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if query.rows_affected() == 0 {
        return Err(RecipeError::Conflict(String::from("Recipe is already in favorites.")).into());
    }

    Ok(RecipeMinified::from(&recipe))
}

pub async fn remove_from_favorites(
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnFavorites)?;
    let recipe = require_recipe(recipe_id, pool).await?;

    let query = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(session.user_id)
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if query.rows_affected() == 0 {
        return Err(RecipeError::NotPresent(String::from("Recipe is not in favorites.")).into());
    }

    Ok(())
}
