use std::collections::HashSet;

use crate::{
    authentication::permissions::ActionType,
    error::{QueryError, RecipeError},
    jwt::SessionData,
    schema::{CartLine, RecipeMinified, Uuid},
    shopping_list::{
        aggregate::aggregate,
        document::{render_shopping_list, DocumentSink, PageLayout, TextDocument},
    },
};

use super::recipes::require_recipe;

use sqlx::{Pool, Postgres};

/// A rendered shopping list, ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct ShoppingListFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: &'static str,
}

pub async fn is_in_shopping_cart(
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2)",
    )
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

pub(crate) async fn viewer_cart_among(
    viewer: Option<&SessionData>,
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, potion::Error> {
    let Some(session) = viewer else {
        return Ok(HashSet::new());
    };

    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT recipe_id FROM shopping_cart WHERE user_id = $1 AND recipe_id = ANY($2)",
    )
    .bind(session.user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn add_to_shopping_cart(
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeMinified, potion::Error> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;
    let recipe = require_recipe(recipe_id, pool).await?;

    let query = sqlx::query(
        "INSERT INTO shopping_cart (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(recipe.id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if query.rows_affected() == 0 {
        return Err(
            RecipeError::Conflict(String::from("Recipe is already in the shopping cart.")).into(),
        );
    }

    Ok(RecipeMinified::from(&recipe))
}

pub async fn remove_from_shopping_cart(
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;
    let recipe = require_recipe(recipe_id, pool).await?;

    let query = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(session.user_id)
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if query.rows_affected() == 0 {
        return Err(
            RecipeError::NotPresent(String::from("Recipe is not in the shopping cart.")).into(),
        );
    }

    Ok(())
}

/// Every ingredient line of every recipe in the user's cart, in cart order
/// and then recipe order.
pub async fn fetch_cart_lines(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartLine>, potion::Error> {
    let rows: Vec<CartLine> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
        ORDER BY sc.id, ri.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn download_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShoppingListFile, potion::Error> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let items = aggregate(fetch_cart_lines(session.user_id, pool).await?);
    log::trace!("> Shopping list of user {} has {} items", session.user_id, items.len());

    let document = TextDocument::default();
    let content_type = document.content_type();
    let file_name = document.file_name();

    Ok(ShoppingListFile {
        bytes: render_shopping_list(&items, document, PageLayout::default()),
        content_type,
        file_name,
    })
}
