use crate::{
    authentication::permissions::ActionType,
    error::{QueryError, RecipeError},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    schema::{User, UserRow, UserView, UserWithRecipes, Uuid},
};

use super::{recipes::list_author_recipes, users::require_user};

use sqlx::{Pool, Postgres};

/// `author` as seen by someone subscribed to them, with at most
/// `recipes_limit` of their recipes.
pub async fn user_with_recipes(
    author: &User,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<UserWithRecipes, potion::Error> {
    let (recipes, recipes_count) = list_author_recipes(author.id, recipes_limit, pool).await?;

    Ok(UserWithRecipes {
        user: UserView::project(author, true),
        recipes,
        recipes_count,
    })
}

pub async fn subscribe(
    session: &SessionData,
    author_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<UserWithRecipes, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if session.user_id == author_id {
        return Err(RecipeError::validation("author", "Cannot subscribe to yourself.").into());
    }

    let author = require_user(pool, author_id).await?;

    let query = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(author.id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if query.rows_affected() == 0 {
        return Err(RecipeError::Conflict(String::from("Already subscribed.")).into());
    }

    log::info!("User {} subscribed to {}", session.user_id, author.id);
    user_with_recipes(&author, recipes_limit, pool).await
}

pub async fn unsubscribe(
    session: &SessionData,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let author = require_user(pool, author_id).await?;

    let query = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if query.rows_affected() == 0 {
        return Err(RecipeError::NotPresent(String::from("Not subscribed.")).into());
    }

    Ok(())
}

/// Authors the caller follows, in the order they were followed.
pub async fn fetch_subscriptions(
    session: &SessionData,
    page: PageRequest,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Page<UserWithRecipes>, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);

    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        let author = User::from(row);
        results.push(user_with_recipes(&author, recipes_limit, pool).await?);
    }

    Ok(Page::from_rows(results, total_count, page))
}
