use std::collections::{HashMap, HashSet};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
        permissions::ActionType,
    },
    config::Settings,
    constants::AVATAR_FOLDER,
    error::{QueryError, RecipeError},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    schema::{User, UserDraft, UserRow, UserView, Uuid},
    storage::media::MediaStorage,
    validation::validate_user_draft,
};

use potion::HtmlError;
use sqlx::{Pool, Postgres};

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_users_by_ids(
    pool: &Pool<Postgres>,
    user_ids: &[Uuid],
) -> Result<HashMap<Uuid, User>, potion::Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|user| (user.id, user)).collect())
}

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub(crate) async fn require_user(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<User, potion::Error> {
    get_user_by_id(pool, user_id).await?.ok_or_else(|| {
        RecipeError::NotFound(String::from("No user exists with specified id")).into()
    })
}

/// Creates an account from `draft`. The password is stored hashed.
pub async fn register_user(
    draft: &UserDraft,
    pool: &Pool<Postgres>,
) -> Result<UserView, potion::Error> {
    validate_user_draft(draft)?;

    let taken: (Option<bool>, Option<bool>) = sqlx::query_as(
        "
        SELECT BOOL_OR(LOWER(email) = LOWER($1)), BOOL_OR(username = $2)
        FROM users
        WHERE LOWER(email) = LOWER($1) OR username = $2
    ",
    )
    .bind(&draft.email)
    .bind(&draft.username)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    let conflict = match taken {
        (Some(true), _) => Some("A user with that email already exists."),
        (_, Some(true)) => Some("A user with that username already exists."),
        _ => None,
    };
    if let Some(message) = conflict {
        return Err(RecipeError::Conflict(String::from(message)).into());
    }

    let password = hash_password(&draft.password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        HtmlError::InternalServerError.new("Failed to register user")
    })?;

    let user: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(&draft.email)
    .bind(&draft.username)
    .bind(&draft.first_name)
    .bind(&draft.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let user = user.ok_or_else(|| RecipeError::Conflict(String::from("User already exists.")))?;
    log::info!("Registered user {} ({})", user.username, user.id);

    Ok(UserView::project(&user, false))
}

/// Exchanges credentials for a signed session token.
pub async fn login_user(
    email: &str,
    password: &str,
    settings: &Settings,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    let Some(user) = get_user_by_email(pool, email).await? else {
        return Err(HtmlError::InvalidRequest.new("Invalid credentials"));
    };

    let authenticated = verify_password(password, &user.password).map_err(|e| {
        log::error!("Stored password hash of user {} is unreadable: {e}", user.id);
        HtmlError::InternalServerError.new("Failed to verify credentials")
    })?;
    if !authenticated {
        return Err(HtmlError::InvalidRequest.new("Invalid credentials"));
    }

    generate_jwt_session(&user, &settings.jwt_secret, settings.jwt_lifetime)
}

pub async fn is_subscribed(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

/// The subset of `author_ids` the viewer follows.
pub(crate) async fn viewer_subscriptions_among(
    viewer: Option<&SessionData>,
    author_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, potion::Error> {
    let Some(session) = viewer else {
        return Ok(HashSet::new());
    };

    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = ANY($2)",
    )
    .bind(session.user_id)
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// `is_subscribed` is always false for anonymous viewers.
pub async fn viewer_is_subscribed(
    viewer: Option<&SessionData>,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    match viewer {
        Some(session) => is_subscribed(session.user_id, author_id, pool).await,
        None => Ok(false),
    }
}

pub async fn get_user_view(
    user_id: Uuid,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<UserView, potion::Error> {
    let user = require_user(pool, user_id).await?;
    let subscribed = viewer_is_subscribed(viewer, user.id, pool).await?;

    Ok(UserView::project(&user, subscribed))
}

pub async fn fetch_users(
    page: PageRequest,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Page<UserView>, potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2",
    )
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);

    let users: Vec<User> = rows.into_iter().map(User::from).collect();
    let user_ids: Vec<Uuid> = users.iter().map(|user| user.id).collect();
    let subscribed = viewer_subscriptions_among(viewer, &user_ids, pool).await?;

    let page = Page::from_rows(users, total_count, page)
        .map(|user| UserView::project(&user, subscribed.contains(&user.id)));

    Ok(page)
}

/// Replaces the caller's avatar and returns its new URL.
pub async fn set_avatar(
    session: &SessionData,
    data: &str,
    storage: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    session.authenticate(ActionType::ManageOwnProfile)?;
    let user = require_user(pool, session.user_id).await?;

    let url = storage.save_base64_image(data, AVATAR_FOLDER, "avatar").await?;

    sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
        .bind(&url)
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if let Some(previous) = user.avatar {
        storage.delete(&previous).await;
    }

    Ok(url)
}

pub async fn delete_avatar(
    session: &SessionData,
    storage: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnProfile)?;
    let user = require_user(pool, session.user_id).await?;

    sqlx::query("UPDATE users SET avatar = NULL WHERE id = $1")
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if let Some(previous) = user.avatar {
        storage.delete(&previous).await;
    }

    Ok(())
}

pub async fn set_password(
    session: &SessionData,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnProfile)?;
    let user = require_user(pool, session.user_id).await?;

    let authenticated = verify_password(current_password, &user.password).unwrap_or(false);
    if !authenticated {
        return Err(RecipeError::validation("current_password", "Wrong password.").into());
    }
    if new_password.is_empty() {
        return Err(RecipeError::validation("new_password", "Password cannot be empty.").into());
    }

    let password = hash_password(new_password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        HtmlError::InternalServerError.new("Failed to set password")
    })?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
