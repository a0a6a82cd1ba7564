use crate::{
    authentication::permissions::ActionType,
    error::{QueryError, RecipeError},
    jwt::SessionData,
    schema::{Ingredient, IngredientDraft, Uuid},
    validation::validate_ingredient_draft,
};

use sqlx::{Pool, Postgres};

/// Escapes `%`, `_` and `\` so the term matches literally inside LIKE.
fn like_prefix(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 1);
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub async fn create_ingredient(
    session: &SessionData,
    draft: &IngredientDraft,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, potion::Error> {
    session.authenticate(ActionType::ManageIngredients)?;
    validate_ingredient_draft(draft)?;

    let row: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(draft.name.trim())
    .bind(draft.measurement_unit.trim())
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| {
        RecipeError::Conflict(String::from(
            "Ingredient with this name and measurement unit already exists.",
        ))
        .into()
    })
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Ingredient, potion::Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.ok_or_else(|| {
        RecipeError::NotFound(String::from("No ingredient exists with specified id")).into()
    })
}

/// Case-insensitive prefix search ordered by name. An empty term lists all.
pub async fn search_ingredients(
    term: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let pattern = like_prefix(term.unwrap_or("").trim());

    let rows: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE name ILIKE $1 ESCAPE '\\' ORDER BY name, id",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Ids among `ids` that exist, used to check recipe references.
pub async fn existing_ingredient_ids(
    ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<Uuid>, potion::Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Loads a batch of ingredients, skipping ones already present.
/// Returns `(created, skipped)`.
pub async fn load_ingredients(
    drafts: &[IngredientDraft],
    pool: &Pool<Postgres>,
) -> Result<(u64, u64), potion::Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let mut created = 0;
    let mut skipped = 0;
    for draft in drafts {
        if let Err(e) = validate_ingredient_draft(draft) {
            log::warn!("Skipping ingredient '{}': {e}", draft.name);
            skipped += 1;
            continue;
        }

        let query = sqlx::query(
            "
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
        ",
        )
        .bind(draft.name.trim())
        .bind(draft.measurement_unit.trim())
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

        if query.rows_affected() > 0 {
            created += 1;
        } else {
            skipped += 1;
        }
    }

    tr.commit().await.map_err(QueryError::from)?;

    Ok((created, skipped))
}
