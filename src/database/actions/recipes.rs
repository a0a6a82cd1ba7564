use std::collections::{HashMap, HashSet};

use crate::{
    authentication::permissions::ActionType,
    constants::RECIPE_IMAGE_FOLDER,
    error::{QueryError, RecipeError},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    schema::{
        Recipe, RecipeDraft, RecipeFilter, RecipeFull, RecipeMinified, RecipePart, RecipeRow,
        ShortLink, Tag, User, UserView, Uuid,
    },
    short_link::{recipe_path, short_link_url, ShortLinkGenerator},
    storage::media::MediaStorage,
    validation::{missing_reference, validate_recipe_draft, DraftMode},
};

use super::{
    favorites::viewer_favorites_among,
    ingredients::existing_ingredient_ids,
    shopping_cart::viewer_cart_among,
    tags::{existing_tag_ids, list_tags_for_recipes},
    users::{get_users_by_ids, viewer_subscriptions_among},
};

use potion::HtmlError;
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub(crate) async fn require_recipe(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    get_recipe(id, pool).await?.ok_or_else(|| {
        RecipeError::NotFound(String::from("No recipe exists with specified id")).into()
    })
}

/// Loads a recipe the caller is allowed to change: their own, or any recipe
/// for roles with `ManageAllRecipes`.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = require_recipe(id, pool).await?;

    match session.authenticate(ActionType::ManageAllRecipes) {
        Ok(_) => Ok(recipe),
        Err(_) if recipe.author_id == session.user_id => Ok(recipe),
        Err(_) => Err(RecipeError::Forbidden(String::from(
            "Only the author may change this recipe.",
        ))
        .into()),
    }
}

/// Ingredient lines of every recipe in `recipe_ids`, keyed by recipe.
pub async fn list_parts_for_recipes(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<RecipePart>>, potion::Error> {
    let rows: Vec<(Uuid, Uuid, String, String, i32)> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut parts: HashMap<Uuid, Vec<RecipePart>> = HashMap::new();
    for (recipe_id, id, name, measurement_unit, amount) in rows {
        parts.entry(recipe_id).or_default().push(RecipePart {
            id,
            name,
            measurement_unit,
            amount,
        });
    }
    Ok(parts)
}

pub async fn list_recipe_parts(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, potion::Error> {
    let mut parts = list_parts_for_recipes(&[recipe_id], pool).await?;
    Ok(parts.remove(&recipe_id).unwrap_or_default())
}

/// Every ingredient and tag id in `draft` must exist.
async fn check_references(
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let requested: Vec<Uuid> = draft.ingredients.iter().map(|i| i.id).collect();
    let known = existing_ingredient_ids(&requested, pool).await?;
    if let Some(id) = missing_reference(&requested, &known) {
        return Err(RecipeError::validation(
            "ingredients",
            format!("Ingredient with id {id} does not exist."),
        )
        .into());
    }

    let known = existing_tag_ids(&draft.tags, pool).await?;
    if let Some(id) = missing_reference(&draft.tags, &known) {
        let message = format!("Tag with id {id} does not exist.");
        return Err(RecipeError::validation("tags", message).into());
    }

    Ok(())
}

async fn insert_relations(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    draft: &RecipeDraft,
) -> Result<(), potion::Error> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    builder.push_values(draft.tags.iter(), |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    builder.push_values(draft.ingredients.iter(), |mut row, ingredient| {
        row.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });
    builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn insert_recipe(
    session: &SessionData,
    draft: &RecipeDraft,
    image: &str,
    codes: Vec<String>,
    generator: ShortLinkGenerator,
    pool: &Pool<Postgres>,
) -> Result<Uuid, potion::Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let mut recipe_id = None;
    for code in codes {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "
            INSERT INTO recipes (author_id, name, image, text, cooking_time, short_link)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (short_link) DO NOTHING RETURNING id
        ",
        )
        .bind(session.user_id)
        .bind(draft.name.trim())
        .bind(image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .bind(&code)
        .fetch_optional(&mut *tr)
        .await
        .map_err(QueryError::from)?;

        match row {
            Some((id,)) => {
                recipe_id = Some(id);
                break;
            }
            None => log::trace!("> Short link {code} taken, retrying"),
        }
    }

    let recipe_id = recipe_id.ok_or_else(|| generator.exhausted())?;
    insert_relations(&mut tr, recipe_id, draft).await?;

    tr.commit().await.map_err(QueryError::from)?;
    Ok(recipe_id)
}

pub async fn create_recipe(
    session: &SessionData,
    draft: &RecipeDraft,
    storage: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<RecipeFull, potion::Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    validate_recipe_draft(draft, DraftMode::Create)?;
    check_references(draft, pool).await?;

    let image = draft
        .image
        .as_deref()
        .ok_or_else(|| RecipeError::validation("image", "Image field is required."))?;
    let image = storage.save_base64_image(image, RECIPE_IMAGE_FOLDER, "image").await?;

    let generator = ShortLinkGenerator::default();
    let codes: Vec<String> = generator.candidates(&mut rand::thread_rng()).collect();

    let recipe_id = match insert_recipe(session, draft, &image, codes, generator, pool).await {
        Ok(id) => id,
        Err(e) => {
            storage.delete(&image).await;
            return Err(e);
        }
    };

    log::info!("User {} created recipe {recipe_id}", session.user_id);
    get_recipe_full(recipe_id, Some(session), pool).await
}

async fn replace_recipe(
    recipe_id: Uuid,
    draft: &RecipeDraft,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    sqlx::query(
        "
        UPDATE recipes
        SET name = $1, image = $2, text = $3, cooking_time = $4
        WHERE id = $5
    ",
    )
    .bind(draft.name.trim())
    .bind(image)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(recipe_id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    insert_relations(&mut tr, recipe_id, draft).await?;

    tr.commit().await.map_err(QueryError::from)?;
    Ok(())
}

/// Replaces the recipe's fields, tags and ingredient lines in one
/// transaction. The short link is left untouched. Without `draft.image` the
/// stored image is kept.
pub async fn update_recipe(
    id: Uuid,
    session: &SessionData,
    draft: &RecipeDraft,
    storage: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<RecipeFull, potion::Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;
    validate_recipe_draft(draft, DraftMode::Replace)?;
    check_references(draft, pool).await?;

    let new_image = match draft.image.as_deref() {
        Some(data) => Some(storage.save_base64_image(data, RECIPE_IMAGE_FOLDER, "image").await?),
        None => None,
    };
    let image = new_image.as_deref().unwrap_or(&recipe.image);

    if let Err(e) = replace_recipe(recipe.id, draft, image, pool).await {
        if let Some(new_image) = new_image.as_deref() {
            storage.delete(new_image).await;
        }
        return Err(e);
    }

    if new_image.is_some() {
        storage.delete(&recipe.image).await;
    }

    log::info!("User {} updated recipe {}", session.user_id, recipe.id);
    get_recipe_full(recipe.id, Some(session), pool).await
}

pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    storage: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    storage.delete(&recipe.image).await;
    log::info!("User {} deleted recipe {}", session.user_id, recipe.id);

    Ok(())
}

/// Everything a [`RecipeFull`] needs besides the recipe row, loaded for a
/// batch of recipes with one query per relation.
#[derive(Default)]
struct RecipeRelations {
    authors: HashMap<Uuid, User>,
    subscribed: HashSet<Uuid>,
    tags: HashMap<Uuid, Vec<Tag>>,
    parts: HashMap<Uuid, Vec<RecipePart>>,
    favorited: HashSet<Uuid>,
    in_cart: HashSet<Uuid>,
}

impl RecipeRelations {
    async fn load(
        recipes: &[Recipe],
        viewer: Option<&SessionData>,
        pool: &Pool<Postgres>,
    ) -> Result<Self, potion::Error> {
        if recipes.is_empty() {
            return Ok(Self::default());
        }

        let recipe_ids: Vec<Uuid> = recipes.iter().map(|recipe| recipe.id).collect();
        let mut author_ids: Vec<Uuid> = recipes.iter().map(|recipe| recipe.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        Ok(Self {
            authors: get_users_by_ids(pool, &author_ids).await?,
            subscribed: viewer_subscriptions_among(viewer, &author_ids, pool).await?,
            tags: list_tags_for_recipes(&recipe_ids, pool).await?,
            parts: list_parts_for_recipes(&recipe_ids, pool).await?,
            favorited: viewer_favorites_among(viewer, &recipe_ids, pool).await?,
            in_cart: viewer_cart_among(viewer, &recipe_ids, pool).await?,
        })
    }

    /// Moves the recipe's tags and parts out of the batch.
    fn project(&mut self, recipe: &Recipe) -> Result<RecipeFull, potion::Error> {
        let author = self.authors.get(&recipe.author_id).ok_or_else(|| {
            RecipeError::NotFound(String::from("No user exists with specified id"))
        })?;
        let author = UserView::project(author, self.subscribed.contains(&author.id));

        Ok(RecipeFull::project(
            recipe,
            author,
            self.tags.remove(&recipe.id).unwrap_or_default(),
            self.parts.remove(&recipe.id).unwrap_or_default(),
            self.favorited.contains(&recipe.id),
            self.in_cart.contains(&recipe.id),
        ))
    }
}

/// Builds the full read view of `recipe` for `viewer`.
pub async fn project_recipe(
    recipe: &Recipe,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeFull, potion::Error> {
    RecipeRelations::load(std::slice::from_ref(recipe), viewer, pool)
        .await?
        .project(recipe)
}

pub async fn get_recipe_full(
    id: Uuid,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeFull, potion::Error> {
    let recipe = require_recipe(id, pool).await?;
    project_recipe(&recipe, viewer, pool).await
}

/// Newest first. Favorite and cart filters only apply to authenticated
/// viewers; an anonymous viewer asking for either gets an empty page.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    page: PageRequest,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeFull>, potion::Error> {
    if viewer.is_none()
        && (filter.is_favorited == Some(true) || filter.is_in_shopping_cart == Some(true))
    {
        return Ok(Page::no_rows());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if !filter.tags.is_empty() {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(author) = filter.author {
        builder.push(" AND r.author_id = ").push_bind(author);
    }

    if let Some(session) = viewer {
        for (flag, table) in [
            (filter.is_favorited, "favorites"),
            (filter.is_in_shopping_cart, "shopping_cart"),
        ] {
            let Some(flag) = flag else {
                continue;
            };
            builder
                .push(if flag { " AND EXISTS" } else { " AND NOT EXISTS" })
                .push(format!(" (SELECT 1 FROM {table} x WHERE x.recipe_id = r.id"))
                .push(" AND x.user_id = ")
                .push_bind(session.user_id)
                .push(")");
        }
    }

    builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let recipes: Vec<Recipe> = rows.into_iter().map(Recipe::from).collect();

    let mut relations = RecipeRelations::load(&recipes, viewer, pool).await?;
    let results = recipes
        .iter()
        .map(|recipe| relations.project(recipe))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::from_rows(results, total_count, page))
}

/// Up to `limit` of the author's newest recipes, and how many they have in total.
pub async fn list_author_recipes(
    author_id: Uuid,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<(Vec<RecipeMinified>, i64), potion::Error> {
    let recipes: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = $1 ORDER BY pub_date DESC, id DESC LIMIT $2",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok((recipes.iter().map(RecipeMinified::from).collect(), count.0))
}

pub async fn get_recipe_link(
    id: Uuid,
    site_url: &str,
    pool: &Pool<Postgres>,
) -> Result<ShortLink, potion::Error> {
    let recipe = require_recipe(id, pool).await?;

    Ok(ShortLink {
        short_link: short_link_url(site_url, &recipe.short_link),
    })
}

/// Maps a short code to the recipe page it stands for.
pub async fn resolve_short_link(
    code: &str,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    if !ShortLinkGenerator::default().is_valid_code(code) {
        return Err(HtmlError::InvalidRequest.new("Malformed short link"));
    }

    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM recipes WHERE short_link = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    match row {
        Some((id,)) => Ok(recipe_path(id)),
        None => {
            let message = String::from("No recipe exists with specified short link");
            Err(RecipeError::NotFound(message).into())
        }
    }
}
