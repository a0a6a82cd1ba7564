use std::{convert::Infallible, sync::Arc};

use potion::HtmlError;
use sqlx::{Pool, Postgres};
use warp::{
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        Response, StatusCode, Uri,
    },
    reject::Rejection,
    Filter, Reply,
};

use crate::{
    actions::{
        add_to_favorites, add_to_shopping_cart, download_shopping_list, fetch_recipes,
        fetch_subscriptions, get_recipe_full, get_recipe_link, list_tags,
        remove_from_favorites, remove_from_shopping_cart, resolve_short_link, search_ingredients,
        subscribe, unsubscribe,
    },
    config::Settings,
    constants::{RECIPE_COUNT_PER_PAGE, USER_COUNT_PER_PAGE},
    form::{Form, FormData},
    jwt::SessionData,
    middleware::{with_possible_session, with_session, Unauthorized},
    schema::Uuid,
};

fn reject(e: potion::Error) -> Rejection {
    e.into()
}

fn with_pool(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (Pool<Postgres>,), Error = Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

fn with_settings(
    settings: Arc<Settings>,
) -> impl Filter<Extract = (Arc<Settings>,), Error = Infallible> + Clone {
    warp::any().map(move || settings.clone())
}

fn no_content() -> impl Reply {
    warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT)
}

async fn redirect_short_link(code: String, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let path = resolve_short_link(&code, &pool).await.map_err(reject)?;
    let uri: Uri = path
        .parse()
        .map_err(|_| reject(HtmlError::InternalServerError.new("Invalid redirect target")))?;

    Ok(warp::redirect::found(uri))
}

async fn list_recipes(
    data: FormData,
    viewer: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(data);
    let filter = form.recipe_filter().map_err(|e| reject(e.into()))?;
    let page = form
        .page_request(RECIPE_COUNT_PER_PAGE)
        .map_err(|e| reject(e.into()))?;

    let page = fetch_recipes(&filter, page, viewer.as_ref(), &pool)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&page))
}

async fn show_recipe(
    id: Uuid,
    viewer: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = get_recipe_full(id, viewer.as_ref(), &pool)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&recipe))
}

async fn recipe_link(
    id: Uuid,
    settings: Arc<Settings>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let link = get_recipe_link(id, &settings.site_url, &pool)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&link))
}

async fn favorite(
    id: Uuid,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = add_to_favorites(&session, id, &pool).await.map_err(reject)?;
    Ok(warp::reply::with_status(warp::reply::json(&recipe), StatusCode::CREATED))
}

async fn unfavorite(
    id: Uuid,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    remove_from_favorites(&session, id, &pool).await.map_err(reject)?;
    Ok(no_content())
}

async fn add_to_cart(
    id: Uuid,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = add_to_shopping_cart(&session, id, &pool).await.map_err(reject)?;
    Ok(warp::reply::with_status(warp::reply::json(&recipe), StatusCode::CREATED))
}

async fn remove_from_cart(
    id: Uuid,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    remove_from_shopping_cart(&session, id, &pool).await.map_err(reject)?;
    Ok(no_content())
}

async fn download_cart(
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let file = download_shopping_list(&session, &pool).await.map_err(reject)?;

    Response::builder()
        .header(CONTENT_TYPE, file.content_type)
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.file_name),
        )
        .body(file.bytes)
        .map_err(|_| reject(HtmlError::InternalServerError.new("Failed to build response")))
}

async fn ingredients(data: FormData, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(data);
    let list = search_ingredients(form.get_str("name"), &pool)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&list))
}

async fn tags(pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let list = list_tags(&pool).await.map_err(reject)?;
    Ok(warp::reply::json(&list))
}

async fn subscriptions(
    data: FormData,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(data);
    let page = form
        .page_request(USER_COUNT_PER_PAGE)
        .map_err(|e| reject(e.into()))?;

    let page = fetch_subscriptions(&session, page, form.recipes_limit(), &pool)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&page))
}

async fn follow(
    id: Uuid,
    data: FormData,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let form = Form::from_data(data);
    let author = subscribe(&session, id, form.recipes_limit(), &pool)
        .await
        .map_err(reject)?;
    Ok(warp::reply::with_status(warp::reply::json(&author), StatusCode::CREATED))
}

async fn unfollow(
    id: Uuid,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    unsubscribe(&session, id, &pool).await.map_err(reject)?;
    Ok(no_content())
}

/// Turns a missing or invalid session into a 401; other rejections pass through.
pub async fn recover(rejection: Rejection) -> Result<impl Reply, Rejection> {
    if rejection.find::<Unauthorized>().is_some() {
        let body = serde_json::json!({
            "detail": "Authentication credentials were not provided."
        });
        return Ok(warp::reply::with_status(
            warp::reply::json(&body),
            StatusCode::UNAUTHORIZED,
        ));
    }
    Err(rejection)
}

/// The short-link redirect plus the recipe, relationship, and shopping list endpoints.
pub fn routes(
    pool: Pool<Postgres>,
    settings: Arc<Settings>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let secret = settings.jwt_secret.clone();

    let short_link = warp::get()
        .and(warp::path!("s" / String))
        .and(with_pool(pool.clone()))
        .and_then(redirect_short_link);

    let download = warp::get()
        .and(warp::path!("api" / "recipes" / "download_shopping_cart"))
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(download_cart);

    let recipes = warp::get()
        .and(warp::path!("api" / "recipes"))
        .and(warp::query::<FormData>())
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(list_recipes);

    let recipe = warp::get()
        .and(warp::path!("api" / "recipes" / Uuid))
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(show_recipe);

    let link = warp::get()
        .and(warp::path!("api" / "recipes" / Uuid / "get-link"))
        .and(with_settings(settings.clone()))
        .and(with_pool(pool.clone()))
        .and_then(recipe_link);

    let favorites = warp::path!("api" / "recipes" / Uuid / "favorite")
        .and(
            warp::post()
                .and(with_session(secret.clone()))
                .and(with_pool(pool.clone()))
                .and_then(favorite)
                .or(warp::delete()
                    .and(with_session(secret.clone()))
                    .and(with_pool(pool.clone()))
                    .and_then(unfavorite)),
        );

    let cart = warp::path!("api" / "recipes" / Uuid / "shopping_cart")
        .and(
            warp::post()
                .and(with_session(secret.clone()))
                .and(with_pool(pool.clone()))
                .and_then(add_to_cart)
                .or(warp::delete()
                    .and(with_session(secret.clone()))
                    .and(with_pool(pool.clone()))
                    .and_then(remove_from_cart)),
        );

    let ingredient_search = warp::get()
        .and(warp::path!("api" / "ingredients"))
        .and(warp::query::<FormData>())
        .and(with_pool(pool.clone()))
        .and_then(ingredients);

    let tag_list = warp::get()
        .and(warp::path!("api" / "tags"))
        .and(with_pool(pool.clone()))
        .and_then(tags);

    let subscription_list = warp::get()
        .and(warp::path!("api" / "users" / "subscriptions"))
        .and(warp::query::<FormData>())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(subscriptions);

    let subscription = warp::path!("api" / "users" / Uuid / "subscribe")
        .and(
            warp::post()
                .and(warp::query::<FormData>())
                .and(with_session(secret.clone()))
                .and(with_pool(pool.clone()))
                .and_then(follow)
                .or(warp::delete()
                    .and(with_session(secret))
                    .and(with_pool(pool))
                    .and_then(unfollow)),
        );

    short_link
        .or(download)
        .or(recipes)
        .or(recipe)
        .or(link)
        .or(favorites)
        .or(cart)
        .or(ingredient_search)
        .or(tag_list)
        .or(subscription_list)
        .or(subscription)
        .recover(recover)
}
