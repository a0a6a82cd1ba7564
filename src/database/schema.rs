use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    constants::{
        MAX_AMOUNT, MAX_COOKING_TIME, MAX_LENGTH_EMAIL, MAX_LENGTH_INGREDIENT, MAX_LENGTH_NAME,
        MAX_LENGTH_RECIPE_NAME, MAX_LENGTH_TAG, MAX_LENGTH_USERNAME, MIN_AMOUNT, MIN_COOKING_TIME,
    },
    validation::{allowed_username, not_blank, SLUG_REGEX, USERNAME_REGEX},
};

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub date_joined: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub date_joined: DateTime<Utc>,

    pub count: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            password: row.password,
            avatar: row.avatar,
            role: row.role,
            date_joined: row.date_joined,
        }
    }
}

/// Fields accepted when registering an account.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserDraft {
    #[validate(email(message = "Enter a valid email address."))]
    #[validate(length(max = MAX_LENGTH_EMAIL, message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(
        min = 1,
        max = MAX_LENGTH_USERNAME,
        message = "Username must be 1 to 150 characters long."
    ))]
    #[validate(regex(
        path = *USERNAME_REGEX,
        message = "Enter a valid username. It may contain only letters, numbers, \
                   and @/./+/-/_ characters."
    ))]
    #[validate(custom(function = "allowed_username"))]
    pub username: String,

    #[validate(length(max = MAX_LENGTH_NAME, message = "Must be at most 150 characters long."))]
    #[validate(custom(function = "not_blank", message = "First name cannot be empty."))]
    pub first_name: String,

    #[validate(length(max = MAX_LENGTH_NAME, message = "Must be at most 150 characters long."))]
    #[validate(custom(function = "not_blank", message = "Last name cannot be empty."))]
    pub last_name: String,

    #[validate(length(min = 1, message = "Password cannot be empty."))]
    pub password: String,
}

/// Public view of a user, as seen by the (possibly anonymous) viewer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserView {
    pub fn project(user: &User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email.to_owned(),
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
            avatar: user.avatar.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserWithRecipes {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<RecipeMinified>,
    pub recipes_count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

/// Ingredient fixture entry, as found in the ingredient JSON files.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Validate)]
pub struct IngredientDraft {
    #[validate(length(
        max = MAX_LENGTH_INGREDIENT,
        message = "Must be at most 200 characters long."
    ))]
    #[validate(custom(function = "not_blank", message = "Name cannot be empty."))]
    pub name: String,

    #[validate(length(
        max = MAX_LENGTH_INGREDIENT,
        message = "Must be at most 200 characters long."
    ))]
    #[validate(custom(function = "not_blank", message = "Measurement unit cannot be empty."))]
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Validate)]
pub struct TagDraft {
    #[validate(length(max = MAX_LENGTH_TAG, message = "Must be at most 200 characters long."))]
    #[validate(custom(function = "not_blank", message = "Name cannot be empty."))]
    pub name: String,

    #[validate(length(
        min = 1,
        max = MAX_LENGTH_TAG,
        message = "Must be 1 to 200 characters long."
    ))]
    #[validate(regex(
        path = *SLUG_REGEX,
        message = "Enter a valid slug consisting of letters, numbers, underscores or hyphens."
    ))]
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub short_link: String,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub short_link: String,
    pub pub_date: DateTime<Utc>,

    pub count: i64,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            name: row.name,
            image: row.image,
            text: row.text,
            cooking_time: row.cooking_time,
            short_link: row.short_link,
            pub_date: row.pub_date,
        }
    }
}

/// One ingredient line of a recipe, joined with the ingredient itself.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecipePart {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Condensed recipe used in list contexts and relationship responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecipeMinified {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeMinified {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeFull {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipePart>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeFull {
    pub fn project(
        recipe: &Recipe,
        author: UserView,
        tags: Vec<Tag>,
        ingredients: Vec<RecipePart>,
        is_favorited: bool,
        is_in_shopping_cart: bool,
    ) -> Self {
        Self {
            id: recipe.id,
            tags,
            author,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            text: recipe.text.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Validate)]
pub struct IngredientAmount {
    pub id: Uuid,
    #[validate(range(
        min = MIN_AMOUNT,
        max = MAX_AMOUNT,
        message = "Ingredient amount must be between 1 and 32000."
    ))]
    pub amount: i32,
}

/// Recipe write payload. `image` is a base64 data URL; it may be omitted on
/// update to keep the stored image.
///
/// The derived checks cover single fields only. List and image rules live in
/// [`validate_recipe_draft`](crate::validation::validate_recipe_draft).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecipeDraft {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
    pub image: Option<String>,

    #[validate(length(
        max = MAX_LENGTH_RECIPE_NAME,
        message = "Name cannot be longer than 200 characters."
    ))]
    #[validate(custom(function = "not_blank", message = "Name cannot be empty."))]
    pub name: String,

    #[validate(custom(function = "not_blank", message = "Text cannot be empty."))]
    pub text: String,

    #[validate(range(
        min = MIN_COOKING_TIME,
        max = MAX_COOKING_TIME,
        message = "Cooking time must be between 1 and 32000."
    ))]
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShortLink {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

/// An ingredient line of a recipe sitting in someone's shopping cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn recipe() -> Recipe {
        Recipe {
            id: 7,
            author_id: 2,
            name: String::from("Pancakes"),
            image: String::from("/media/recipes/images/a.png"),
            text: String::from("Mix and fry."),
            cooking_time: 20,
            short_link: String::from("aB3xY9"),
            pub_date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[fixture]
    fn author() -> User {
        User {
            id: 2,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            password: String::from("$argon2id$hash"),
            avatar: None,
            role: UserRole::User,
            date_joined: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[rstest]
    fn test_minified_projection(recipe: Recipe) {
        let minified = RecipeMinified::from(&recipe);
        assert_eq!(
            serde_json::to_value(&minified).unwrap(),
            serde_json::json!({
                "id": 7,
                "name": "Pancakes",
                "image": "/media/recipes/images/a.png",
                "cooking_time": 20
            })
        );
    }

    #[rstest]
    fn test_full_projection_keeps_short_link_private(recipe: Recipe, author: User) {
        let full = RecipeFull::project(
            &recipe,
            UserView::project(&author, true),
            vec![],
            vec![RecipePart {
                id: 1,
                name: String::from("Flour"),
                measurement_unit: String::from("g"),
                amount: 200,
            }],
            false,
            true,
        );
        let value = serde_json::to_value(&full).unwrap();

        assert_eq!(value["author"]["is_subscribed"], true);
        assert_eq!(value["ingredients"][0]["amount"], 200);
        assert_eq!(value["is_in_shopping_cart"], true);
        assert!(value.get("short_link").is_none());
    }

    #[rstest]
    fn test_user_password_is_never_serialized(author: User) {
        let value = serde_json::to_value(&author).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["role"], "user");
    }

    #[rstest]
    fn test_user_with_recipes_flattens_user(recipe: Recipe, author: User) {
        let view = UserWithRecipes {
            user: UserView::project(&author, false),
            recipes: vec![RecipeMinified::from(&recipe)],
            recipes_count: 3,
        };
        let value = serde_json::to_value(&view).unwrap();

        assert_eq!(value["username"], "cook");
        assert_eq!(value["recipes"][0]["id"], 7);
        assert_eq!(value["recipes_count"], 3);
    }

    #[rstest]
    fn test_short_link_payload_key() {
        let link = ShortLink {
            short_link: String::from("http://localhost:8000/s/aB3xY9"),
        };
        assert_eq!(
            serde_json::to_value(&link).unwrap(),
            serde_json::json!({ "short-link": "http://localhost:8000/s/aB3xY9" })
        );
    }
}
