use std::{borrow::Cow, collections::HashSet, sync::LazyLock};

use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    constants::{FORBIDDEN_USERNAMES, SLUG_PATTERN, USERNAME_PATTERN},
    error::RecipeError,
    schema::{IngredientDraft, RecipeDraft, TagDraft, UserDraft, Uuid},
};

pub(crate) static USERNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(USERNAME_PATTERN).expect("USERNAME_PATTERN: invalid regex pattern")
});

pub(crate) static SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(SLUG_PATTERN).expect("SLUG_PATTERN: invalid regex pattern")
});

/* field order decides which error is reported when several fields fail */
const RECIPE_FIELDS: &[&str] = &["cooking_time", "name", "text"];
const USER_FIELDS: &[&str] = &["email", "username", "first_name", "last_name", "password"];
const INGREDIENT_FIELDS: &[&str] = &["name", "measurement_unit"];
const TAG_FIELDS: &[&str] = &["name", "slug"];

/// Whether a draft creates a recipe or replaces an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    Create,
    Replace,
}

/// Rejects values made only of whitespace.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank")
            .with_message(Cow::Borrowed("This field cannot be blank.")));
    }
    Ok(())
}

pub(crate) fn allowed_username(username: &str) -> Result<(), ValidationError> {
    if FORBIDDEN_USERNAMES.contains(&username) {
        return Err(ValidationError::new("forbidden_username")
            .with_message(Cow::Owned(format!("Username '{username}' is not allowed."))));
    }
    Ok(())
}

/// Collapses derive-level errors into the first failing field of `order`.
fn first_error(errors: ValidationErrors, order: &[&str]) -> RecipeError {
    let fields = errors.field_errors();

    let field = order
        .iter()
        .map(|field| field.to_string())
        .find(|field| fields.contains_key(field.as_str()))
        .or_else(|| fields.keys().min().map(|field| field.to_string()))
        .unwrap_or_default();

    let message = fields
        .get(field.as_str())
        .and_then(|list| list.first())
        .map(|e| match &e.message {
            Some(message) => message.to_string(),
            None => e.code.to_string(),
        })
        .unwrap_or_else(|| String::from("Invalid value."));

    RecipeError::validation(&field, message)
}

fn check<T: Validate>(draft: &T, order: &[&str]) -> Result<(), RecipeError> {
    draft.validate().map_err(|errors| first_error(errors, order))
}

/// Checks the rules that need no database access. Reference checks
/// (ingredient and tag ids) run afterwards against the store, see
/// [`missing_reference`].
pub fn validate_recipe_draft(draft: &RecipeDraft, mode: DraftMode) -> Result<(), RecipeError> {
    if draft.ingredients.is_empty() {
        return Err(RecipeError::validation(
            "ingredients",
            "Ingredients field cannot be empty.",
        ));
    }

    let mut ingredient_ids = HashSet::new();
    for ingredient in draft.ingredients.iter() {
        if !ingredient_ids.insert(ingredient.id) {
            return Err(RecipeError::validation(
                "ingredients",
                "Duplicate ingredients are not allowed.",
            ));
        }
        check(ingredient, &["amount"])?;
    }

    if draft.tags.is_empty() {
        return Err(RecipeError::validation("tags", "Tags field cannot be empty."));
    }

    let tag_ids: HashSet<&Uuid> = draft.tags.iter().collect();
    if tag_ids.len() != draft.tags.len() {
        return Err(RecipeError::validation(
            "tags",
            "Duplicate tags are not allowed.",
        ));
    }

    check(draft, RECIPE_FIELDS)?;

    let has_image = draft
        .image
        .as_deref()
        .map(|image| !image.trim().is_empty())
        .unwrap_or(false);

    match (mode, has_image, draft.image.is_some()) {
        (DraftMode::Create, false, _) => Err(RecipeError::validation(
            "image",
            "Image field cannot be empty.",
        )),
        // an explicit empty image on update is still an empty image
        (DraftMode::Replace, false, true) => Err(RecipeError::validation(
            "image",
            "Image field cannot be empty.",
        )),
        _ => Ok(()),
    }
}

/// Returns the first requested id missing from `known`, in request order.
pub fn missing_reference(requested: &[Uuid], known: &[Uuid]) -> Option<Uuid> {
    let known: HashSet<&Uuid> = known.iter().collect();
    requested.iter().copied().find(|id| !known.contains(id))
}

pub fn validate_user_draft(draft: &UserDraft) -> Result<(), RecipeError> {
    check(draft, USER_FIELDS)
}

pub fn validate_ingredient_draft(draft: &IngredientDraft) -> Result<(), RecipeError> {
    check(draft, INGREDIENT_FIELDS)
}

pub fn validate_tag_draft(draft: &TagDraft) -> Result<(), RecipeError> {
    check(draft, TAG_FIELDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{MAX_AMOUNT, MAX_COOKING_TIME, MAX_LENGTH_RECIPE_NAME, MIN_COOKING_TIME},
        schema::IngredientAmount,
    };
    use rstest::{fixture, rstest};

    #[fixture]
    fn draft() -> RecipeDraft {
        RecipeDraft {
            ingredients: vec![
                IngredientAmount { id: 1, amount: 200 },
                IngredientAmount { id: 2, amount: 50 },
            ],
            tags: vec![1, 2],
            image: Some(String::from("data:image/png;base64,iVBORw0KGgo=")),
            name: String::from("Pancakes"),
            text: String::from("Mix and fry."),
            cooking_time: 20,
        }
    }

    #[fixture]
    fn user() -> UserDraft {
        UserDraft {
            email: String::from("anna@example.com"),
            username: String::from("anna"),
            first_name: String::from("Anna"),
            last_name: String::from("Cook"),
            password: String::from("s3cret-pass"),
        }
    }

    fn field_of(result: Result<(), RecipeError>) -> String {
        result
            .unwrap_err()
            .field()
            .map(str::to_string)
            .unwrap_or_default()
    }

    #[rstest]
    fn test_valid_draft(draft: RecipeDraft) {
        assert_eq!(validate_recipe_draft(&draft, DraftMode::Create), Ok(()));
    }

    #[rstest]
    fn test_empty_ingredients(mut draft: RecipeDraft) {
        draft.ingredients.clear();
        assert_eq!(
            validate_recipe_draft(&draft, DraftMode::Create),
            Err(RecipeError::validation(
                "ingredients",
                "Ingredients field cannot be empty."
            ))
        );
    }

    #[rstest]
    fn test_duplicate_ingredients(mut draft: RecipeDraft) {
        draft.ingredients.push(IngredientAmount { id: 1, amount: 10 });
        assert_eq!(
            validate_recipe_draft(&draft, DraftMode::Create),
            Err(RecipeError::validation(
                "ingredients",
                "Duplicate ingredients are not allowed."
            ))
        );
    }

    #[rstest]
    #[case(0)]
    #[case(-5)]
    #[case(MAX_AMOUNT + 1)]
    fn test_amount_out_of_range(mut draft: RecipeDraft, #[case] amount: i32) {
        draft.ingredients[0].amount = amount;
        assert_eq!(
            validate_recipe_draft(&draft, DraftMode::Create),
            Err(RecipeError::validation(
                "amount",
                "Ingredient amount must be between 1 and 32000."
            ))
        );
    }

    #[rstest]
    fn test_empty_and_duplicate_tags(mut draft: RecipeDraft) {
        draft.tags = vec![3, 3];
        assert_eq!(
            validate_recipe_draft(&draft, DraftMode::Create),
            Err(RecipeError::validation(
                "tags",
                "Duplicate tags are not allowed."
            ))
        );

        draft.tags.clear();
        assert_eq!(
            field_of(validate_recipe_draft(&draft, DraftMode::Create)),
            "tags"
        );
    }

    #[rstest]
    #[case(0)]
    #[case(MAX_COOKING_TIME + 1)]
    fn test_cooking_time_out_of_range(mut draft: RecipeDraft, #[case] cooking_time: i32) {
        draft.cooking_time = cooking_time;
        assert_eq!(
            validate_recipe_draft(&draft, DraftMode::Create),
            Err(RecipeError::validation(
                "cooking_time",
                "Cooking time must be between 1 and 32000."
            ))
        );
    }

    #[rstest]
    #[case(MIN_COOKING_TIME)]
    #[case(MAX_COOKING_TIME)]
    fn test_cooking_time_bounds_are_inclusive(mut draft: RecipeDraft, #[case] cooking_time: i32) {
        draft.cooking_time = cooking_time;
        assert_eq!(validate_recipe_draft(&draft, DraftMode::Create), Ok(()));
    }

    #[rstest]
    fn test_first_failing_field_wins(mut draft: RecipeDraft) {
        draft.cooking_time = 0;
        draft.name = String::from(" ");
        assert_eq!(
            field_of(validate_recipe_draft(&draft, DraftMode::Create)),
            "cooking_time"
        );
    }

    #[rstest]
    fn test_image_required_on_create_only(mut draft: RecipeDraft) {
        draft.image = None;
        assert_eq!(
            field_of(validate_recipe_draft(&draft, DraftMode::Create)),
            "image"
        );
        assert_eq!(validate_recipe_draft(&draft, DraftMode::Replace), Ok(()));

        draft.image = Some(String::from("  "));
        assert_eq!(
            field_of(validate_recipe_draft(&draft, DraftMode::Replace)),
            "image"
        );
    }

    #[rstest]
    #[case("   ")]
    #[case("")]
    fn test_blank_name(mut draft: RecipeDraft, #[case] name: &str) {
        draft.name = name.to_string();
        assert_eq!(
            field_of(validate_recipe_draft(&draft, DraftMode::Create)),
            "name"
        );
    }

    #[rstest]
    fn test_long_name(mut draft: RecipeDraft) {
        draft.name = "a".repeat(MAX_LENGTH_RECIPE_NAME as usize + 1);
        assert_eq!(
            field_of(validate_recipe_draft(&draft, DraftMode::Create)),
            "name"
        );
    }

    #[rstest]
    fn test_missing_reference_reports_first_offender() {
        assert_eq!(missing_reference(&[1, 9, 2, 8], &[1, 2]), Some(9));
        assert_eq!(missing_reference(&[1, 2], &[2, 1, 3]), None);
    }

    #[rstest]
    #[case("chef_anna", true)]
    #[case("anna.b+cook@home-1", true)]
    #[case("me", false)]
    #[case("with space", false)]
    #[case("semi;colon", false)]
    #[case("", false)]
    fn test_usernames(mut user: UserDraft, #[case] username: &str, #[case] valid: bool) {
        user.username = username.to_string();
        let result = validate_user_draft(&user);
        assert_eq!(result.is_ok(), valid);
        if !valid {
            assert_eq!(field_of(result), "username");
        }
    }

    #[rstest]
    fn test_forbidden_username_message(mut user: UserDraft) {
        user.username = String::from("me");
        assert_eq!(
            validate_user_draft(&user),
            Err(RecipeError::validation("username", "Username 'me' is not allowed."))
        );
    }

    #[rstest]
    fn test_user_draft(mut user: UserDraft) {
        assert_eq!(validate_user_draft(&user), Ok(()));

        user.email = String::from("not-an-email");
        assert_eq!(
            validate_user_draft(&user),
            Err(RecipeError::validation("email", "Enter a valid email address."))
        );

        user.email = String::from("anna@example.com");
        user.last_name = String::from("  ");
        assert_eq!(field_of(validate_user_draft(&user)), "last_name");

        user.last_name = String::from("Cook");
        user.password = String::new();
        assert_eq!(
            validate_user_draft(&user),
            Err(RecipeError::validation("password", "Password cannot be empty."))
        );
    }

    #[rstest]
    #[case("", "g", Some("name"))]
    #[case("Flour", " ", Some("measurement_unit"))]
    #[case("Flour", "g", None)]
    fn test_ingredient_draft(
        #[case] name: &str,
        #[case] unit: &str,
        #[case] field: Option<&str>,
    ) {
        let draft = IngredientDraft {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        };
        let error = validate_ingredient_draft(&draft).err();
        assert_eq!(error.as_ref().and_then(|e| e.field()), field);
    }

    #[rstest]
    #[case("Breakfast", "breakfast", None)]
    #[case("Quick meals", "quick-meals_2", None)]
    #[case("Spaces", "not a slug", Some("slug"))]
    #[case(" ", "blank", Some("name"))]
    fn test_tag_draft(#[case] name: &str, #[case] slug: &str, #[case] field: Option<&str>) {
        let draft = TagDraft {
            name: name.to_string(),
            slug: slug.to_string(),
        };
        let error = validate_tag_draft(&draft).err();
        assert_eq!(error.as_ref().and_then(|e| e.field()), field);
    }
}
