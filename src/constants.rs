pub const RECIPE_COUNT_PER_PAGE: i64 = 10;
pub const USER_COUNT_PER_PAGE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32_000;

pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32_000;

pub const MAX_LENGTH_RECIPE_NAME: u64 = 200;
pub const MAX_LENGTH_INGREDIENT: u64 = 200;
pub const MAX_LENGTH_TAG: u64 = 200;

pub const MAX_LENGTH_EMAIL: u64 = 254;
pub const MAX_LENGTH_USERNAME: u64 = 150;
pub const MAX_LENGTH_NAME: u64 = 150;

pub const USERNAME_PATTERN: &str = r"^[\w.@+-]+$";
pub const SLUG_PATTERN: &str = r"^[-a-zA-Z0-9_]+$";

pub const FORBIDDEN_USERNAMES: &[&str] = &["me"];

pub const DEFAULT_JWT_LIFETIME_HOURS: i64 = 1;
pub const MAX_JWT_LIFETIME_HOURS: i64 = 24 * 365;

pub const SHORT_LINK_LENGTH: usize = 6;
pub const SHORT_LINK_MAX_ATTEMPTS: usize = 16;
pub const SHORT_LINK_PREFIX: &str = "s";

/* shopping list page geometry, in points */
pub const SHOPPING_LIST_TITLE: &str = "Shopping List";
pub const PAGE_FIRST_LINE_Y: i32 = 780;
pub const PAGE_LINE_STEP: i32 = 20;
pub const PAGE_BOTTOM_MARGIN: i32 = 50;

pub const RECIPE_IMAGE_FOLDER: &str = "recipes/images";
pub const AVATAR_FOLDER: &str = "users/avatars";
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
