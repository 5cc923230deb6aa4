pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const MIN_COOKING_TIME: i64 = 1;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_LIFETIME_HOURS: i64 = 24;

pub const SHOPPING_LIST_FILENAME: &str = "shoplist.txt";
pub const AMOUNT_DECIMAL_PLACES: i32 = 6;
