pub mod client;

pub use client::{ApiClient, AuthToken};

/// Backend endpoint paths, relative to the configured base URL.
pub mod endpoints {
    pub const SIGN_IN: &str = "/api/v1/users/sign_in";
    pub const SIGN_OUT: &str = "/api/v1/users/sign_out";
    pub const RECIPES: &str = "/api/v1/recipes";
    pub const SCHEDULED_RECIPES: &str = "/api/v1/scheduled_recipes";
    pub const SCHEDULED_RECIPES_CLEAR: &str = "/api/v1/scheduled_recipes/clear";
    pub const SHOPPING_LIST: &str = "/api/v1/shopping_list";
    pub const SHOPPING_LIST_CHECK: &str = "/api/v1/shopping_list/check";
}
