mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod setup;
    pub mod shopping_list;
    pub mod validation;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod config;
mod constants;
pub mod routes;

pub use authentication::*;
pub use constants::*;
pub use database::*;
