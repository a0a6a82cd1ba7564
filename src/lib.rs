mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod short_link;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod shopping_list {
    pub mod aggregate;
    pub mod document;
}
mod storage {
    pub mod media;
}
pub mod config;
mod constants;
pub mod routes;

pub use authentication::*;
pub use constants::*;
pub use database::*;
pub use shopping_list::*;
pub use storage::*;
