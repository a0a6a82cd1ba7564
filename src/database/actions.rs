mod favorites;
mod ingredients;
mod recipes;
mod shopping_cart;
mod subscriptions;
mod tags;
mod users;

pub use favorites::*;
pub use ingredients::*;
pub use recipes::*;
pub use shopping_cart::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;

use sqlx::{Pool, Postgres};

use crate::error::QueryError;

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| QueryError::from(sqlx::Error::from(e)))?;

    Ok(())
}
