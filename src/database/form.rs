use std::str::FromStr;

use crate::{
    pagination::PageRequest,
    schema::{RecipeFilter, Uuid},
};

use super::error::TypeError;

/// Query pairs as decoded by `warp::query`, repeated keys kept in order.
pub type FormData = Vec<(String, String)>;

pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid number for '{key}'"))),
            None => Ok(None),
        }
    }

    /// `1` and `0` flags. Anything else counts as not given.
    pub fn get_flag(&self, key: &str) -> Option<bool> {
        match self.get_str(key) {
            Some("1") => Some(true),
            Some("0") => Some(false),
            _ => None,
        }
    }

    pub fn recipe_filter(&self) -> Result<RecipeFilter, TypeError> {
        Ok(RecipeFilter {
            tags: self.get_all("tags"),
            author: self.get_number::<Uuid>("author")?,
            is_favorited: self.get_flag("is_favorited"),
            is_in_shopping_cart: self.get_flag("is_in_shopping_cart"),
        })
    }

    /// `default_limit` applies when the query has no `limit`.
    pub fn page_request(&self, default_limit: i64) -> Result<PageRequest, TypeError> {
        Ok(PageRequest::new(
            self.get_number("page")?,
            self.get_number("limit")?,
            default_limit,
        ))
    }

    /// A non-numeric `recipes_limit` is ignored rather than rejected.
    pub fn recipes_limit(&self) -> Option<i64> {
        self.get_number::<i64>("recipes_limit")
            .ok()
            .flatten()
            .map(|limit| limit.max(0))
    }
}
