//! Collection-item catalog client.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::HttpClient;

/// A selectable collection-item category.
///
/// Entries are loaded once per session and never mutated client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub title: String,
    /// Absolute URL of the category illustration served by the backend.
    pub image_url: String,
}

/// Client for the backend item catalog.
#[derive(Clone)]
pub struct ItemCatalogClient<H: HttpClient> {
    http: H,
    base_url: String,
}

impl<H: HttpClient> ItemCatalogClient<H> {
    pub fn new(http: H, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Fetch the full catalog.
    ///
    /// # Errors
    ///
    /// `Network` on transport failure, `Decode` on a malformed body. No
    /// retries are attempted.
    pub async fn list(&self) -> Result<Vec<Item>> {
        let url = format!("{}/items", self.base_url);
        tracing::debug!(url = %url, "Loading item catalog");

        let response = self.http.get(&url).await?;
        let items: Vec<Item> = serde_json::from_str(&response.body)?;

        tracing::debug!(count = items.len(), "Item catalog loaded");
        Ok(items)
    }
}
