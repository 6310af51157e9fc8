//! State and city lookups against the public localities service.
//!
//! Two read operations: the UF list and the municipality list of one UF.
//! The city lookup is always parameterized by a concrete UF code; callers
//! guard the "nothing selected" sentinel and never pass it here.

use serde::Deserialize;

use crate::error::Result;
use crate::http::HttpClient;

/// One entry of `GET /estados`. Only the two-letter code is consumed.
#[derive(Debug, Deserialize)]
struct StateRecord {
    sigla: String,
}

/// One entry of `GET /estados/{uf}/municipios`.
#[derive(Debug, Deserialize)]
struct CityRecord {
    nome: String,
}

/// Client for the localities API.
#[derive(Clone)]
pub struct GeoLookupClient<H: HttpClient> {
    http: H,
    base_url: String,
}

impl<H: HttpClient> GeoLookupClient<H> {
    pub fn new(http: H, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Fetch every UF code, in service order.
    pub async fn states(&self) -> Result<Vec<String>> {
        let url = format!("{}/estados", self.base_url);
        tracing::debug!(url = %url, "Loading UF list");

        let response = self.http.get(&url).await?;
        let records: Vec<StateRecord> = serde_json::from_str(&response.body)?;

        tracing::debug!(count = records.len(), "UF list loaded");
        Ok(records.into_iter().map(|record| record.sigla).collect())
    }

    /// Fetch the city names of one UF.
    pub async fn cities(&self, uf: &str) -> Result<Vec<String>> {
        let url = format!("{}/estados/{}/municipios", self.base_url, uf);
        tracing::debug!(uf = %uf, url = %url, "Loading city list");

        let response = self.http.get(&url).await?;
        let records: Vec<CityRecord> = serde_json::from_str(&response.body)?;

        tracing::debug!(uf = %uf, count = records.len(), "City list loaded");
        Ok(records.into_iter().map(|record| record.nome).collect())
    }
}
