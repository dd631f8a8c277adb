//! HTTP client for the back-office API.

use crate::error::Error;
use crate::types::*;
use reqwest::Client;
use std::time::Duration;

#[cfg(test)]
mod tests;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-API-Key";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "http://localhost:8080").
    pub base_url: String,
    /// API key sent with every request, if any.
    pub api_key: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the Brokerage Back-Office API.
#[derive(Debug, Clone)]
pub struct BackofficeClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BackofficeClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    /// Creates a new client with default configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// Builds an absolute endpoint URL; query parameters are attached by the
    /// caller through `query_pairs_mut`.
    fn url(&self, path: &str) -> Result<url::Url, Error> {
        url::Url::parse(&format!("{}{}", self.base_url, path)).map_err(Error::from)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.with_key(self.client.get(url))
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.with_key(self.client.post(url))
    }

    fn delete(&self, url: &str) -> reqwest::RequestBuilder {
        self.with_key(self.client.delete(url))
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    // ========================================================================
    // Health & Overview
    // ========================================================================

    /// Performs a health check.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn health_check(&self) -> Result<HealthResponse, Error> {
        let url = format!("{}/health", self.base_url);
        let resp = self.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Gets back-office overview statistics.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_overview(&self) -> Result<OverviewResponse, Error> {
        let url = format!("{}/api/v1/stats", self.base_url);
        let resp = self.get(&url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Enqueues a rollup run for a business date.
    ///
    /// # Errors
    /// Returns [`Error::Conflict`] if a run for the date is already in
    /// progress, or another error if the request fails.
    pub async fn trigger_aggregation(
        &self,
        request: &AggregateStatsRequest,
    ) -> Result<AggregateStatsResponse, Error> {
        let url = format!("{}/api/v1/stats/aggregate", self.base_url);
        let resp = self.post(&url).json(request).send().await?;
        self.handle_response(resp).await
    }

    /// Gets one branch's snapshot for a date.
    ///
    /// # Errors
    /// Returns error if the request fails or no snapshot exists.
    pub async fn get_branch_stats(
        &self,
        branch_id: i64,
        date: chrono::NaiveDate,
    ) -> Result<BranchStatsResponse, Error> {
        let mut url = self.url(&format!("/api/v1/stats/branches/{branch_id}"))?;
        url.query_pairs_mut().append_pair("date", &date.to_string());
        let resp = self.get(url.as_str()).send().await?;
        self.handle_response(resp).await
    }

    /// Compares summed snapshot figures across a branch subset.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn compare_branches(&self, branch_ids: &[i64]) -> Result<ComparisonResponse, Error> {
        let ids = branch_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.url("/api/v1/stats/comparison")?;
        url.query_pairs_mut().append_pair("branchIds", &ids);
        let resp = self.get(url.as_str()).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Branches
    // ========================================================================

    /// Lists all branches.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_branches(&self) -> Result<BranchesListResponse, Error> {
        let url = format!("{}/api/v1/branches", self.base_url);
        let resp = self.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Creates a branch.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn create_branch(
        &self,
        request: &CreateBranchRequest,
    ) -> Result<BranchSummary, Error> {
        let url = format!("{}/api/v1/branches", self.base_url);
        let resp = self.post(&url).json(request).send().await?;
        self.handle_response(resp).await
    }

    /// Gets a branch by id.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_branch(&self, branch_id: i64) -> Result<BranchSummary, Error> {
        let url = format!("{}/api/v1/branches/{}", self.base_url, branch_id);
        let resp = self.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Soft-deletes a branch.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn delete_branch(&self, branch_id: i64) -> Result<(), Error> {
        let url = format!("{}/api/v1/branches/{}", self.base_url, branch_id);
        let resp = self.delete(&url).send().await?;
        self.handle_empty_response(resp).await
    }

    /// Gets a branch's descendant set.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_branch_descendants(
        &self,
        branch_id: i64,
    ) -> Result<DescendantsResponse, Error> {
        let url = format!(
            "{}/api/v1/branches/{}/descendants",
            self.base_url, branch_id
        );
        let resp = self.get(&url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Clients
    // ========================================================================

    /// Lists clients, optionally restricted to one branch.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_clients(
        &self,
        branch_id: Option<i64>,
    ) -> Result<ClientsListResponse, Error> {
        let mut url = self.url("/api/v1/clients")?;
        if let Some(id) = branch_id {
            url.query_pairs_mut().append_pair("branchId", &id.to_string());
        }
        let resp = self.get(url.as_str()).send().await?;
        self.handle_response(resp).await
    }

    /// Creates a client.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn create_client(
        &self,
        request: &CreateClientRequest,
    ) -> Result<ClientSummary, Error> {
        let url = format!("{}/api/v1/clients", self.base_url);
        let resp = self.post(&url).json(request).send().await?;
        self.handle_response(resp).await
    }

    /// Gets a client by id.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_client(&self, client_id: i64) -> Result<ClientSummary, Error> {
        let url = format!("{}/api/v1/clients/{}", self.base_url, client_id);
        let resp = self.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Soft-deletes a client.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn delete_client(&self, client_id: i64) -> Result<(), Error> {
        let url = format!("{}/api/v1/clients/{}", self.base_url, client_id);
        let resp = self.delete(&url).send().await?;
        self.handle_empty_response(resp).await
    }

    // ========================================================================
    // Permissions
    // ========================================================================

    /// Gets a user's effective abilities.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_user_abilities(&self, user_id: i64) -> Result<AbilitiesResponse, Error> {
        let url = format!("{}/api/v1/users/{}/abilities", self.base_url, user_id);
        let resp = self.get(&url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // API Keys
    // ========================================================================

    /// Creates an API key.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn create_api_key(
        &self,
        request: &CreateApiKeyRequest,
    ) -> Result<CreateApiKeyResponse, Error> {
        let url = format!("{}/api/v1/auth/keys", self.base_url);
        let resp = self.post(&url).json(request).send().await?;
        self.handle_response(resp).await
    }

    /// Lists API keys.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_api_keys(&self) -> Result<ApiKeysListResponse, Error> {
        let url = format!("{}/api/v1/auth/keys", self.base_url);
        let resp = self.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Deletes an API key.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn delete_api_key(&self, key_id: &str) -> Result<DeleteApiKeyResponse, Error> {
        let url = format!("{}/api/v1/auth/keys/{}", self.base_url, key_id);
        let resp = self.delete(&url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Response handling
    // ========================================================================

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();

        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(match status.as_u16() {
                404 => Error::NotFound(text),
                409 => Error::Conflict(text),
                _ => Error::Api {
                    status: status.as_u16(),
                    message: text,
                },
            })
        }
    }

    async fn handle_empty_response(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();

        if status.is_success() {
            Ok(())
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(match status.as_u16() {
                404 => Error::NotFound(text),
                409 => Error::Conflict(text),
                _ => Error::Api {
                    status: status.as_u16(),
                    message: text,
                },
            })
        }
    }
}
