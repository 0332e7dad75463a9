//! HTTP implementation of [`ProviderApi`].

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use chargeforge_core::{GameCode, ServiceCode};

use crate::api::ProviderApi;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{
    BalanceInfo, NicknameResult, OrderReceipt, OrderRequest, ServiceFilter, ServiceListing,
    ServiceStatus, StockLevel, TransactionRecord,
};

#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Reject non-2xx responses before attempting to decode a body.
    ///
    /// 5xx means the Provider itself is in trouble (unavailable, retryable);
    /// 4xx is an explicit rejection carrying the Provider's reason text.
    async fn check(&self, response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound);
        }

        let note = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            return Err(ProviderError::Unavailable(format!("{status}: {note}")));
        }

        Err(ProviderError::Rejected {
            note: if note.is_empty() {
                status.to_string()
            } else {
                note
            },
        })
    }
}

fn status_query(status: ServiceStatus) -> &'static str {
    match status {
        ServiceStatus::Available => "available",
        ServiceStatus::Unavailable => "unavailable",
        ServiceStatus::Maintenance => "maintenance",
    }
}

#[async_trait]
impl ProviderApi for ProviderClient {
    async fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<ServiceListing>, ProviderError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(game) = &filter.game {
            query.push(("game", game.as_str().to_string()));
        }
        if let Some(category) = &filter.category {
            query.push(("category", category.clone()));
        }
        if let Some(status) = filter.status {
            query.push(("status", status_query(status).to_string()));
        }

        let response = self
            .client
            .get(self.url("services"))
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?;

        let services = self.check(response).await?.json::<Vec<ServiceListing>>().await?;
        Ok(services)
    }

    async fn check_stock(&self, code: &ServiceCode) -> Result<StockLevel, ProviderError> {
        let response = self
            .client
            .get(self.url("stock"))
            .bearer_auth(&self.api_key)
            .query(&[("code", code.as_str())])
            .send()
            .await?;

        let level = self.check(response).await?.json::<StockLevel>().await?;
        Ok(level)
    }

    async fn lookup_nickname(
        &self,
        game: &GameCode,
        user_id: &str,
        zone_id: Option<&str>,
    ) -> Result<String, ProviderError> {
        let mut query: Vec<(&str, &str)> = vec![("game", game.as_str()), ("user_id", user_id)];
        if let Some(zone) = zone_id {
            query.push(("zone_id", zone));
        }

        let response = self
            .client
            .get(self.url("nickname"))
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?;

        let result = self.check(response).await?.json::<NicknameResult>().await?;
        Ok(result.nickname)
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderReceipt, ProviderError> {
        tracing::info!(service = %request.service_code, target = %request.target, "submitting provider order");

        let response = self
            .client
            .post(self.url("order"))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let receipt = self.check(response).await?.json::<OrderReceipt>().await?;
        Ok(receipt)
    }

    async fn check_status(&self, trxid: &str) -> Result<Vec<TransactionRecord>, ProviderError> {
        let response = self
            .client
            .get(self.url("status"))
            .bearer_auth(&self.api_key)
            .query(&[("trxid", trxid)])
            .send()
            .await?;

        let records = self
            .check(response)
            .await?
            .json::<Vec<TransactionRecord>>()
            .await?;
        Ok(records)
    }

    async fn balance(&self) -> Result<f64, ProviderError> {
        let response = self
            .client
            .get(self.url("balance"))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let info = self.check(response).await?.json::<BalanceInfo>().await?;
        Ok(info.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let config = ProviderConfig::default().with_base_url("http://provider.test/");
        let client = ProviderClient::new(&config).unwrap();
        assert_eq!(client.url("stock"), "http://provider.test/stock");
    }

    #[test]
    fn status_filter_uses_wire_names() {
        assert_eq!(status_query(ServiceStatus::Maintenance), "maintenance");
    }
}
