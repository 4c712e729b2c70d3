// src/client.rs
use crate::backend::{ApiResult, InsightService, PortfolioStore, PriceFeed};
use crate::error::ApiError;
use crate::insights::AiAnalysis;
use crate::models::{
    Holding, HoldingUpdate, NewHolding, NewTransaction, PriceMap, Transaction, UserSession,
};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// REST client for the portfolio backend. One instance serves every
/// collaborator role; requests made on behalf of a user carry that user's
/// bearer token, background requests carry the service token if configured.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    service_token: Option<String>,
    insight_timeout: Duration,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        insight_timeout: Duration,
    ) -> ApiResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(base_url));
        }
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(ApiClient {
            client,
            base_url,
            service_token: None,
            insight_timeout,
        })
    }

    pub fn with_service_token(mut self, token: Option<String>) -> Self {
        self.service_token = token;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token.or(self.service_token.as_deref()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("Backend rejected credentials.");
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }
        Ok(response)
    }

    /// Lists come back as a JSON array; anything else, including an empty
    /// or non-JSON body, is read as "no rows".
    async fn fetch_list<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<Vec<T>> {
        let text = self.send(request).await?.text().await?;
        match serde_json::from_str::<Value>(&text) {
            Ok(body) if body.is_array() => {
                serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
            }
            _ => {
                debug!("Expected a JSON array, got {:?}; treating as empty.", text);
                Ok(Vec::new())
            }
        }
    }
}

fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.to_string()
            }
        })
}

#[async_trait]
impl PortfolioStore for ApiClient {
    async fn fetch_holdings(&self, session: &UserSession) -> ApiResult<Vec<Holding>> {
        let request = self
            .client
            .get(self.url("/portfolios"))
            .query(&[("email", session.email.as_str())]);
        let holdings: Vec<Holding> = self
            .fetch_list(self.authorized(request, session.token.as_deref()))
            .await?;
        debug!("Fetched {} holdings for {}", holdings.len(), session.email);
        Ok(holdings)
    }

    async fn create_holding(&self, session: &UserSession, holding: &NewHolding) -> ApiResult<()> {
        let request = self.client.post(self.url("/portfolios")).json(holding);
        self.send(self.authorized(request, session.token.as_deref()))
            .await?;
        Ok(())
    }

    async fn update_holding(
        &self,
        session: &UserSession,
        id: i64,
        update: &HoldingUpdate,
    ) -> ApiResult<()> {
        let request = self
            .client
            .put(self.url(&format!("/portfolios/{}", id)))
            .json(update);
        self.send(self.authorized(request, session.token.as_deref()))
            .await?;
        Ok(())
    }

    async fn delete_holding(&self, session: &UserSession, id: i64) -> ApiResult<()> {
        let request = self.client.delete(self.url(&format!("/portfolios/{}", id)));
        self.send(self.authorized(request, session.token.as_deref()))
            .await?;
        Ok(())
    }

    async fn record_transaction(
        &self,
        session: &UserSession,
        transaction: &NewTransaction,
    ) -> ApiResult<()> {
        let request = self.client.post(self.url("/transactions")).json(transaction);
        self.send(self.authorized(request, session.token.as_deref()))
            .await?;
        Ok(())
    }

    async fn fetch_transactions(&self, session: &UserSession) -> ApiResult<Vec<Transaction>> {
        let request = self
            .client
            .get(self.url("/transactions"))
            .query(&[("email", session.email.as_str())]);
        self.fetch_list(self.authorized(request, session.token.as_deref()))
            .await
    }
}

#[async_trait]
impl PriceFeed for ApiClient {
    async fn fetch_prices(&self, token: Option<&str>, symbols: &[String]) -> ApiResult<PriceMap> {
        if symbols.is_empty() {
            return Ok(PriceMap::new());
        }
        let joined = symbols.join(",");
        let request = self
            .client
            .get(self.url("/market/prices"))
            .query(&[("symbols", joined.as_str())]);
        let text = self.send(self.authorized(request, token)).await?.text().await?;

        // Entries that are not numbers are treated as unpriced.
        let prices: PriceMap = serde_json::from_str::<Value>(&text)
            .ok()
            .as_ref()
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(symbol, price)| price.as_f64().map(|p| (symbol.clone(), p)))
                    .collect()
            })
            .unwrap_or_default();
        debug!("Priced {}/{} symbols", prices.len(), symbols.len());
        Ok(prices)
    }
}

#[async_trait]
impl InsightService for ApiClient {
    async fn analyze(&self, token: Option<&str>, symbols: &[String]) -> ApiResult<AiAnalysis> {
        let joined = symbols.join(",");
        let request = self
            .client
            .get(self.url("/portfolios/ai-analysis"))
            .query(&[("stocks", joined.as_str())])
            .timeout(self.insight_timeout);
        let analysis = self
            .send(self.authorized(request, token))
            .await?
            .json::<AiAnalysis>()
            .await?;
        Ok(analysis)
    }
}
