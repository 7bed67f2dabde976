// High-level client: one call per stage, token handled internally

use async_trait::async_trait;
use std::sync::Arc;

use crate::auth::AccessToken;
use crate::config::ClientConfig;
use crate::error::{ClientError, PipelineError, ValidationError};
use crate::offer::{Offer, PricedOffer};
use crate::order::Order;
use crate::pipeline::{BookingOutcome, Orchestrator, PipelineRun};
use crate::search::{SearchCriteria, SearchResults};
use crate::store::OrderStore;
use crate::transport::{ReqwestTransport, Transport};
use crate::traveler::Traveler;

#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Offer>, PipelineError>;

    async fn price(&self, offer: &Offer) -> Result<PricedOffer, PipelineError>;

    async fn book(
        &self,
        priced: &PricedOffer,
        travelers: &[Traveler],
    ) -> Result<BookingOutcome, PipelineError>;

    async fn retrieve(&self, order_id: &str) -> Result<Order, PipelineError>;
}

#[derive(Clone)]
pub struct FlightBookingClient {
    orchestrator: Orchestrator,
}

impl FlightBookingClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config.base_url, config.timeout_ms)?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            orchestrator: Orchestrator::new(transport, config),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn OrderStore>) -> Self {
        self.orchestrator = self.orchestrator.with_store(store);
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Fresh stepwise run sharing this client's transport and store.
    pub fn start_run(&self) -> PipelineRun {
        self.orchestrator.start_run()
    }

    pub async fn search_with_dictionaries(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<SearchResults, PipelineError> {
        let token = self.token().await?;
        self.orchestrator
            .search_with_dictionaries(&token, criteria)
            .await
    }

    // No caching: every call starts from the pre-obtained token or a fresh one
    async fn token(&self) -> Result<AccessToken, PipelineError> {
        let config = self.orchestrator.config();
        if let Some(token) = &config.access_token {
            return Ok(AccessToken::pre_obtained(token.clone()));
        }
        let credential = config
            .credential
            .as_ref()
            .ok_or_else(|| PipelineError::AuthError(ValidationError::MissingCredential.into()))?;
        self.orchestrator.authenticate(credential).await
    }
}

#[async_trait]
impl BookingApi for FlightBookingClient {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Offer>, PipelineError> {
        let token = self.token().await?;
        self.orchestrator.search(&token, criteria).await
    }

    async fn price(&self, offer: &Offer) -> Result<PricedOffer, PipelineError> {
        let token = self.token().await?;
        self.orchestrator.price(&token, offer).await
    }

    async fn book(
        &self,
        priced: &PricedOffer,
        travelers: &[Traveler],
    ) -> Result<BookingOutcome, PipelineError> {
        let token = self.token().await?;
        self.orchestrator.book(&token, priced, travelers).await
    }

    async fn retrieve(&self, order_id: &str) -> Result<Order, PipelineError> {
        let token = self.token().await?;
        self.orchestrator.retrieve(&token, order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;
    use crate::pipeline::PersistenceStatus;
    use crate::store::InMemoryOrderStore;
    use crate::transport::mock_upstream::MockUpstream;
    use crate::transport::HttpMethod;
    use crate::traveler::sample_traveler;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    const TOKEN: &str = "/v1/security/oauth2/token";

    fn sample(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    fn upstream() -> Arc<MockUpstream> {
        let upstream = Arc::new(MockUpstream::new());
        upstream.respond(
            HttpMethod::Post,
            TOKEN,
            200,
            json!({"access_token": "tok-1", "expires_in": 1799}),
        );
        upstream.respond(
            HttpMethod::Get,
            "/v2/shopping/flight-offers",
            200,
            sample(include_str!("../samples/search_response.json")),
        );
        upstream.respond(
            HttpMethod::Post,
            "/v1/shopping/flight-offers/pricing",
            200,
            sample(include_str!("../samples/pricing_response.json")),
        );
        upstream.respond(
            HttpMethod::Post,
            "/v1/booking/flight-orders",
            201,
            sample(include_str!("../samples/order_response.json")),
        );
        upstream
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria::new("ARI", "SCL", NaiveDate::from_ymd_opt(2023, 12, 2).unwrap(), 1)
    }

    #[tokio::test]
    async fn test_token_is_requested_per_call() {
        let upstream = upstream();
        let client = FlightBookingClient::with_transport(
            ClientConfig::with_credential(Credential::new("id", "secret")),
            upstream.clone(),
        )
        .unwrap();

        let offers = client.search(&criteria()).await.unwrap();
        let priced = client.price(&offers[0]).await.unwrap();
        assert_eq!(priced.total().as_str(), "52000");
        assert_eq!(upstream.count(HttpMethod::Post, TOKEN), 2);
    }

    #[tokio::test]
    async fn test_pre_obtained_token_skips_auth() {
        let upstream = upstream();
        let client = FlightBookingClient::with_transport(
            ClientConfig::with_access_token("given"),
            upstream.clone(),
        )
        .unwrap();

        let results = client.search_with_dictionaries(&criteria()).await.unwrap();
        assert_eq!(results.offers.len(), 1);
        assert_eq!(upstream.count(HttpMethod::Post, TOKEN), 0);
        let request = upstream
            .last_request(HttpMethod::Get, "/v2/shopping/flight-offers")
            .unwrap();
        assert_eq!(request.bearer.as_deref(), Some("given"));
    }

    #[tokio::test]
    async fn test_book_through_trait_object() {
        let upstream = upstream();
        let store = Arc::new(InMemoryOrderStore::new());
        let client: Box<dyn BookingApi> = Box::new(
            FlightBookingClient::with_transport(ClientConfig::with_access_token("given"), upstream)
                .unwrap()
                .with_store(store.clone()),
        );

        let offers = client.search(&criteria()).await.unwrap();
        let priced = client.price(&offers[0]).await.unwrap();
        let outcome = client.book(&priced, &[sample_traveler()]).await.unwrap();
        assert!(matches!(outcome.persistence, PersistenceStatus::Stored));
        assert_eq!(store.len(), 1);
        assert_eq!(outcome.order.reference(), Some("KRXPTR"));
    }

    #[tokio::test]
    async fn test_retrieve_missing_order() {
        let client = FlightBookingClient::with_transport(
            ClientConfig::with_access_token("given"),
            upstream(),
        )
        .unwrap();
        let err = client.retrieve("nonexistent-id").await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFoundError { .. }));
    }

    #[test]
    fn test_requires_credential_or_token() {
        let result = FlightBookingClient::with_transport(ClientConfig::default(), upstream());
        assert!(matches!(result, Err(ClientError::ConfigError(_))));
    }

    #[test]
    fn test_new_builds_reqwest_transport() {
        let mut config = ClientConfig::with_access_token("given");
        config.base_url = "http://127.0.0.1:9".to_string();
        assert!(FlightBookingClient::new(config).is_ok());
    }
}
