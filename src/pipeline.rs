// Booking pipeline: Authenticate -> Search -> Select -> Price -> Book -> Retrieve.
//
// `Orchestrator` exposes each stage as one request/response exchange with the
// upstream; it holds no per-run state and can be shared between concurrent runs.
// `PipelineRun` drives one booking attempt through the stages in order and carries
// the token and the artifacts of the previous stage forward.

use chrono::Utc;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::{AccessToken, Credential, TokenResponse};
use crate::config::ClientConfig;
use crate::error::{
    PersistenceError, PipelineError, SelectionError, Stage, StageFailure, TransportError,
    ValidationError,
};
use crate::normalizer::{normalize_all, normalize_offer};
use crate::offer::{FareChange, Offer, PricedOffer, PricingRequest, PricingResponse};
use crate::order::{Order, OrderEnvelope};
use crate::search::{SearchCriteria, SearchResponse, SearchResults};
use crate::store::OrderStore;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::traveler::{assign_traveler_ids, Traveler};

const TOKEN_PATH: &[&str] = &["v1", "security", "oauth2", "token"];
const FLIGHT_OFFERS_PATH: &[&str] = &["v2", "shopping", "flight-offers"];
const PRICING_PATH: &[&str] = &["v1", "shopping", "flight-offers", "pricing"];
const FLIGHT_ORDERS_PATH: &[&str] = &["v1", "booking", "flight-orders"];

/// Result of picking an offer from a search result list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a> {
    Offer(&'a Offer),
    // The caller entered 0: drop these offers and search again
    Restart,
}

/// Pick an offer by 1-based position. `0` is the restart sentinel, not an error.
pub fn select_offer(offers: &[Offer], index: i64) -> Result<Selection<'_>, SelectionError> {
    if index == 0 {
        return Ok(Selection::Restart);
    }
    usize::try_from(index)
        .ok()
        .and_then(|position| offers.get(position - 1))
        .map(Selection::Offer)
        .ok_or(SelectionError::IndexOutOfRange {
            index,
            available: offers.len(),
        })
}

#[derive(Debug)]
pub enum PersistenceStatus {
    Stored,
    // No store configured
    Skipped,
    Failed(PersistenceError),
}

/// A confirmed booking plus the outcome of persisting it. The reservation exists
/// upstream whatever `persistence` says.
#[derive(Debug)]
pub struct BookingOutcome {
    pub order: Order,
    pub persistence: PersistenceStatus,
}

impl BookingOutcome {
    pub fn persistence_error(&self) -> Option<&PersistenceError> {
        match &self.persistence {
            PersistenceStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn OrderStore>>,
    config: ClientConfig,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            store: None,
            config,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn OrderStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn start_run(&self) -> PipelineRun {
        PipelineRun::new(self.clone())
    }

    // Every exchange is bounded by the configured timeout
    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match tokio::time::timeout(self.config.timeout(), self.transport.perform(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.config.timeout_ms)),
        }
    }

    async fn exchange_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<T, StageFailure> {
        let response = self.exchange(request).await?;
        decode(&response)
    }

    pub async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<AccessToken, PipelineError> {
        let retry = &self.config.retry_config;
        let mut attempt = 0;
        loop {
            match self.request_token(credential).await {
                Ok(token) => {
                    info!(
                        "authenticated client {} (token valid until {})",
                        credential.client_id,
                        token.expires_at()
                    );
                    return Ok(token);
                }
                Err(failure) if failure.is_transient() && attempt < retry.max_retries => {
                    let backoff = retry.backoff(attempt);
                    attempt += 1;
                    warn!(
                        "token request failed ({}), retry {}/{} in {:?}",
                        failure, attempt, retry.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(failure) => return Err(PipelineError::AuthError(failure)),
            }
        }
    }

    async fn request_token(&self, credential: &Credential) -> Result<AccessToken, StageFailure> {
        let request = HttpRequest::post(TOKEN_PATH).form(credential.form_fields());
        let response: TokenResponse = self.exchange_json(request).await?;
        if response.access_token.is_empty() {
            return Err(StageFailure::Decode(
                "token response carried no access_token".to_string(),
            ));
        }
        Ok(AccessToken::from_response(response, Utc::now()))
    }

    pub async fn search(
        &self,
        token: &AccessToken,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Offer>, PipelineError> {
        self.search_with_dictionaries(token, criteria)
            .await
            .map(|results| results.offers)
    }

    pub async fn search_with_dictionaries(
        &self,
        token: &AccessToken,
        criteria: &SearchCriteria,
    ) -> Result<SearchResults, PipelineError> {
        criteria
            .validate()
            .map_err(|e| PipelineError::SearchError(e.into()))?;
        info!(
            "searching {} -> {} on {} for {} adult(s)",
            criteria.origin, criteria.destination, criteria.departure_date, criteria.adults
        );

        let request = HttpRequest::get(FLIGHT_OFFERS_PATH)
            .query(criteria.to_query())
            .bearer(token.value());
        let response: SearchResponse = self
            .exchange_json(request)
            .await
            .map_err(PipelineError::SearchError)?;

        let mut offers = response.data;
        normalize_all(&mut offers);
        info!("search returned {} offer(s)", offers.len());

        Ok(SearchResults {
            offers,
            dictionaries: response.dictionaries.unwrap_or_default(),
        })
    }

    pub async fn price(
        &self,
        token: &AccessToken,
        offer: &Offer,
    ) -> Result<PricedOffer, PipelineError> {
        info!(
            "pricing offer {} ({} {})",
            offer.id, offer.price.total, offer.price.currency
        );

        let body = serde_json::to_value(PricingRequest::for_offer(offer)).map_err(|e| {
            PipelineError::PricingError(TransportError::InvalidRequest(e.to_string()).into())
        })?;
        let request = HttpRequest::post(PRICING_PATH)
            .bearer(token.value())
            .json(body);
        let response: PricingResponse = self
            .exchange_json(request)
            .await
            .map_err(PipelineError::PricingError)?;

        let data = response.data;
        let mut flight_offers = data.flight_offers;
        let position = flight_offers
            .iter()
            .position(|priced| priced.id == offer.id)
            .unwrap_or(0);
        if flight_offers.is_empty() {
            return Err(PipelineError::PricingError(StageFailure::Decode(
                "pricing response carried no flight offer".to_string(),
            )));
        }
        let mut priced = flight_offers.swap_remove(position);
        normalize_offer(&mut priced);

        let fare_change = FareChange::between(offer, &priced);
        match &fare_change {
            Some(change) => warn!(
                "fare for offer {} changed from {} to {} {}",
                offer.id, change.previous, change.current, change.currency
            ),
            None => debug!(
                "fare for offer {} confirmed at {}",
                offer.id, priced.price.total
            ),
        }

        Ok(PricedOffer {
            offer: priced,
            booking_requirements: data.booking_requirements,
            fare_change,
        })
    }

    pub async fn book(
        &self,
        token: &AccessToken,
        priced: &PricedOffer,
        travelers: &[Traveler],
    ) -> Result<BookingOutcome, PipelineError> {
        let travelers = prepare_travelers(priced, travelers)
            .map_err(|e| PipelineError::BookingError(e.into()))?;
        info!(
            "booking offer {} for {} traveler(s) at {} {}",
            priced.id(),
            travelers.len(),
            priced.total(),
            priced.currency()
        );

        let draft = Order::draft(priced, travelers, self.config.ticketing_agreement.clone());
        let body = serde_json::to_value(OrderEnvelope::borrowed(&draft)).map_err(|e| {
            PipelineError::BookingError(TransportError::InvalidRequest(e.to_string()).into())
        })?;
        let request = HttpRequest::post(FLIGHT_ORDERS_PATH)
            .bearer(token.value())
            .json(body);
        let response: OrderEnvelope<Order> = self
            .exchange_json(request)
            .await
            .map_err(PipelineError::BookingError)?;

        let order = complete_order(response.data, draft)
            .map_err(|e| PipelineError::BookingError(StageFailure::Decode(e.to_string())))?;
        info!("order {} created", order.id);

        let persistence = self.persist(&order).await;
        Ok(BookingOutcome { order, persistence })
    }

    async fn persist(&self, order: &Order) -> PersistenceStatus {
        let Some(store) = &self.store else {
            return PersistenceStatus::Skipped;
        };
        match store.save(order).await {
            Ok(()) => {
                debug!("order {} persisted", order.id);
                PersistenceStatus::Stored
            }
            Err(source) => {
                warn!("order {} booked but not persisted: {:#}", order.id, source);
                PersistenceStatus::Failed(PersistenceError {
                    order_id: order.id.clone(),
                    source,
                })
            }
        }
    }

    pub async fn retrieve(
        &self,
        token: &AccessToken,
        order_id: &str,
    ) -> Result<Order, PipelineError> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(PipelineError::RetrievalError(ValidationError::EmptyOrderId.into()));
        }
        info!("retrieving order {}", order_id);

        let request = HttpRequest::get(FLIGHT_ORDERS_PATH)
            .segment(order_id)
            .bearer(token.value());
        let response = self
            .exchange(request)
            .await
            .map_err(|e| PipelineError::RetrievalError(e.into()))?;
        if response.status == 404 {
            return Err(PipelineError::NotFoundError {
                order_id: order_id.to_string(),
            });
        }
        let envelope: OrderEnvelope<Order> =
            decode(&response).map_err(PipelineError::RetrievalError)?;
        Ok(envelope.data)
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, StageFailure> {
    if !response.is_success() {
        return Err(StageFailure::Upstream {
            status_code: response.status,
            message: response.error_message(),
        });
    }
    response
        .json()
        .map_err(|e| StageFailure::Decode(e.to_string()))
}

// Validate the traveler list against the priced offer and number the travelers
fn prepare_travelers(
    priced: &PricedOffer,
    travelers: &[Traveler],
) -> Result<Vec<Traveler>, ValidationError> {
    if travelers.is_empty() {
        return Err(ValidationError::NoTravelers);
    }
    let required = priced.required_travelers();
    if travelers.len() < required {
        return Err(ValidationError::TravelerCountMismatch {
            required,
            supplied: travelers.len(),
        });
    }
    for (index, traveler) in travelers.iter().enumerate() {
        traveler.validate(index + 1)?;
    }
    let mut travelers = travelers.to_vec();
    assign_traveler_ids(&mut travelers);
    Ok(travelers)
}

// The booking response may only carry `{type, id}`; fill the rest from what was sent
fn complete_order(mut order: Order, draft: Order) -> Result<Order, ValidationError> {
    if order.flight_offers.is_empty() {
        order.flight_offers = draft.flight_offers;
    }
    if order.travelers.is_empty() {
        order.travelers = draft.travelers;
    }
    if order.ticketing_agreement.is_none() {
        order.ticketing_agreement = draft.ticketing_agreement;
    }
    order.validate()?;
    Ok(order)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Authenticated,
    Searched,
    Priced,
    Booked,
    Retrieved,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Authenticated => "authenticated",
            PipelineState::Searched => "searched",
            PipelineState::Priced => "priced",
            PipelineState::Booked => "booked",
            PipelineState::Retrieved => "retrieved",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One booking attempt. Stages must be called in order; any stage error moves the
/// run to `Failed`, after which every operation is refused.
pub struct PipelineRun {
    orchestrator: Orchestrator,
    state: PipelineState,
    token: Option<AccessToken>,
    criteria: Option<SearchCriteria>,
    offers: Vec<Offer>,
    selected: Option<Offer>,
    priced: Option<PricedOffer>,
    order: Option<Order>,
}

impl PipelineRun {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            state: PipelineState::Idle,
            token: None,
            criteria: None,
            offers: Vec::new(),
            selected: None,
            priced: None,
            order: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    pub fn selected_offer(&self) -> Option<&Offer> {
        self.selected.as_ref()
    }

    pub fn priced_offer(&self) -> Option<&PricedOffer> {
        self.priced.as_ref()
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    fn ensure_state(
        &self,
        operation: Stage,
        allowed: &[PipelineState],
    ) -> Result<(), PipelineError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PipelineError::OutOfOrder {
                operation,
                state: self.state,
            })
        }
    }

    // Stage errors are terminal for the run
    fn settle<T>(&mut self, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
        if let Err(err) = &result {
            warn!("pipeline run failed at {}: {}", err.stage(), err);
            self.state = PipelineState::Failed;
        }
        result
    }

    pub async fn authenticate(&mut self, credential: &Credential) -> Result<(), PipelineError> {
        self.ensure_state(Stage::Authenticate, &[PipelineState::Idle])?;
        let result = self.orchestrator.authenticate(credential).await;
        let token = self.settle(result)?;
        self.use_token(token);
        Ok(())
    }

    /// Start from a token obtained elsewhere.
    pub fn use_token(&mut self, token: AccessToken) {
        self.token = Some(token);
        self.state = PipelineState::Authenticated;
    }

    pub async fn search(&mut self, criteria: SearchCriteria) -> Result<&[Offer], PipelineError> {
        self.ensure_state(Stage::Search, &[PipelineState::Authenticated])?;
        let token = self.token()?;
        let result = self.orchestrator.search(&token, &criteria).await;
        self.offers = self.settle(result)?;
        self.selected = None;
        self.criteria = Some(criteria);
        self.state = PipelineState::Searched;
        Ok(&self.offers)
    }

    /// Choose the offer `price` will confirm. `Ok(None)` means the caller asked to
    /// search again; the run goes back to `Authenticated`. An out-of-range index
    /// leaves the run in `Searched` so the front end can ask again.
    pub fn select(&mut self, index: i64) -> Result<Option<&Offer>, PipelineError> {
        self.ensure_state(Stage::Select, &[PipelineState::Searched])?;
        match select_offer(&self.offers, index)? {
            Selection::Offer(offer) => {
                let offer = offer.clone();
                let selected: &Offer = self.selected.insert(offer);
                Ok(Some(selected))
            }
            Selection::Restart => {
                debug!("offer selection restarted");
                self.offers.clear();
                self.selected = None;
                self.criteria = None;
                self.state = PipelineState::Authenticated;
                Ok(None)
            }
        }
    }

    /// Price the offer picked by `select`.
    pub async fn price(&mut self) -> Result<&PricedOffer, PipelineError> {
        self.ensure_state(Stage::Price, &[PipelineState::Searched])?;
        let Some(offer) = self.selected.clone() else {
            return Err(PipelineError::OutOfOrder {
                operation: Stage::Price,
                state: self.state,
            });
        };
        let token = self.token()?;
        let result = self.orchestrator.price(&token, &offer).await;
        let priced = self.settle(result)?;
        self.state = PipelineState::Priced;
        Ok(self.priced.insert(priced))
    }

    pub async fn book(&mut self, travelers: &[Traveler]) -> Result<BookingOutcome, PipelineError> {
        self.ensure_state(Stage::Book, &[PipelineState::Priced])?;
        let token = self.token()?;
        let adults = self.criteria.as_ref().map_or(0, |c| c.adults as usize);
        if travelers.len() < adults {
            let err = PipelineError::BookingError(
                ValidationError::TravelerCountMismatch {
                    required: adults,
                    supplied: travelers.len(),
                }
                .into(),
            );
            return self.settle(Err(err));
        }

        let result = match &self.priced {
            Some(priced) => self.orchestrator.book(&token, priced, travelers).await,
            None => Err(PipelineError::OutOfOrder {
                operation: Stage::Book,
                state: self.state,
            }),
        };
        let outcome = self.settle(result)?;
        self.order = Some(outcome.order.clone());
        self.state = PipelineState::Booked;
        Ok(outcome)
    }

    pub async fn retrieve(&mut self) -> Result<&Order, PipelineError> {
        self.ensure_state(
            Stage::Retrieve,
            &[PipelineState::Booked, PipelineState::Retrieved],
        )?;
        let token = self.token()?;
        let order_id = self
            .order
            .as_ref()
            .map(|order| order.id.clone())
            .unwrap_or_default();
        let result = self.orchestrator.retrieve(&token, &order_id).await;
        let order = self.settle(result)?;
        self.state = PipelineState::Retrieved;
        Ok(self.order.insert(order))
    }

    fn token(&self) -> Result<AccessToken, PipelineError> {
        self.token.clone().ok_or(PipelineError::OutOfOrder {
            operation: Stage::Authenticate,
            state: self.state,
        })
    }
}
