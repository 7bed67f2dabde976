// Flight booking order pipeline: authenticate, search, select, price, book, retrieve

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod money;
pub mod normalizer;
pub mod offer;
pub mod order;
pub mod pipeline;
pub mod search;
pub mod store;
pub mod transport;
pub mod traveler;

// Re-export key types for convenience
pub use auth::{AccessToken, Credential};
pub use client::{BookingApi, FlightBookingClient};
pub use config::{ClientConfig, RetryConfig};
pub use error::{
    ClientError, PersistenceError, PipelineError, SelectionError, Stage, StageFailure,
    TransportError, ValidationError,
};
pub use money::Amount;
pub use normalizer::{normalize, normalize_all, normalize_offer};
pub use offer::{FareChange, Offer, PricedOffer, Segment};
pub use order::{Order, TicketingAgreement};
pub use pipeline::{
    select_offer, BookingOutcome, Orchestrator, PersistenceStatus, PipelineRun, PipelineState,
    Selection,
};
pub use search::{SearchCriteria, SearchResults, TravelClass};
pub use store::{InMemoryOrderStore, OrderStore};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use traveler::{Contact, Gender, Phone, Traveler};
