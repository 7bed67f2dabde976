// Flight order schema and the booking wire envelope.
// The same envelope is used for POST /v1/booking/flight-orders (id left empty)
// and for the responses of the booking and retrieval endpoints.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::offer::{Extra, Offer, PricedOffer};
use crate::traveler::Traveler;

pub const ORDER_TYPE: &str = "flight-order";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TicketingAgreement {
    pub option: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,
}

impl TicketingAgreement {
    pub fn delay_to_cancel(delay: impl Into<String>) -> Self {
        Self {
            option: "DELAY_TO_CANCEL".to_string(),
            delay: Some(delay.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedRecord {
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_system_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_offer_id: Option<String>,
}

/// A booking record. Immutable once the upstream has created it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "type", default = "default_order_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associated_records: Vec<AssociatedRecord>,
    #[serde(default)]
    pub flight_offers: Vec<Offer>,
    #[serde(default)]
    pub travelers: Vec<Traveler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticketing_agreement: Option<TicketingAgreement>,
    #[serde(flatten)]
    pub extra: Extra,
}

fn default_order_type() -> String {
    ORDER_TYPE.to_string()
}

impl Order {
    /// Order as submitted for booking; the upstream assigns the id.
    pub fn draft(
        priced: &PricedOffer,
        travelers: Vec<Traveler>,
        ticketing_agreement: Option<TicketingAgreement>,
    ) -> Self {
        Self {
            kind: default_order_type(),
            id: String::new(),
            associated_records: Vec::new(),
            flight_offers: vec![priced.offer.clone()],
            travelers,
            ticketing_agreement,
            extra: Extra::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::IncompleteOrder("missing order id".to_string()));
        }
        if self.flight_offers.is_empty() {
            return Err(ValidationError::IncompleteOrder(
                "no flight offer attached".to_string(),
            ));
        }
        if self.travelers.is_empty() {
            return Err(ValidationError::IncompleteOrder("no traveler attached".to_string()));
        }
        Ok(())
    }

    /// Record locator of the reservation, when the upstream returned one.
    pub fn reference(&self) -> Option<&str> {
        self.associated_records
            .first()
            .map(|record| record.reference.as_str())
    }

    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&OrderEnvelope::borrowed(self))
    }

    pub fn from_wire(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<OrderEnvelope<Order>>(body).map(|envelope| envelope.data)
    }
}

// `{"data": ...}` wrapper used by every flight-order exchange
#[derive(Debug, Deserialize, Serialize)]
pub struct OrderEnvelope<T> {
    pub data: T,
}

impl<'a> OrderEnvelope<&'a Order> {
    pub fn borrowed(order: &'a Order) -> Self {
        Self { data: order }
    }
}
