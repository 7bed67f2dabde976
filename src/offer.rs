// Canonical flight offer schema shared by the search, pricing and booking stages.
// Fields the pipeline does not look at are kept in `extra` and written back out
// untouched, so the offer forwarded to pricing/booking is the one the upstream sent.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::money::Amount;

pub type Extra = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(rename = "type", default = "default_offer_type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub instant_ticketing_required: bool,
    #[serde(default)]
    pub non_homogeneous: bool,
    #[serde(default)]
    pub one_way: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ticketing_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_bookable_seats: Option<u32>,
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_options: Option<PricingOptions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validating_airline_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traveler_pricings: Vec<TravelerPricing>,
    #[serde(flatten)]
    pub extra: Extra,
}

fn default_offer_type() -> String {
    "flight-offer".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One flown leg between two airports on one aircraft.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub departure: FlightEndpoint,
    pub arrival: FlightEndpoint,
    /// Marketing carrier.
    pub carrier_code: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft: Option<Aircraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating: Option<OperatingFlight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub number_of_stops: u32,
    #[serde(default, rename = "blacklistedInEU")]
    pub blacklisted_in_eu: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Segment {
    pub fn marketing_carrier(&self) -> &str {
        &self.carrier_code
    }

    /// Operating carrier code; empty when the upstream left it out.
    pub fn operating_carrier(&self) -> &str {
        self.operating
            .as_ref()
            .map(|op| op.carrier_code.as_str())
            .unwrap_or("")
    }

    pub fn flight_number(&self) -> String {
        format!("{}{}", self.carrier_code, self.number)
    }

    pub fn is_codeshare(&self) -> bool {
        let operating = self.operating_carrier();
        !operating.is_empty() && operating != self.carrier_code
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightEndpoint {
    pub iata_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Aircraft {
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatingFlight {
    #[serde(default)]
    pub carrier_code: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub currency: String,
    pub total: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<Amount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fees: Vec<Fee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grand_total: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_currency: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Fee {
    pub amount: Amount,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PricingOptions {
    pub fare_type: Vec<String>,
    pub included_checked_bags_only: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerPricing {
    pub traveler_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fare_option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traveler_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<TravelerPrice>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerPrice {
    pub currency: String,
    pub total: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<Amount>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Offer {
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.itineraries.iter().flat_map(|it| it.segments.iter())
    }

    pub fn segments_mut(&mut self) -> impl Iterator<Item = &mut Segment> {
        self.itineraries
            .iter_mut()
            .flat_map(|it| it.segments.iter_mut())
    }

    pub fn total(&self) -> &Amount {
        &self.price.total
    }

    /// Travelers the fare was quoted for (at least one).
    pub fn priced_traveler_count(&self) -> usize {
        self.traveler_pricings.len().max(1)
    }

    pub fn stop_count(&self) -> u32 {
        self.itineraries
            .iter()
            .map(|it| {
                let connections = it.segments.len().saturating_sub(1) as u32;
                connections + it.segments.iter().map(|s| s.number_of_stops).sum::<u32>()
            })
            .sum()
    }
}

// A change between the searched and the confirmed total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FareChange {
    pub currency: String,
    pub previous: Amount,
    pub current: Amount,
}

impl FareChange {
    pub fn between(searched: &Offer, priced: &Offer) -> Option<Self> {
        let same_currency = searched.price.currency == priced.price.currency;
        if same_currency && searched.price.total.same_value(&priced.price.total) {
            return None;
        }
        Some(Self {
            currency: priced.price.currency.clone(),
            previous: searched.price.total.clone(),
            current: priced.price.total.clone(),
        })
    }

    pub fn is_increase(&self) -> bool {
        self.current.cmp_value(&self.previous).is_gt()
    }
}

/// An offer confirmed by the pricing stage; its total is the binding one.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOffer {
    pub offer: Offer,
    pub booking_requirements: Option<Value>,
    pub fare_change: Option<FareChange>,
}

impl PricedOffer {
    pub fn id(&self) -> &str {
        &self.offer.id
    }

    pub fn total(&self) -> &Amount {
        self.offer.total()
    }

    pub fn currency(&self) -> &str {
        &self.offer.price.currency
    }

    pub fn required_travelers(&self) -> usize {
        self.offer.priced_traveler_count()
    }
}

// Pricing envelopes: POST /v1/shopping/flight-offers/pricing
pub const PRICING_REQUEST_TYPE: &str = "flight-offers-pricing";

#[derive(Debug, Serialize)]
pub struct PricingRequest<'a> {
    pub data: PricingRequestData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRequestData<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub flight_offers: [&'a Offer; 1],
}

impl<'a> PricingRequest<'a> {
    pub fn for_offer(offer: &'a Offer) -> Self {
        Self {
            data: PricingRequestData {
                kind: PRICING_REQUEST_TYPE,
                flight_offers: [offer],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PricingResponse {
    pub data: PricingResponseData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponseData {
    #[serde(default)]
    pub flight_offers: Vec<Offer>,
    #[serde(default)]
    pub booking_requirements: Option<Value>,
}
