// Flight search input and the shopping response envelope

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::ValidationError;
use crate::offer::Offer;

pub const MAX_ADULTS: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl TravelClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelClass::Economy => "ECONOMY",
            TravelClass::PremiumEconomy => "PREMIUM_ECONOMY",
            TravelClass::Business => "BUSINESS",
            TravelClass::First => "FIRST",
        }
    }
}

impl fmt::Display for TravelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the traveler is looking for. Immutable input to the search stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub adults: u32,
    #[serde(default)]
    pub included_airlines: Vec<String>,
    #[serde(default)]
    pub non_stop: Option<bool>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub travel_class: Option<TravelClass>,
    #[serde(default)]
    pub max_results: Option<u32>,
}

impl SearchCriteria {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: NaiveDate,
        adults: u32,
    ) -> Self {
        Self {
            origin: origin.into().trim().to_ascii_uppercase(),
            destination: destination.into().trim().to_ascii_uppercase(),
            departure_date,
            adults,
            included_airlines: Vec::new(),
            non_stop: None,
            currency: None,
            travel_class: None,
            max_results: None,
        }
    }

    pub fn with_airlines<I, S>(mut self, airlines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included_airlines = airlines
            .into_iter()
            .map(|code| code.into().trim().to_ascii_uppercase())
            .collect();
        self
    }

    pub fn non_stop(mut self, non_stop: bool) -> Self {
        self.non_stop = Some(non_stop);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into().trim().to_ascii_uppercase());
        self
    }

    pub fn with_travel_class(mut self, travel_class: TravelClass) -> Self {
        self.travel_class = Some(travel_class);
        self
    }

    pub fn with_max_results(mut self, max: u32) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |msg: String| Err(ValidationError::InvalidCriteria(msg));

        if !is_code(&self.origin, 3) {
            return invalid(format!("origin {:?} is not an IATA location code", self.origin));
        }
        if !is_code(&self.destination, 3) {
            return invalid(format!(
                "destination {:?} is not an IATA location code",
                self.destination
            ));
        }
        if self.origin == self.destination {
            return invalid("origin and destination are the same".to_string());
        }
        if self.adults == 0 || self.adults > MAX_ADULTS {
            return invalid(format!("adults must be between 1 and {MAX_ADULTS}"));
        }
        if let Some(code) = self
            .included_airlines
            .iter()
            .find(|code| code.len() != 2 || !code.bytes().all(|b| b.is_ascii_alphanumeric()))
        {
            return invalid(format!("{code:?} is not an airline code"));
        }
        if let Some(currency) = &self.currency {
            if !is_code(currency, 3) {
                return invalid(format!("{currency:?} is not a currency code"));
            }
        }
        if self.max_results == Some(0) {
            return invalid("max results must be positive".to_string());
        }
        Ok(())
    }

    // Query string of GET /v2/shopping/flight-offers
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("originLocationCode".to_string(), self.origin.clone()),
            ("destinationLocationCode".to_string(), self.destination.clone()),
            (
                "departureDate".to_string(),
                self.departure_date.format("%Y-%m-%d").to_string(),
            ),
            ("adults".to_string(), self.adults.to_string()),
        ];
        if !self.included_airlines.is_empty() {
            query.push((
                "includedAirlineCodes".to_string(),
                self.included_airlines.join(","),
            ));
        }
        if let Some(non_stop) = self.non_stop {
            query.push(("nonStop".to_string(), non_stop.to_string()));
        }
        if let Some(currency) = &self.currency {
            query.push(("currencyCode".to_string(), currency.clone()));
        }
        if let Some(travel_class) = self.travel_class {
            query.push(("travelClass".to_string(), travel_class.to_string()));
        }
        if let Some(max) = self.max_results {
            query.push(("max".to_string(), max.to_string()));
        }
        query
    }
}

fn is_code(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_uppercase())
}

// Data structures for the shopping response
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchResponse {
    pub data: Vec<Offer>,
    #[serde(default)]
    pub dictionaries: Option<Dictionaries>,
}

/// Code lookups shipped next to the offers; not needed by the pipeline itself.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Dictionaries {
    pub locations: HashMap<String, LocationEntry>,
    pub aircraft: HashMap<String, String>,
    pub currencies: HashMap<String, String>,
    pub carriers: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocationEntry {
    pub city_code: String,
    pub country_code: String,
}

impl Dictionaries {
    pub fn carrier_name(&self, code: &str) -> Option<&str> {
        self.carriers.get(code).map(String::as_str)
    }

    pub fn aircraft_name(&self, code: &str) -> Option<&str> {
        self.aircraft.get(code).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct SearchResults {
    pub offers: Vec<Offer>,
    pub dictionaries: Dictionaries,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn criteria() -> SearchCriteria {
        SearchCriteria::new("ari", "SCL", NaiveDate::from_ymd_opt(2023, 12, 2).unwrap(), 1)
    }

    #[test]
    fn test_query_with_filters() {
        let criteria = criteria()
            .with_airlines(["LA", "ja", "H2"])
            .non_stop(true)
            .with_currency("clp")
            .with_travel_class(TravelClass::Economy);
        assert!(criteria.validate().is_ok());

        let query: HashMap<_, _> = criteria.to_query().into_iter().collect();
        assert_eq!(query["originLocationCode"], "ARI");
        assert_eq!(query["destinationLocationCode"], "SCL");
        assert_eq!(query["departureDate"], "2023-12-02");
        assert_eq!(query["adults"], "1");
        assert_eq!(query["includedAirlineCodes"], "LA,JA,H2");
        assert_eq!(query["nonStop"], "true");
        assert_eq!(query["currencyCode"], "CLP");
        assert_eq!(query["travelClass"], "ECONOMY");
        assert!(!query.contains_key("max"));
    }

    #[test]
    fn test_minimal_query_omits_filters() {
        let query = criteria().to_query();
        assert_eq!(query.len(), 4);
    }

    #[test_case(SearchCriteria { origin: "AR".into(), ..criteria() } ; "short origin")]
    #[test_case(SearchCriteria { destination: "ARI".into(), ..criteria() } ; "same airports")]
    #[test_case(SearchCriteria { adults: 0, ..criteria() } ; "no adults")]
    #[test_case(SearchCriteria { adults: 10, ..criteria() } ; "too many adults")]
    #[test_case(criteria().with_airlines(["LAN"]) ; "bad airline code")]
    #[test_case(criteria().with_currency("PESO") ; "bad currency")]
    #[test_case(criteria().with_max_results(0) ; "zero max results")]
    fn test_invalid_criteria(criteria: SearchCriteria) {
        assert!(matches!(
            criteria.validate(),
            Err(ValidationError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn test_dictionaries_lookup() {
        let json = r#"{
            "locations": {"ARI": {"cityCode": "ARI", "countryCode": "CL"}},
            "aircraft": {"320": "AIRBUS A320"},
            "currencies": {"CLP": "CHILEAN PESO"},
            "carriers": {"LA": "LATAM AIRLINES GROUP"}
        }"#;
        let dictionaries: Dictionaries = serde_json::from_str(json).unwrap();
        assert_eq!(dictionaries.carrier_name("LA"), Some("LATAM AIRLINES GROUP"));
        assert_eq!(dictionaries.aircraft_name("320"), Some("AIRBUS A320"));
        assert_eq!(dictionaries.locations["ARI"].country_code, "CL");
        assert_eq!(dictionaries.carrier_name("XX"), None);
    }
}
