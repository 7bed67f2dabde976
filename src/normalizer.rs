// Operating-carrier backfill.
// The upstream leaves `operating` out (or blank) when the marketing carrier flies
// the leg itself; pricing and booking expect it filled in.

use crate::offer::{Offer, OperatingFlight, Segment};

/// Copy the marketing carrier into every leg whose operating carrier is empty.
/// Legs that already name an operating carrier are left alone, so applying this
/// twice gives the same offer as applying it once.
pub fn normalize_offer(offer: &mut Offer) {
    for segment in offer.segments_mut() {
        backfill_operating_carrier(segment);
    }
}

pub fn normalize(mut offer: Offer) -> Offer {
    normalize_offer(&mut offer);
    offer
}

pub fn normalize_all(offers: &mut [Offer]) {
    offers.iter_mut().for_each(normalize_offer);
}

fn backfill_operating_carrier(segment: &mut Segment) {
    if !segment.operating_carrier().trim().is_empty() || segment.carrier_code.is_empty() {
        return;
    }
    let marketing = segment.carrier_code.clone();
    segment
        .operating
        .get_or_insert_with(OperatingFlight::default)
        .carrier_code = marketing;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchResponse;
    use test_case::test_case;

    const SEARCH_RESPONSE: &str = include_str!("../samples/search_response.json");

    // Two itineraries, three legs; the middle one is a codeshare
    fn multi_leg_offer() -> Offer {
        let response: SearchResponse = serde_json::from_str(SEARCH_RESPONSE).unwrap();
        let mut offer = response.data.into_iter().next().unwrap();
        let leg = offer.itineraries[0].segments[0].clone();

        let mut codeshare = leg.clone();
        codeshare.carrier_code = "LA".to_string();
        codeshare.number = "8001".to_string();
        codeshare.operating = Some(OperatingFlight {
            carrier_code: "JJ".to_string(),
        });

        let mut blank = leg.clone();
        blank.carrier_code = "H2".to_string();
        blank.operating = Some(OperatingFlight {
            carrier_code: "  ".to_string(),
        });

        offer.itineraries[0].segments.push(codeshare);
        let mut inbound = offer.itineraries[0].clone();
        inbound.segments = vec![blank];
        offer.itineraries.push(inbound);
        offer
    }

    #[test]
    fn test_backfills_empty_operating_carrier() {
        let offer = normalize(multi_leg_offer());
        let operating: Vec<_> = offer.segments().map(Segment::operating_carrier).collect();
        assert_eq!(operating, ["LA", "JJ", "H2"]);
    }

    #[test_case(None, "LA", "LA" ; "absent operating")]
    #[test_case(Some(""), "LA", "LA" ; "empty operating")]
    #[test_case(Some("JJ"), "LA", "JJ" ; "codeshare untouched")]
    #[test_case(Some("LA"), "LA", "LA" ; "already set")]
    #[test_case(None, "", "" ; "no marketing carrier")]
    fn test_single_leg(operating: Option<&str>, marketing: &str, expected: &str) {
        let mut offer = multi_leg_offer();
        offer.itineraries.truncate(1);
        offer.itineraries[0].segments.truncate(1);
        let segment = &mut offer.itineraries[0].segments[0];
        segment.carrier_code = marketing.to_string();
        segment.operating = operating.map(|code| OperatingFlight {
            carrier_code: code.to_string(),
        });

        let offer = normalize(offer);
        assert_eq!(offer.segments().next().unwrap().operating_carrier(), expected);
    }

    #[test]
    fn test_idempotent() {
        let once = normalize(multi_leg_offer());
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_empty_operating_is_noop() {
        let mut offer = multi_leg_offer();
        for segment in offer.segments_mut() {
            segment.operating = Some(OperatingFlight {
                carrier_code: "XL".to_string(),
            });
        }
        let before = offer.clone();
        assert_eq!(normalize(offer), before);
    }

    #[test]
    fn test_normalize_all() {
        let mut offers = vec![multi_leg_offer(), multi_leg_offer()];
        normalize_all(&mut offers);
        assert!(offers
            .iter()
            .flat_map(|offer| offer.segments())
            .all(|s| !s.operating_carrier().trim().is_empty()));
    }
}
