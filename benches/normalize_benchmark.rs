use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flight_order_pipeline::normalizer::normalize_all;
use flight_order_pipeline::offer::{Offer, OperatingFlight};
use flight_order_pipeline::search::SearchResponse;
use rand::{seq::SliceRandom, thread_rng, Rng};

const SEARCH_RESPONSE: &str = include_str!("../samples/search_response.json");

// Offers with a random mix of missing, blank and codeshare operating carriers
fn generate_offers(count: usize) -> Vec<Offer> {
    let response: SearchResponse = serde_json::from_str(SEARCH_RESPONSE).unwrap();
    let template = response.data.into_iter().next().unwrap();
    let carriers = ["LA", "JA", "H2", "JJ"];
    let mut rng = thread_rng();

    (0..count)
        .map(|i| {
            let mut offer = template.clone();
            offer.id = (i + 1).to_string();
            let leg = offer.itineraries[0].segments[0].clone();
            offer.itineraries[0].segments = (0..rng.gen_range(1..=4))
                .map(|_| {
                    let mut segment = leg.clone();
                    segment.carrier_code = carriers.choose(&mut rng).unwrap().to_string();
                    segment.operating = match rng.gen_range(0..3) {
                        0 => None,
                        1 => Some(OperatingFlight::default()),
                        _ => Some(OperatingFlight {
                            carrier_code: carriers.choose(&mut rng).unwrap().to_string(),
                        }),
                    };
                    segment
                })
                .collect();
            offer
        })
        .collect()
}

pub fn normalize_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("operating_carrier_backfill");

    for count in [10, 100, 1000].iter() {
        let offers = generate_offers(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &offers, |b, offers| {
            b.iter(|| {
                let mut offers = offers.clone();
                normalize_all(&mut offers);
                black_box(offers)
            });
        });
    }

    group.finish();
}

pub fn decode_benchmark(c: &mut Criterion) {
    c.bench_function("decode_search_response", |b| {
        b.iter(|| {
            let response: SearchResponse =
                serde_json::from_str(black_box(SEARCH_RESPONSE)).unwrap();
            black_box(response)
        });
    });
}

criterion_group!(benches, normalize_benchmark, decode_benchmark);
criterion_main!(benches);
