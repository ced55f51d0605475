//! In-memory gateway and signed-lookup fakes for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use nearbite_core::{Candidate, EnrichedResult, GeoPoint};
use nearbite_places::{PlacesError, PlacesGateway};

use crate::signed::SignedLookup;

pub(crate) fn result(place_id: &str) -> EnrichedResult {
    EnrichedResult {
        place_id: place_id.to_owned(),
        name: format!("Restaurant {place_id}"),
        address: String::new(),
        maps_url: String::new(),
        reservable: false,
        price_level: None,
        dine_in: None,
        phone: None,
        website: None,
        lat: None,
        lng: None,
        signed: false,
    }
}

fn provider_error(body: &str) -> PlacesError {
    PlacesError::Api {
        status: 500,
        body: body.to_owned(),
    }
}

#[derive(Default)]
pub(crate) struct FakeGateway {
    geocode: Option<GeoPoint>,
    geocode_calls: AtomicUsize,
    nearby: Vec<String>,
    nearby_fails: bool,
    nearby_calls: Mutex<Vec<(GeoPoint, u32)>>,
    candidates: Vec<Candidate>,
    details: HashMap<String, EnrichedResult>,
    failing: HashSet<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub(crate) fn with_geocode(mut self, point: GeoPoint) -> Self {
        self.geocode = Some(point);
        self
    }

    pub(crate) fn with_nearby(mut self, ids: &[&str]) -> Self {
        self.nearby = ids.iter().map(|s| (*s).to_owned()).collect();
        self
    }

    pub(crate) fn failing_nearby(mut self) -> Self {
        self.nearby_fails = true;
        self
    }

    pub(crate) fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates = candidates;
        self
    }

    pub(crate) fn with_details<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        for id in ids {
            self.details
                .insert(id.as_ref().to_owned(), result(id.as_ref()));
        }
        self
    }

    pub(crate) fn failing_details(mut self, id: &str) -> Self {
        self.failing.insert(id.to_owned());
        self
    }

    pub(crate) fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn nearby_calls(&self) -> Vec<(GeoPoint, u32)> {
        self.nearby_calls.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn detail_log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl PlacesGateway for FakeGateway {
    async fn geocode(&self, _text: &str) -> Result<GeoPoint, PlacesError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.geocode.ok_or_else(|| PlacesError::GeocodeStatus {
            status: "ZERO_RESULTS".to_owned(),
            message: None,
        })
    }

    async fn text_search_candidates(&self, _text: &str) -> Result<Vec<Candidate>, PlacesError> {
        Ok(self.candidates.clone())
    }

    async fn nearby_search(
        &self,
        center: GeoPoint,
        radius_meters: u32,
    ) -> Result<Vec<String>, PlacesError> {
        self.nearby_calls
            .lock()
            .unwrap()
            .push((center, radius_meters));
        if self.nearby_fails {
            return Err(provider_error("RESOURCE_EXHAUSTED"));
        }
        Ok(self.nearby.clone())
    }

    async fn get_details(&self, place_id: &str) -> Result<EnrichedResult, PlacesError> {
        self.log.lock().unwrap().push(format!("start:{place_id}"));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(2)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(format!("end:{place_id}"));

        if self.failing.contains(place_id) {
            return Err(provider_error("INTERNAL"));
        }
        self.details
            .get(place_id)
            .cloned()
            .ok_or_else(|| PlacesError::Api {
                status: 404,
                body: "NOT_FOUND".to_owned(),
            })
    }
}

#[derive(Default)]
pub(crate) struct FakeSigned {
    pub(crate) signed: HashSet<String>,
    pub(crate) fail: bool,
}

impl FakeSigned {
    pub(crate) fn with(ids: &[&str]) -> Self {
        Self {
            signed: ids.iter().map(|s| (*s).to_owned()).collect(),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            signed: HashSet::new(),
            fail: true,
        }
    }
}

impl SignedLookup for FakeSigned {
    type Error = String;

    async fn signed_among(&self, place_ids: &[String]) -> Result<HashSet<String>, String> {
        if self.fail {
            return Err("relation \"signed_restaurants\" does not exist".to_owned());
        }
        Ok(place_ids
            .iter()
            .filter(|id| self.signed.contains(*id))
            .cloned()
            .collect())
    }
}
