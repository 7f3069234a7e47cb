//! Geocoding against the LocationIQ search API.

use serde::Deserialize;
use waypost_core::{
  Error, Result,
  external::{Geocoder, Place},
};

const SEARCH_URL: &str = "https://us1.locationiq.com/v1/search.php";

/// LocationIQ-backed [`Geocoder`].
///
/// The API key is optional: without one, coordinate lookups fail as
/// misconfigured and autocomplete degrades to an empty result.
#[derive(Clone)]
pub struct LocationIqGeocoder {
  client:  reqwest::Client,
  api_key: Option<String>,
}

// LocationIQ returns coordinates as decimal strings.
#[derive(Debug, Deserialize)]
struct SearchHit {
  display_name: String,
  lat:          String,
  lon:          String,
  #[serde(rename = "type", default)]
  kind:         String,
  #[serde(default)]
  class:        String,
}

impl LocationIqGeocoder {
  pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
    Self { client, api_key }
  }

  async fn fetch(&self, key: &str, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let resp = self
      .client
      .get(SEARCH_URL)
      .query(&[
        ("key", key),
        ("q", query),
        ("format", "json"),
        ("limit", &limit.to_string()),
      ])
      .send()
      .await
      .map_err(|e| Error::GeocodingUnavailable(e.to_string()))?;

    // LocationIQ answers 404 for a query with no match.
    if resp.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(vec![]);
    }
    if !resp.status().is_success() {
      return Err(Error::GeocodingUnavailable(format!(
        "locationiq returned {}",
        resp.status()
      )));
    }

    resp
      .json()
      .await
      .map_err(|e| Error::GeocodingUnavailable(e.to_string()))
  }
}

impl Geocoder for LocationIqGeocoder {
  async fn coordinates(&self, query: &str) -> Result<(f64, f64)> {
    let key = self
      .api_key
      .as_deref()
      .ok_or(Error::Misconfigured("locationiq_api_key"))?;

    let hits = self.fetch(key, query, 1).await?;
    let hit = hits
      .into_iter()
      .next()
      .ok_or_else(|| Error::LocationNotFound(query.to_owned()))?;

    let place = hit.into_place()?;
    Ok((place.lat, place.lon))
  }

  async fn search(&self, query: &str, limit: usize) -> Result<Vec<Place>> {
    let Some(key) = self.api_key.as_deref() else {
      return Ok(vec![]);
    };

    self
      .fetch(key, query, limit)
      .await?
      .into_iter()
      .map(SearchHit::into_place)
      .collect()
  }
}

impl SearchHit {
  fn into_place(self) -> Result<Place> {
    let lat = self
      .lat
      .parse()
      .map_err(|_| Error::GeocodingUnavailable(format!("bad latitude: {}", self.lat)))?;
    let lon = self
      .lon
      .parse()
      .map_err(|_| Error::GeocodingUnavailable(format!("bad longitude: {}", self.lon)))?;

    Ok(Place {
      display_name: self.display_name,
      lat,
      lon,
      kind: self.kind,
      class: self.class,
    })
  }
}
