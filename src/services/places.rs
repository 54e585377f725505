use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Coordinates, Place};

/// Errors that can occur when querying the places API
#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Client for the external nearby-places API
///
/// Finds hospitals and blood banks that are not registered locally. Results
/// come back unordered; callers run them through the proximity filter.
pub struct PlacesClient {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    name: String,
    vicinity: Option<String>,
    formatted_address: Option<String>,
    geometry: Geometry,
    rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<PlaceResult> for Place {
    fn from(r: PlaceResult) -> Self {
        Place {
            place_id: r.place_id,
            name: r.name,
            address: r.vicinity.or(r.formatted_address).unwrap_or_default(),
            latitude: r.geometry.location.lat,
            longitude: r.geometry.location.lng,
            rating: r.rating,
        }
    }
}

impl PlacesClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, PlacesError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    /// Hospitals around `origin`
    pub async fn nearby_hospitals(
        &self,
        origin: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<Place>, PlacesError> {
        let url = format!(
            "{}/nearbysearch/json?location={},{}&radius={}&type=hospital&key={}",
            self.base_url.trim_end_matches('/'),
            origin.latitude,
            origin.longitude,
            radius_meters(radius_km),
            urlencoding::encode(&self.api_key)
        );

        self.search(&url).await
    }

    /// Blood banks around `origin`, found by text search
    pub async fn nearby_blood_banks(
        &self,
        origin: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<Place>, PlacesError> {
        let url = format!(
            "{}/textsearch/json?query={}&location={},{}&radius={}&key={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode("blood bank"),
            origin.latitude,
            origin.longitude,
            radius_meters(radius_km),
            urlencoding::encode(&self.api_key)
        );

        self.search(&url).await
    }

    async fn search(&self, url: &str) -> Result<Vec<Place>, PlacesError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(PlacesError::ApiError(format!(
                "places lookup failed: {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| PlacesError::InvalidResponse(e.to_string()))?;

        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            other => {
                return Err(PlacesError::ApiError(match body.error_message {
                    Some(msg) => format!("{}: {}", other, msg),
                    None => other.to_string(),
                }))
            }
        }

        tracing::debug!("Places lookup returned {} results", body.results.len());

        Ok(body.results.into_iter().map(Place::from).collect())
    }
}

fn radius_meters(radius_km: f64) -> u64 {
    (radius_km * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> PlacesClient {
        PlacesClient::new(server.url(), "test-key".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_nearby_hospitals_maps_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/nearbysearch/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("location".into(), "28.2132,83.9634".into()),
                Matcher::UrlEncoded("radius".into(), "5000".into()),
                Matcher::UrlEncoded("type".into(), "hospital".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "status": "OK",
                    "results": [{
                        "place_id": "abc123",
                        "name": "Manipal Teaching Hospital",
                        "vicinity": "Phulbari-11, Pokhara",
                        "geometry": {"location": {"lat": 28.2397, "lng": 83.9956}},
                        "rating": 4.1
                    }]
                }"#,
            )
            .create_async()
            .await;

        let places = client(&server)
            .nearby_hospitals(Coordinates::new(28.2132, 83.9634), 5.0)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].place_id, "abc123");
        assert_eq!(places[0].address, "Phulbari-11, Pokhara");
        assert_eq!(places[0].rating, Some(4.1));
    }

    #[tokio::test]
    async fn test_blood_banks_use_formatted_address() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/textsearch/json")
            .match_query(Matcher::UrlEncoded("query".into(), "blood bank".into()))
            .with_status(200)
            .with_body(
                r#"{
                    "status": "OK",
                    "results": [{
                        "place_id": "bb1",
                        "name": "Red Cross Blood Bank",
                        "formatted_address": "Ramghat, Pokhara",
                        "geometry": {"location": {"lat": 28.2180, "lng": 83.9870}}
                    }]
                }"#,
            )
            .create_async()
            .await;

        let places = client(&server)
            .nearby_blood_banks(Coordinates::new(28.2132, 83.9634), 5.0)
            .await
            .unwrap();

        assert_eq!(places[0].address, "Ramghat, Pokhara");
        assert!(places[0].rating.is_none());
    }

    #[tokio::test]
    async fn test_zero_results_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/nearbysearch/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status": "ZERO_RESULTS", "results": []}"#)
            .create_async()
            .await;

        let places = client(&server)
            .nearby_hospitals(Coordinates::new(0.0, 0.0), 1.0)
            .await
            .unwrap();
        assert!(places.is_empty());
    }

    #[tokio::test]
    async fn test_denied_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/nearbysearch/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#)
            .create_async()
            .await;

        let err = client(&server)
            .nearby_hospitals(Coordinates::new(0.0, 0.0), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, PlacesError::ApiError(msg) if msg.starts_with("REQUEST_DENIED")));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/nearbysearch/json")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let err = client(&server)
            .nearby_hospitals(Coordinates::new(0.0, 0.0), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, PlacesError::ApiError(_)));
    }

    #[test]
    fn test_radius_meters() {
        assert_eq!(radius_meters(5.0), 5000);
        assert_eq!(radius_meters(0.25), 250);
    }
}
