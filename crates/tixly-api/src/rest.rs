// Hand-crafted async HTTP client for the ticketing service REST gateway.
//
// All collection endpoints hang directly off the base URL
// (`/tickets`, `/persons`, ...); paged reads return a Spring-style
// `{content, totalElements}` envelope.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Error;

// ── Error response shape from the gateway ────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

// ── Page envelope ────────────────────────────────────────────────────

/// One page of a collection, as the gateway returns it.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    /// The page contents, in server order.
    pub content: Vec<T>,
    /// Total entities matching the query across all pages.
    pub total_elements: i64,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the ticketing service REST gateway.
///
/// Collection reads come in two shapes: paged (`list_page`, with the
/// envelope above) and plain (`list_all`). Point writes are `create`,
/// `update`, `delete_entity`.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and transport config.
    pub fn new(base_url: &str, transport: &crate::TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Parse the base URL and guarantee a trailing slash, so joining
    /// relative collection paths never swallows a path segment.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"tickets"`) onto the base URL.
    fn url(&self, path: &str) -> Url {
        // base_url always ends with `/`, so joining relative paths works.
        self.base_url
            .join(path)
            .expect("path should be valid relative URL")
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path);
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        Self::handle_response(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        Self::handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    async fn post_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("POST {url} params={params:?}");

        let resp = self.http.post(url).query(params).send().await?;
        Self::handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path);
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        Self::handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    /// Map a non-2xx response to [`Error::Server`], extracting the
    /// gateway's structured `{message}` payload when present.
    async fn fail(resp: reqwest::Response) -> Error {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| {
                if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.clone()
                }
            });
        Error::Server { message, status }
    }

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }
        Ok(())
    }

    // ── Collection operations ────────────────────────────────────────

    /// Fetch one page of a collection.
    ///
    /// `query` carries paging, sorting, and filter pairs already
    /// serialized by the caller (`QueryParameters` in `tixly-core`).
    pub async fn list_page<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &[(String, String)],
    ) -> Result<PageEnvelope<T>, Error> {
        self.get_with_params(collection, query).await
    }

    /// Fetch a whole collection without paging.
    pub async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
        self.get(path).await
    }

    /// Create an entity in a collection.
    pub async fn create<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        collection: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.post(collection, body).await
    }

    /// Replace an entity by id.
    pub async fn update<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        collection: &str,
        id: i64,
        body: &B,
    ) -> Result<T, Error> {
        self.put(&format!("{collection}/{id}"), body).await
    }

    /// Delete an entity by id.
    pub async fn delete_entity(&self, collection: &str, id: i64) -> Result<(), Error> {
        self.delete(&format!("{collection}/{id}")).await
    }

    // ── Ticket operations ────────────────────────────────────────────

    /// Sell a ticket to a person (price adjustment handled server-side).
    pub async fn sell_ticket<B: Serialize + Sync>(
        &self,
        body: &B,
    ) -> Result<serde_json::Value, Error> {
        self.post("tickets/sell", body).await
    }

    /// Cancel all bookings held by a person.
    pub async fn unbook_by_person(&self, person_id: i64) -> Result<serde_json::Value, Error> {
        self.post_with_params(
            "tickets/unbook",
            &[("personId".to_owned(), person_id.to_string())],
        )
        .await
    }

    /// Ticket counts grouped by coordinates.
    pub async fn count_grouped_by_coordinates(&self) -> Result<serde_json::Value, Error> {
        self.get("tickets/count_grouped_by_coordinates").await
    }

    /// Number of tickets whose `number` equals the given value.
    pub async fn count_by_number_equals(&self, number: i64) -> Result<i64, Error> {
        self.get(&format!("tickets/count_by_number_equals/{number}"))
            .await
    }

    /// Number of tickets whose `number` is less than the given value.
    pub async fn count_by_number_less(&self, number: i64) -> Result<i64, Error> {
        self.get(&format!("tickets/count_by_number_less/{number}"))
            .await
    }
}

// ── Tests ────────────────────────────────────────────────────────────
