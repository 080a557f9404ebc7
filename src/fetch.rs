//! HTTP request helper shared by the auth and data clients

use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Value sent in the `X-Client-Info` header
pub const CLIENT_INFO: &str = concat!("event-planner/", env!("CARGO_PKG_VERSION"));

/// Error body shapes returned by GoTrue and PostgREST
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Build an [`Error::Api`] from a failed response, keeping the backend's own message
pub(crate) fn api_error(status: StatusCode, body: &str) -> Error {
    let parsed = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.msg.or(b.message).or(b.error_description).or(b.error));

    let message = match parsed {
        Some(message) => message,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
        None => body.trim().to_string(),
    };

    Error::api(status, message)
}

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    client: &'a Client,
    url: String,
    method: Method,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder
    pub fn new(client: &'a Client, url: &str, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("X-Client-Info", HeaderValue::from_static(CLIENT_INFO));

        Self {
            client,
            url: url.to_string(),
            method,
            headers,
            query_params: Vec::new(),
            body: None,
        }
    }

    /// Add a header to the request; values that are not valid header text are skipped
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add bearer token authentication to the request
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", &format!("Bearer {}", token))
    }

    /// Add query parameters to the request, in order
    pub fn query(mut self, params: &[(String, String)]) -> Self {
        self.query_params.extend(params.iter().cloned());
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(body)?;
        self.body = Some(json);
        Ok(self)
    }

    /// Build the request
    fn build(&self) -> Result<RequestBuilder, Error> {
        let mut url = Url::parse(&self.url)?;

        if !self.query_params.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                query_pairs.append_pair(key, value);
            }
        }

        debug!("{} {}", self.method, url.path());

        let mut req = self.client.request(self.method.clone(), url.as_str());
        req = req.headers(self.headers.clone());

        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        Ok(req)
    }

    /// Execute the request and parse the response as JSON
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let response = self.execute_checked().await?;
        let result = response.json::<T>().await?;
        Ok(result)
    }

    /// Execute the request, discarding any response body
    pub async fn execute_empty(&self) -> Result<(), Error> {
        self.execute_checked().await?;
        Ok(())
    }

    /// Execute the request and return the raw response, whatever its status
    pub async fn execute_raw(&self) -> Result<Response, Error> {
        let req = self.build()?;
        let response = req.send().await?;
        Ok(response)
    }

    async fn execute_checked(&self) -> Result<Response, Error> {
        let response = self.execute_raw().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, &text));
        }

        Ok(response)
    }
}

/// Helper for creating HTTP requests
pub struct Fetch;

impl Fetch {
    /// Create a GET request
    pub fn get<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::GET)
    }

    /// Create a POST request
    pub fn post<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::POST)
    }

    /// Create a PATCH request
    pub fn patch<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::PATCH)
    }

    /// Create a DELETE request
    pub fn delete<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::DELETE)
    }
}
