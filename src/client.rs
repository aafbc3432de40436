use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::COOKIE;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::Result;

/// Create the default HTTP client for API requests
/// with optimized settings for connection pooling and timeouts
pub fn create_http_client() -> Client {
    ClientBuilder::new()
        .pool_max_idle_per_host(50)
        .timeout(Duration::from_secs(300)) // 5 minutes
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client")
}

/// Session cookie attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name, `PVEAuthCookie` or `PMGAuthCookie`
    pub name: String,
    /// Session ticket value
    pub value: String,
}

/// Request body placement for state-mutating verbs
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Form-encoded key/value pairs
    Form(Vec<(String, String)>),
    /// JSON-encoded document
    Json(Value),
}

/// One fully-specified HTTP request, ready for a transport to send.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP verb
    pub method: Method,
    /// Absolute URL without query string
    pub url: String,
    /// Query string pairs
    pub query: Vec<(String, String)>,
    /// Extra headers (name, value)
    pub headers: Vec<(String, String)>,
    /// Session cookie, absent only for the login request
    pub cookie: Option<Cookie>,
    /// Body for POST/PUT/DELETE
    pub body: Option<RequestBody>,
}

/// Raw HTTP response as seen by the normalization layer: status and body,
/// nothing else. Non-2xx statuses are ordinary values here, never errors.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

/// A blocking HTTP transport.
///
/// The client talks to the network exclusively through this trait, so tests
/// can substitute a scripted fake and assert on the requests it records.
/// Implementations must return non-2xx responses as ordinary
/// [`HttpResponse`] values and reserve errors for transport-level failures
/// (connection refused, TLS, DNS).
pub trait HttpTransport {
    /// Send one request and return its raw response
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Default transport backed by a blocking reqwest client.
///
/// TLS certificate verification is always enabled.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the default client settings
    pub fn new() -> Self {
        ReqwestTransport {
            client: create_http_client(),
        }
    }

    /// Create a transport from a pre-configured reqwest client, e.g. to set
    /// custom timeouts or proxy settings
    pub fn with_client(client: Client) -> Self {
        ReqwestTransport { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut url = Url::parse(&request.url)?;
        for (key, value) in &request.query {
            url.query_pairs_mut().append_pair(key, value);
        }

        let mut builder = self.client.request(request.method, url.as_str());

        if let Some(cookie) = &request.cookie {
            builder = builder.header(COOKIE, format!("{}={}", cookie.name, cookie.value));
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match request.body {
            Some(RequestBody::Form(fields)) => builder = builder.form(&fields),
            Some(RequestBody::Json(value)) => builder = builder.json(&value),
            None => {}
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = HttpRequest {
            method: Method::GET,
            url: "https://pve1:8006/api2/json/version".to_string(),
            query: vec![("full".to_string(), "1".to_string())],
            headers: vec![],
            cookie: Some(Cookie {
                name: "PVEAuthCookie".to_string(),
                value: "ticket".to_string(),
            }),
            body: None,
        };

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.cookie.unwrap().name, "PVEAuthCookie");
    }
}
