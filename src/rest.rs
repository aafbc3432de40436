use std::cell::RefCell;
use std::time::Instant;

use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::{
    Cookie, HttpRequest, HttpResponse, HttpTransport, RequestBody, ReqwestTransport,
};
use crate::credentials::Credentials;
use crate::error::{PmxError, Result};
use crate::response::{ApiOutput, ResponseMode};
use crate::token::AuthToken;

/// Client for the Proxmox VE / PMG REST API.
///
/// Construction performs an eager login against the configured server and
/// caches the resulting [`AuthToken`]. Every request method re-checks the
/// cached ticket and transparently logs in again once it has expired.
///
/// The cached token lives in a `RefCell`, so a `Proxmox` instance is not
/// `Sync` and cannot be shared across threads; use one instance per thread
/// (or external synchronization around an owned instance). Independent
/// instances carry independent sessions, so multiple credentials can be in
/// use concurrently within one process.
pub struct Proxmox {
    transport: Box<dyn HttpTransport>,
    credentials: Credentials,
    mode: ResponseMode,
    token: RefCell<AuthToken>,
    debug: bool,
}

impl std::fmt::Debug for Proxmox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxmox")
            .field("mode", &self.mode)
            .field("token", &self.token)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl Proxmox {
    /// Create a client and log in over the default reqwest transport.
    ///
    /// Fails with [`PmxError::Authentication`] when the server does not
    /// issue a ticket for the given credentials.
    pub fn new(credentials: Credentials, mode: ResponseMode) -> Result<Self> {
        Self::with_transport(credentials, mode, Box::new(ReqwestTransport::new()))
    }

    /// Create a client over a caller-supplied transport.
    ///
    /// The transport is used for the initial login as well as all later
    /// requests; tests inject a scripted fake here.
    pub fn with_transport(
        credentials: Credentials,
        mode: ResponseMode,
        transport: Box<dyn HttpTransport>,
    ) -> Result<Self> {
        let token = perform_login(transport.as_ref(), &credentials)?;
        Ok(Proxmox {
            transport,
            credentials,
            mode,
            token: RefCell::new(token),
            debug: false,
        })
    }

    /// Enable a per-request timing line on stderr
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Request a fresh session ticket using the stored credentials.
    ///
    /// Does not touch the cached token; the cache is replaced by the
    /// session check inside the request path.
    pub fn login(&self) -> Result<AuthToken> {
        perform_login(self.transport.as_ref(), &self.credentials)
    }

    /// GET a resource from the API tree.
    ///
    /// `params` must serialize to a key/value mapping (or nothing); they are
    /// sent as the query string. Transparently logs in again first when the
    /// cached ticket has expired.
    pub fn get<P: Serialize>(&self, action_path: &str, params: P) -> Result<ApiOutput> {
        let params = into_params(params, "GET")?;
        let response = self.request_resource(action_path, params, "GET", false)?;
        Ok(self.mode.normalize(&response))
    }

    /// PUT to a resource in the API tree, form-encoded by default or as a
    /// JSON body when `as_json` is set. Transparently logs in again first
    /// when the cached ticket has expired.
    pub fn set<P: Serialize>(&self, action_path: &str, params: P, as_json: bool) -> Result<ApiOutput> {
        let params = into_params(params, "PUT")?;
        let response = self.request_resource(action_path, params, "PUT", as_json)?;
        Ok(self.mode.normalize(&response))
    }

    /// POST to a resource in the API tree, form-encoded by default or as a
    /// JSON body when `as_json` is set. Transparently logs in again first
    /// when the cached ticket has expired.
    pub fn create<P: Serialize>(
        &self,
        action_path: &str,
        params: P,
        as_json: bool,
    ) -> Result<ApiOutput> {
        let params = into_params(params, "POST")?;
        let response = self.request_resource(action_path, params, "POST", as_json)?;
        Ok(self.mode.normalize(&response))
    }

    /// DELETE a resource in the API tree, form-encoded by default or as a
    /// JSON body when `as_json` is set. Transparently logs in again first
    /// when the cached ticket has expired.
    pub fn delete<P: Serialize>(
        &self,
        action_path: &str,
        params: P,
        as_json: bool,
    ) -> Result<ApiOutput> {
        let params = into_params(params, "DELETE")?;
        let response = self.request_resource(action_path, params, "DELETE", as_json)?;
        Ok(self.mode.normalize(&response))
    }

    /// Retrieve the `/version` resource of the API tree
    pub fn version(&self) -> Result<ApiOutput> {
        self.get("/version", ())
    }

    /// Credentials this client was built with
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Response mode requests are shaped with
    pub fn response_mode(&self) -> ResponseMode {
        self.mode
    }

    /// Change the response mode for subsequent requests
    pub fn set_response_mode(&mut self, mode: ResponseMode) {
        self.mode = mode;
    }

    /// API URL requests are sent to, including the wire format segment.
    /// Sample value: `https://my-proxmox:8006/api2/json`
    pub fn api_url(&self) -> String {
        format!("{}/{}", self.credentials.api_url(), self.mode.wire_format())
    }

    /// Snapshot of the cached session token
    pub fn auth_token(&self) -> AuthToken {
        self.token.borrow().clone()
    }

    /// Replace the cached session token
    pub fn set_auth_token(&self, token: AuthToken) {
        self.token.replace(token);
    }

    /// Log in again if the cached ticket is no longer valid.
    ///
    /// The check-then-replace is not atomic; the `RefCell` restricts a
    /// client to one thread, so at worst a caller pays a redundant login.
    fn ensure_session(&self) -> Result<()> {
        if !self.token.borrow().is_valid() {
            let fresh = self.login()?;
            self.token.replace(fresh);
        }
        Ok(())
    }

    /// Build and send one request against the resource tree.
    ///
    /// The ticket travels as a cookie on every verb; the CSRF token only on
    /// state-mutating verbs. Non-2xx responses are returned, not raised.
    fn request_resource(
        &self,
        action_path: &str,
        params: Map<String, Value>,
        method: &str,
        as_json: bool,
    ) -> Result<HttpResponse> {
        self.ensure_session()?;

        let path = normalize_path(action_path);
        let url = format!("{}{}", self.api_url(), path);
        let (ticket, csrf) = {
            let token = self.token.borrow();
            (token.ticket().to_string(), token.csrf_token().to_string())
        };
        let cookie = Cookie {
            name: self.credentials.system().cookie_name().to_string(),
            value: ticket,
        };

        let request = match method {
            "GET" => HttpRequest {
                method: Method::GET,
                url,
                query: form_pairs(&params),
                headers: Vec::new(),
                cookie: Some(cookie),
                body: None,
            },
            "POST" | "PUT" | "DELETE" => {
                let http_method = match method {
                    "POST" => Method::POST,
                    "PUT" => Method::PUT,
                    _ => Method::DELETE,
                };
                let body = if as_json {
                    RequestBody::Json(Value::Object(params))
                } else {
                    RequestBody::Form(form_pairs(&params))
                };
                HttpRequest {
                    method: http_method,
                    url,
                    query: Vec::new(),
                    headers: vec![("CSRFPreventionToken".to_string(), csrf)],
                    cookie: Some(cookie),
                    body: Some(body),
                }
            }
            _ => {
                return Err(PmxError::InvalidArgument(format!(
                    "HTTP request method {} not allowed",
                    method
                )))
            }
        };

        let start = Instant::now();
        let response = self.transport.execute(request)?;

        if self.debug {
            let duration = start.elapsed();
            eprintln!(
                "[pmx] {} {} => {:?} (status: {})",
                method, path, duration, response.status
            );
        }

        Ok(response)
    }
}

/// POST the credentials to the ticket endpoint and build an [`AuthToken`]
/// from the response.
///
/// Login always speaks the `json` wire format, whatever response mode the
/// client is configured with. Any response without a usable `data` payload
/// fails authentication, regardless of HTTP status.
fn perform_login(transport: &dyn HttpTransport, credentials: &Credentials) -> Result<AuthToken> {
    let url = format!("{}/json/access/ticket", credentials.api_url());
    let form = vec![
        ("username".to_string(), credentials.username().to_string()),
        ("password".to_string(), credentials.password().to_string()),
        ("realm".to_string(), credentials.realm().to_string()),
    ];

    let response = transport.execute(HttpRequest {
        method: Method::POST,
        url,
        query: Vec::new(),
        headers: Vec::new(),
        cookie: None,
        body: Some(RequestBody::Form(form)),
    })?;

    let body: Value = serde_json::from_slice(&response.body).unwrap_or(Value::Null);
    let data = match body.get("data") {
        Some(data) if !data.is_null() => data,
        _ => return Err(PmxError::Authentication),
    };

    let field = |name: &str| {
        data.get(name)
            .and_then(Value::as_str)
            .ok_or(PmxError::Authentication)
    };

    Ok(AuthToken::new(
        field("CSRFPreventionToken")?,
        field("ticket")?,
        field("username")?,
    ))
}

/// Serialize caller params and require a key/value mapping.
///
/// `()` and `Value::Null` mean "no params". Anything that does not
/// serialize to a JSON object is rejected before any network activity.
fn into_params<P: Serialize>(params: P, verb: &str) -> Result<Map<String, Value>> {
    match serde_json::to_value(params)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(PmxError::InvalidArgument(format!(
            "{} params should be a key/value mapping",
            verb
        ))),
    }
}

/// Stringify params for query strings and form bodies. Non-string scalars
/// keep their JSON rendering.
fn form_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

/// Resource paths always carry a leading slash
fn normalize_path(action_path: &str) -> String {
    if action_path.starts_with('/') {
        action_path.to_string()
    } else {
        format!("/{}", action_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Param;

    struct LoginOnlyTransport;

    impl HttpTransport for LoginOnlyTransport {
        fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Ok(HttpResponse {
                status: 200,
                body: br#"{"data":{"ticket":"T","CSRFPreventionToken":"C","username":"root@pam"}}"#
                    .to_vec(),
            })
        }
    }

    fn test_client() -> Proxmox {
        let credentials = Credentials::new("pve1", "root", "secret").unwrap();
        Proxmox::with_transport(
            credentials,
            ResponseMode::Array,
            Box::new(LoginOnlyTransport),
        )
        .unwrap()
    }

    #[test]
    fn test_unsupported_method_rejected() {
        let client = test_client();
        let error = client
            .request_resource("/nodes", Map::new(), "PATCH", false)
            .unwrap_err();
        match error {
            PmxError::InvalidArgument(message) => assert!(message.contains("PATCH")),
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_into_params_accepts_mapping() {
        let mut params = Param::new();
        params.insert("node".to_string(), Value::String("pve1".to_string()));
        let map = into_params(params, "GET").unwrap();
        assert_eq!(map.get("node"), Some(&Value::String("pve1".to_string())));
    }

    #[test]
    fn test_into_params_accepts_unit() {
        assert!(into_params((), "GET").unwrap().is_empty());
    }

    #[test]
    fn test_into_params_rejects_scalars_and_sequences() {
        let error = into_params(42, "GET").unwrap_err();
        assert!(error.to_string().contains("GET params"));

        let error = into_params(vec!["a", "b"], "POST").unwrap_err();
        assert!(error.to_string().contains("POST params"));
    }

    #[test]
    fn test_form_pairs_stringifies_scalars() {
        let map = into_params(serde_json::json!({"vmid": 100, "force": true}), "PUT").unwrap();
        let mut pairs = form_pairs(&map);
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("force".to_string(), "true".to_string()),
                ("vmid".to_string(), "100".to_string()),
            ]
        );
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("version"), "/version");
        assert_eq!(normalize_path("/version"), "/version");
        assert_eq!(normalize_path("/nodes/pve1/status"), "/nodes/pve1/status");
    }

    #[test]
    fn test_api_url_includes_wire_format() {
        let client = test_client();
        assert_eq!(client.api_url(), "https://pve1:8006/api2/json");
    }
}
