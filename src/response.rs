use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;

use crate::client::HttpResponse;

/// Param is a convenience type for parameters passed to API requests.
pub type Param = std::collections::HashMap<String, Value>;

/// How responses are requested from the server and shaped for the caller.
///
/// The first three variants are client-side representations layered on a
/// wire format; the rest select a wire format and hand the body back as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// JSON wire format, body decoded into a generic `serde_json::Value`
    #[default]
    Array,
    /// Accepted for compatibility; behaves exactly like `Array`
    Object,
    /// PNG wire format, body returned as a `data:image/png;base64,` string
    PngB64,
    /// JSON wire format, body returned as a raw string
    Json,
    /// HTML wire format, body returned as a raw string
    Html,
    /// ExtJS wire format, body returned as a raw string
    ExtJs,
    /// Plain-text wire format, body returned as a raw string
    Text,
    /// PNG wire format, body returned as a raw string
    Png,
}

impl ResponseMode {
    /// Parse a mode name. Unrecognized names select the default `Array`
    /// representation.
    pub fn from_name(name: &str) -> Self {
        match name {
            "array" => ResponseMode::Array,
            "object" => ResponseMode::Object,
            "pngb64" => ResponseMode::PngB64,
            "json" => ResponseMode::Json,
            "html" => ResponseMode::Html,
            "extjs" => ResponseMode::ExtJs,
            "text" => ResponseMode::Text,
            "png" => ResponseMode::Png,
            _ => ResponseMode::Array,
        }
    }

    /// Wire format segment used when building request URLs,
    /// e.g. `json` in `https://my-proxmox:8006/api2/json/version`
    pub fn wire_format(&self) -> &'static str {
        match self {
            ResponseMode::Array | ResponseMode::Object | ResponseMode::Json => "json",
            ResponseMode::PngB64 | ResponseMode::Png => "png",
            ResponseMode::Html => "html",
            ResponseMode::ExtJs => "extjs",
            ResponseMode::Text => "text",
        }
    }

    /// Shape a raw HTTP response into this mode's representation.
    ///
    /// The status code is deliberately ignored: error responses carry the
    /// server's own error envelope and flow through to the caller unchanged.
    pub fn normalize(&self, response: &HttpResponse) -> ApiOutput {
        match self {
            // Object is unimplemented server-side and degrades to Array
            ResponseMode::Array | ResponseMode::Object => {
                // A body that fails to parse normalizes to null so that
                // non-JSON error pages still flow through to the caller
                let value = serde_json::from_slice(&response.body).unwrap_or(Value::Null);
                ApiOutput::Structured(value)
            }
            ResponseMode::PngB64 => {
                let encoded = STANDARD.encode(&response.body);
                ApiOutput::Text(format!("data:image/png;base64,{}", encoded))
            }
            _ => ApiOutput::Text(String::from_utf8_lossy(&response.body).into_owned()),
        }
    }
}

/// A normalized API response: either a decoded JSON document or a plain
/// string, depending on the configured [`ResponseMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutput {
    /// Decoded JSON body (`Array`/`Object` modes)
    Structured(Value),
    /// Raw or base64-wrapped body (all other modes)
    Text(String),
}

impl ApiOutput {
    /// The decoded JSON value, if this output is structured
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ApiOutput::Structured(value) => Some(value),
            ApiOutput::Text(_) => None,
        }
    }

    /// The raw string body, if this output is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ApiOutput::Structured(_) => None,
            ApiOutput::Text(text) => Some(text),
        }
    }

    /// The `data` payload of a structured response envelope
    pub fn data(&self) -> Option<&Value> {
        self.get("data")
    }

    /// Get a value from a structured response by a slash-separated path.
    /// For example, "data/version" accesses the "version" field inside the
    /// "data" object; numeric segments index into arrays.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut current = self.as_value()?;

        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    arr.get(index)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    /// Get a string value from a structured response by a slash-separated path
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(|v| v.as_str().map(|s| s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(body: &[u8]) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ResponseMode::from_name("array"), ResponseMode::Array);
        assert_eq!(ResponseMode::from_name("pngb64"), ResponseMode::PngB64);
        assert_eq!(ResponseMode::from_name("extjs"), ResponseMode::ExtJs);
        // Unknown names select the default representation
        assert_eq!(ResponseMode::from_name("yaml"), ResponseMode::Array);
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(ResponseMode::Array.wire_format(), "json");
        assert_eq!(ResponseMode::Object.wire_format(), "json");
        assert_eq!(ResponseMode::PngB64.wire_format(), "png");
        assert_eq!(ResponseMode::Html.wire_format(), "html");
        assert_eq!(ResponseMode::Text.wire_format(), "text");
    }

    #[test]
    fn test_normalize_array_decodes_json() {
        let output =
            ResponseMode::Array.normalize(&response_with(br#"{"data":{"version":"7.0"}}"#));
        assert_eq!(output.get_string("data/version"), Some("7.0".to_string()));
    }

    #[test]
    fn test_normalize_object_degrades_to_array() {
        let body = br#"{"data":[1,2,3]}"#;
        assert_eq!(
            ResponseMode::Object.normalize(&response_with(body)),
            ResponseMode::Array.normalize(&response_with(body))
        );
    }

    #[test]
    fn test_normalize_unparseable_body_is_null() {
        let output = ResponseMode::Array.normalize(&response_with(b"<html>gateway timeout</html>"));
        assert_eq!(output, ApiOutput::Structured(Value::Null));
    }

    #[test]
    fn test_normalize_pngb64() {
        let output = ResponseMode::PngB64.normalize(&response_with(b"rawpngbytes"));
        assert_eq!(
            output.as_text(),
            Some(format!("data:image/png;base64,{}", STANDARD.encode(b"rawpngbytes")).as_str())
        );
    }

    #[test]
    fn test_normalize_text_passthrough() {
        let output = ResponseMode::Html.normalize(&response_with(b"<html>ok</html>"));
        assert_eq!(output.as_text(), Some("<html>ok</html>"));
    }

    #[test]
    fn test_get_indexes_arrays() {
        let output = ApiOutput::Structured(serde_json::json!({
            "data": [{"node": "pve1"}, {"node": "pve2"}]
        }));
        assert_eq!(output.get_string("data/1/node"), Some("pve2".to_string()));
    }
}
