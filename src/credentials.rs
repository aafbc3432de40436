use std::collections::HashMap;

use crate::error::{PmxError, Result};

/// Default API port of a Proxmox server
pub const DEFAULT_PORT: u16 = 8006;

/// Default authentication realm
pub const DEFAULT_REALM: &str = "pam";

/// Target system flavor. Determines which authentication cookie the server
/// expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum System {
    /// Proxmox Virtual Environment
    #[default]
    Pve,
    /// Proxmox Mail Gateway
    Pmg,
}

impl System {
    /// Parse a system name. Anything other than "pmg" selects PVE behavior.
    pub fn from_name(name: &str) -> Self {
        match name {
            "pmg" => System::Pmg,
            _ => System::Pve,
        }
    }

    /// Name of the cookie carrying the session ticket
    pub fn cookie_name(&self) -> &'static str {
        match self {
            System::Pve => "PVEAuthCookie",
            System::Pmg => "PMGAuthCookie",
        }
    }

    /// Lowercase system name as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            System::Pve => "pve",
            System::Pmg => "pmg",
        }
    }
}

/// Connection parameters for a Proxmox server.
///
/// Holds everything needed to reach and authenticate against the API:
/// hostname, port, username, password, realm and target system. Validated
/// at construction and immutable afterwards.
#[derive(Clone)]
pub struct Credentials {
    hostname: String,
    port: u16,
    username: String,
    password: String,
    realm: String,
    system: System,
}

impl Credentials {
    /// Create credentials with the default port (8006), realm ("pam") and
    /// system (PVE).
    ///
    /// Fails with [`PmxError::MalformedCredentials`] if any of hostname,
    /// username or password is empty.
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let credentials = Credentials {
            hostname: hostname.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            realm: DEFAULT_REALM.to_string(),
            system: System::default(),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Build credentials from a map of named fields.
    ///
    /// Required keys: `hostname`, `username`, `password`. Optional keys:
    /// `port`, `realm`, `system`; missing ones take their defaults.
    pub fn from_map(fields: &HashMap<String, String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            fields
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| PmxError::malformed(key))
        };

        let port = match fields.get("port") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                PmxError::MalformedCredentials(format!("invalid port value '{}'", raw))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Credentials {
            hostname: required("hostname")?,
            port,
            username: required("username")?,
            password: required("password")?,
            realm: fields
                .get("realm")
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_REALM.to_string()),
            system: fields
                .get("system")
                .map(|s| System::from_name(s))
                .unwrap_or_default(),
        })
    }

    /// Set the API port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the authentication realm
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Set the target system flavor
    pub fn with_system(mut self, system: System) -> Self {
        self.system = system;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.hostname.is_empty() {
            return Err(PmxError::malformed("hostname"));
        }
        if self.username.is_empty() {
            return Err(PmxError::malformed("username"));
        }
        if self.password.is_empty() {
            return Err(PmxError::malformed("password"));
        }
        Ok(())
    }

    /// Hostname of the target server
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// API port of the target server
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Username used for login
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password used for login
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Authentication realm the username belongs to
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Target system flavor
    pub fn system(&self) -> System {
        self.system
    }

    /// Base API URL, e.g. `https://my-proxmox:8006/api2`
    pub fn api_url(&self) -> String {
        format!("https://{}:{}/api2", self.hostname, self.port)
    }
}

// Implement Debug manually to avoid exposing the password
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("realm", &self.realm)
            .field("system", &self.system)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let credentials = Credentials::new("pve1.example.com", "root", "secret").unwrap();
        assert_eq!(credentials.hostname(), "pve1.example.com");
        assert_eq!(credentials.port(), DEFAULT_PORT);
        assert_eq!(credentials.realm(), "pam");
        assert_eq!(credentials.system(), System::Pve);
    }

    #[test]
    fn test_api_url() {
        let credentials = Credentials::new("my-proxmox", "root", "secret")
            .unwrap()
            .with_port(443);
        assert_eq!(credentials.api_url(), "https://my-proxmox:443/api2");
    }

    #[test]
    fn test_rejects_each_missing_field() {
        assert!(Credentials::new("", "root", "secret")
            .unwrap_err()
            .is_malformed_credentials());
        assert!(Credentials::new("host", "", "secret")
            .unwrap_err()
            .is_malformed_credentials());
        assert!(Credentials::new("host", "root", "")
            .unwrap_err()
            .is_malformed_credentials());
    }

    #[test]
    fn test_from_map() {
        let mut fields = HashMap::new();
        fields.insert("hostname".to_string(), "pmg1".to_string());
        fields.insert("username".to_string(), "admin".to_string());
        fields.insert("password".to_string(), "secret".to_string());
        fields.insert("port".to_string(), "443".to_string());
        fields.insert("realm".to_string(), "pmg".to_string());
        fields.insert("system".to_string(), "pmg".to_string());

        let credentials = Credentials::from_map(&fields).unwrap();
        assert_eq!(credentials.hostname(), "pmg1");
        assert_eq!(credentials.port(), 443);
        assert_eq!(credentials.realm(), "pmg");
        assert_eq!(credentials.system(), System::Pmg);
    }

    #[test]
    fn test_from_map_missing_key() {
        let mut fields = HashMap::new();
        fields.insert("hostname".to_string(), "pve1".to_string());
        fields.insert("username".to_string(), "root".to_string());

        let error = Credentials::from_map(&fields).unwrap_err();
        assert!(error.is_malformed_credentials());
        assert!(error.to_string().contains("password"));
    }

    #[test]
    fn test_from_map_bad_port() {
        let mut fields = HashMap::new();
        fields.insert("hostname".to_string(), "pve1".to_string());
        fields.insert("username".to_string(), "root".to_string());
        fields.insert("password".to_string(), "secret".to_string());
        fields.insert("port".to_string(), "eight".to_string());

        assert!(Credentials::from_map(&fields)
            .unwrap_err()
            .is_malformed_credentials());
    }

    #[test]
    fn test_system_parsing() {
        assert_eq!(System::from_name("pmg"), System::Pmg);
        assert_eq!(System::from_name("pve"), System::Pve);
        // Unrecognized systems fall back to PVE behavior
        assert_eq!(System::from_name("openvz"), System::Pve);
    }

    #[test]
    fn test_cookie_names() {
        assert_eq!(System::Pve.cookie_name(), "PVEAuthCookie");
        assert_eq!(System::Pmg.cookie_name(), "PMGAuthCookie");
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = Credentials::new("pve1", "root", "hunter2").unwrap();
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
