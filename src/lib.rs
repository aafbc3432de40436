//! # pmxclient - Proxmox VE / PMG API client for Rust
//!
//! A Rust client for the REST API of Proxmox Virtual Environment and
//! Proxmox Mail Gateway servers. This library handles ticket-based
//! authentication, transparent session renewal, and response shaping, and
//! forwards arbitrary resource-tree requests to the server.
//!
//! ## Features
//!
//! - CRUD-style access to the whole API resource tree (`get`, `create`,
//!   `set`, `delete`)
//! - Ticket + CSRF-token session handling with transparent re-login on
//!   expiry
//! - PVE and PMG cookie flavors
//! - Selectable response representation: decoded JSON, raw body, or
//!   base64-wrapped PNG
//! - Injectable HTTP transport for testing
//!
//! ## Basic Usage
//!
//! ```no_run
//! use pmxclient::{Credentials, Proxmox, ResponseMode};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials::new("my-proxmox", "root", "secret")?;
//!     let client = Proxmox::new(credentials, ResponseMode::Array)?;
//!
//!     let version = client.version()?;
//!     println!("running: {:?}", version.get_string("data/version"));
//!
//!     let nodes = client.get("/nodes", ())?;
//!     println!("nodes: {:?}", nodes.data());
//!     Ok(())
//! }
//! ```
//!
//! ## Issuing requests
//!
//! Parameters are any value that serializes to a key/value mapping:
//!
//! ```no_run
//! # use pmxclient::{Credentials, Proxmox, ResponseMode};
//! # let credentials = Credentials::new("my-proxmox", "root", "secret")?;
//! # let client = Proxmox::new(credentials, ResponseMode::Array)?;
//! client.create("/nodes/pve1/qemu", serde_json::json!({
//!     "vmid": 100,
//!     "ostype": "l26",
//! }), false)?;
//! # Ok::<(), pmxclient::PmxError>(())
//! ```
//!
//! Every request method checks the cached session ticket first and logs in
//! again when it has expired, so a long-lived client needs no explicit
//! session management. One client instance is single-threaded; create one
//! instance per thread, or per set of credentials.

pub mod client;
pub mod credentials;
pub mod error;
pub mod response;
pub mod rest;
pub mod token;

// Re-export main types for convenience
pub use client::{Cookie, HttpRequest, HttpResponse, HttpTransport, RequestBody, ReqwestTransport};
pub use credentials::{Credentials, System, DEFAULT_PORT, DEFAULT_REALM};
pub use error::{PmxError, Result};
pub use response::{ApiOutput, Param, ResponseMode};
pub use rest::Proxmox;
pub use token::{AuthToken, TICKET_LIFETIME_SECS};

// Re-export serde_json for convenience
pub use serde_json::json;
