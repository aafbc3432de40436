use chrono::{DateTime, Duration, Utc};

/// Lifetime granted to a session ticket, in seconds. The server issues
/// tickets valid for two hours; this keeps a conservative margin under that.
pub const TICKET_LIFETIME_SECS: i64 = 7000;

/// AuthToken holds the session data returned by a successful login: the
/// ticket identifying the session, the CSRF prevention token required on
/// state-mutating requests, and the username owning the session.
///
/// Tokens are immutable; an expired token is discarded and replaced by a
/// fresh login, never mutated.
#[derive(Debug, Clone)]
pub struct AuthToken {
    csrf_token: String,
    ticket: String,
    username: String,
    issued_at: DateTime<Utc>,
}

impl AuthToken {
    /// Create a new AuthToken timestamped now
    pub fn new(
        csrf_token: impl Into<String>,
        ticket: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self::issued(csrf_token, ticket, username, Utc::now())
    }

    /// Create an AuthToken with an explicit creation timestamp
    pub fn issued(
        csrf_token: impl Into<String>,
        ticket: impl Into<String>,
        username: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        AuthToken {
            csrf_token: csrf_token.into(),
            ticket: ticket.into(),
            username: username.into(),
            issued_at,
        }
    }

    /// CSRF prevention token sent as a header on POST/PUT/DELETE requests
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// Session ticket presented via cookie on every request
    pub fn ticket(&self) -> &str {
        &self.ticket
    }

    /// Username of the form 'user@realm' that owns this session
    pub fn username(&self) -> &str {
        &self.username
    }

    /// When this token was created
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Whether the ticket is still usable. Validity is a pure function of
    /// elapsed time since creation.
    pub fn is_valid(&self) -> bool {
        self.issued_at + Duration::seconds(TICKET_LIFETIME_SECS) >= Utc::now()
    }
}
