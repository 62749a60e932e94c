// crates/agent/src/error.rs
use thiserror::Error;

/// Why a single handoff fetch attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("API request failed: {status} {reason} - {detail}")]
    Http {
        status: u16,
        reason: String,
        detail: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

/// Errors returned by the handoff fetch client.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch handoff state after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: AttemptError },
}

impl FetchError {
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The last attempt ran out of time rather than failing outright.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FetchError::Exhausted {
                last: AttemptError::Timeout(_),
                ..
            }
        )
    }

    /// Message for the agent's screen. Status codes and bodies stay in the logs.
    pub fn user_message(&self) -> String {
        let FetchError::Exhausted { attempts, last } = self;
        let cause = match last {
            AttemptError::Timeout(_) => "the request timed out",
            AttemptError::Http { .. } => "the server returned an error",
            AttemptError::Network(_) => "a network error occurred",
            AttemptError::MalformedBody(_) => "the response could not be read",
        };
        format!("Failed to fetch call information after {attempts} attempts: {cause}.")
    }
}

/// Errors reported by a phone-context host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Phone context host not supported: {0}")]
    Unsupported(String),

    #[error("Host configuration failed: {0}")]
    Configuration(String),

    #[error("Phone context subscription failed: {0}")]
    Subscription(String),

    #[error("Phone context unavailable: {0}")]
    Context(String),
}
