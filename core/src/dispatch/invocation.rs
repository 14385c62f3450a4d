//! In-flight host calls.
//!
//! A [`PendingInvocation`] is settled by value: `resolve`, `reject` and
//! `settle` consume it, so a second resolution does not type-check. Dropping
//! one unsettled rejects it rather than leaving the host waiting.

use crate::codec::FailureReason;
use crate::sdk::UNKNOWN_ERROR;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::oneshot;

/// A rejected call as the host receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub code: String,
    /// Never empty.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl Rejection {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: code.into(),
            message: if message.is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                message
            },
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<FailureReason>) -> Self {
        self.reason = reason;
        self
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Terminal result of a call.
pub type Outcome = Result<Option<Value>, Rejection>;

/// The host runtime's handle for a call.
pub trait CallResolver: Send {
    fn resolve(&self, value: Option<Value>);
    fn reject(&self, rejection: Rejection);
}

enum Resolver {
    Callback(Box<dyn FnOnce(Outcome) + Send>),
    Channel(oneshot::Sender<Outcome>),
    Host(Box<dyn CallResolver>),
}

impl Resolver {
    fn deliver(self, outcome: Outcome) {
        match self {
            Self::Callback(callback) => callback(outcome),
            Self::Channel(tx) => {
                if tx.send(outcome).is_err() {
                    tracing::debug!("Caller went away before the outcome arrived");
                }
            }
            Self::Host(host) => match outcome {
                Ok(value) => host.resolve(value),
                Err(rejection) => host.reject(rejection),
            },
        }
    }
}

pub struct PendingInvocation {
    method: String,
    resolver: Option<Resolver>,
}

impl PendingInvocation {
    pub fn from_callback(
        method: impl Into<String>,
        callback: impl FnOnce(Outcome) + Send + 'static,
    ) -> Self {
        Self::with_resolver(method, Resolver::Callback(Box::new(callback)))
    }

    pub fn from_host(method: impl Into<String>, host: impl CallResolver + 'static) -> Self {
        Self::with_resolver(method, Resolver::Host(Box::new(host)))
    }

    /// An invocation whose outcome is awaited on the returned receiver.
    pub fn channel(method: impl Into<String>) -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (Self::with_resolver(method, Resolver::Channel(tx)), rx)
    }

    fn with_resolver(method: impl Into<String>, resolver: Resolver) -> Self {
        Self {
            method: method.into(),
            resolver: Some(resolver),
        }
    }

    pub fn resolve(self, value: Option<Value>) {
        self.settle(Ok(value));
    }

    pub fn reject(self, rejection: Rejection) {
        self.settle(Err(rejection));
    }

    pub fn settle(mut self, outcome: Outcome) {
        if let Some(resolver) = self.resolver.take() {
            resolver.deliver(outcome);
        }
    }
}

impl fmt::Debug for PendingInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingInvocation")
            .field("method", &self.method)
            .field("settled", &self.resolver.is_none())
            .finish()
    }
}

impl Drop for PendingInvocation {
    fn drop(&mut self) {
        if let Some(resolver) = self.resolver.take() {
            tracing::error!("{} dropped without a resolution", self.method);
            resolver.deliver(Err(Rejection::new(
                "unknown",
                format!("{} was dropped without a resolution", self.method),
            )));
        }
    }
}
