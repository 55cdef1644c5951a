//! Error types for evtarget operations.
//!
//! Dispatch is the only operation that can fail: registering and removing
//! listeners, and looking up wrappers, always succeed.

use thiserror::Error;

use crate::target::ReservedMethod;

/// Result type alias for evtarget operations.
pub type EventResult<T> = Result<T, EventError>;

/// Error a listener may return to abort dispatch.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all evtarget operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Dispatch was called with an event whose type is empty.
    #[error("UNSPECIFIED_EVENT_TYPE_ERR: event dispatched without a type")]
    MissingEventType,

    /// A listener failed while an event was being dispatched.
    #[error("Listener #{index} for '{event_type}' failed: {source}")]
    ListenerFailure {
        event_type: String,
        index: usize,
        #[source]
        source: ListenerError,
    },

    /// One or more listeners failed under the isolating failure policy.
    #[error("{} listener(s) for '{event_type}' failed", .failures.len())]
    ListenerFailures {
        event_type: String,
        failures: Vec<ListenerFailure>,
    },

    /// A bound event method was invoked with another method's arguments.
    #[error("{method} invoked with {found} arguments")]
    MethodArguments {
        method: ReservedMethod,
        found: ReservedMethod,
    },

    /// The wrapped source object has been dropped.
    #[error("Source object of this event target has been dropped")]
    SourceDropped,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single listener failure collected while dispatching under
/// [`FailurePolicy::Isolate`](crate::config::FailurePolicy::Isolate).
#[derive(Error, Debug)]
#[error("listener #{index} failed: {source}")]
pub struct ListenerFailure {
    /// Position of the listener in the dispatch snapshot.
    pub index: usize,
    #[source]
    pub source: ListenerError,
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Event (EVT_xxx)
    EvtMissingType,
    EvtListenerFailed,
    EvtListenersFailed,
    EvtMethodArguments,

    // Target (TGT_xxx)
    TgtSourceDropped,

    // Configuration (CFG_xxx)
    CfgInvalid,
    CfgIo,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EvtMissingType => "EVT_001",
            ErrorCode::EvtListenerFailed => "EVT_002",
            ErrorCode::EvtListenersFailed => "EVT_003",
            ErrorCode::EvtMethodArguments => "EVT_004",
            ErrorCode::TgtSourceDropped => "TGT_001",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::CfgIo => "CFG_002",
        }
    }
}

impl EventError {
    /// Create a listener failure error.
    pub fn listener(event_type: impl Into<String>, index: usize, source: ListenerError) -> Self {
        Self::ListenerFailure {
            event_type: event_type.into(),
            index,
            source,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingEventType => ErrorCode::EvtMissingType,
            Self::ListenerFailure { .. } => ErrorCode::EvtListenerFailed,
            Self::ListenerFailures { .. } => ErrorCode::EvtListenersFailed,
            Self::MethodArguments { .. } => ErrorCode::EvtMethodArguments,
            Self::SourceDropped => ErrorCode::TgtSourceDropped,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::Io(_) => ErrorCode::CfgIo,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::MissingEventType => Some("Construct the event with a non-empty type"),
            Self::SourceDropped => {
                Some("Keep a strong reference to the source object while using its event target")
            }
            Self::Configuration(_) => {
                Some("Check the failure_policy and max_listeners settings")
            }
            _ => None,
        }
    }
}
