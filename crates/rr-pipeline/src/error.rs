//! Pipeline errors and the category taxonomy reported to clients.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rr_output::OutputError;
use rr_spatial::SpatialError;

use crate::GeocodeError;

/// Coarse failure class exposed to clients.
///
/// `ResourceExhausted` and `NoRouteFound` are kept apart so a client can
/// decide between shortening the route and retrying later.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidInput,
    LookupFailed,
    ResourceExhausted,
    NoRouteFound,
    ArtifactWriteFailed,
    LeaseExpired,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::InvalidInput        => "invalid_input",
            ErrorCategory::LookupFailed        => "lookup_failed",
            ErrorCategory::ResourceExhausted   => "resource_exhausted",
            ErrorCategory::NoRouteFound        => "no_route_found",
            ErrorCategory::ArtifactWriteFailed => "artifact_write_failed",
            ErrorCategory::LeaseExpired        => "lease_expired",
            ErrorCategory::Internal            => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal pipeline failures.
///
/// Tier-local graph and routing failures never surface here directly; they
/// drive escalation and only the last one is kept, inside `NoRouteFound`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("location lookup failed: {0}")]
    LookupFailed(#[from] GeocodeError),

    #[error(
        "not enough memory for the {tier} strategy: needs {required_mb:.1} MB, \
         {available_mb:.1} MB available"
    )]
    ResourceExhausted {
        tier:         &'static str,
        required_mb:  f64,
        available_mb: f64,
    },

    #[error("no route found after trying every strategy: {last}")]
    NoRouteFound {
        #[source]
        last: SpatialError,
    },

    #[error("could not produce the map artifact: {0}")]
    ArtifactWrite(#[from] OutputError),

    #[error("pipeline configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::LookupFailed(_)            => ErrorCategory::LookupFailed,
            PipelineError::ResourceExhausted { .. }   => ErrorCategory::ResourceExhausted,
            PipelineError::NoRouteFound { .. }        => ErrorCategory::NoRouteFound,
            PipelineError::ArtifactWrite(_)           => ErrorCategory::ArtifactWriteFailed,
            PipelineError::Config(_)                  => ErrorCategory::Internal,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
