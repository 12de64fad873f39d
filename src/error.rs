//! Broker error types with wire string and HTTP status mapping.
//!
//! [`BrokerError`] is the central error type for the broker. Protocol
//! failures are reported inside the response envelope as
//! `{"successful": false, "error": "NNN::reason"}` while the HTTP
//! status stays 200; only batch-shape violations and overlapping
//! connects surface as non-200 responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::ClientId;

/// Minimal protocol envelope used when an error is converted straight
/// into a response without a request to echo.
///
/// ```json
/// [{ "successful": false, "error": "402::session_unknown" }]
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    /// Always `false`.
    pub successful: bool,
    /// Wire error string in `NNN::reason` form.
    pub error: &'static str,
}

/// Server-side error enum with wire string and HTTP status mapping.
///
/// The `NNN::reason` strings follow the CometD convention of a numeric
/// code and a machine-readable reason joined by `::`. They travel in
/// the envelope's `error` field, not in the HTTP status line.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// A message in the request batch has no `channel` field.
    #[error("message lacks a channel")]
    ChannelMissing,

    /// Handshake requested a protocol version this broker does not speak.
    #[error("unsupported protocol version {0:?}")]
    VersionMismatch(Option<String>),

    /// No session is registered under the presented client ID, or the
    /// request carried none.
    #[error("unknown session")]
    SessionUnknown,

    /// Subscribe request lacks a `subscription` field, or it is empty.
    #[error("subscribe request lacks a subscription")]
    SubscriptionMissing,

    /// None of the client's connection types is supported.
    #[error("no supported connection type among {0:?}")]
    ConnectionTypeUnsupported(Vec<String>),

    /// Channel name failed validation.
    #[error("invalid channel name {0:?}")]
    ChannelInvalid(String),

    /// A second `/meta/connect` arrived while one was already pending.
    #[error("connect already pending for session {0}")]
    DuplicateConnect(ClientId),

    /// A publish batch carried a `/meta/*` message.
    #[error("publish batch may not carry meta messages")]
    MetaInPublishBatch,
}

impl BrokerError {
    /// Returns the `NNN::reason` wire string for this variant.
    #[must_use]
    pub const fn wire_error(&self) -> &'static str {
        match self {
            Self::ChannelMissing => "400::channel_missing",
            Self::VersionMismatch(_) => "400::minimum_version_missing",
            Self::SessionUnknown => "402::session_unknown",
            Self::SubscriptionMissing => "403::subscription_missing",
            Self::ConnectionTypeUnsupported(_) => "404::connection_type_unsupported",
            Self::ChannelInvalid(_) => "405::channel_invalid",
            Self::DuplicateConnect(_) => "409::duplicate_connect",
            Self::MetaInPublishBatch => "400::meta_channel_in_publish",
        }
    }

    /// Returns the HTTP status code for this variant.
    ///
    /// Envelope-class failures keep 200; the handlers replace the
    /// duplicate-connect default with the configured status.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MetaInPublishBatch => StatusCode::BAD_REQUEST,
            Self::DuplicateConnect(_) => StatusCode::CONFLICT,
            Self::ChannelMissing
            | Self::VersionMismatch(_)
            | Self::SessionUnknown
            | Self::SubscriptionMissing
            | Self::ConnectionTypeUnsupported(_)
            | Self::ChannelInvalid(_) => StatusCode::OK,
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::BAD_REQUEST {
            return status.into_response();
        }
        let body = [ErrorEnvelope {
            successful: false,
            error: self.wire_error(),
        }];
        (status, axum::Json(body)).into_response()
    }
}
