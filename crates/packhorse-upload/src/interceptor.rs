//! Upload interception middleware.
//!
//! Wraps a downstream handler: the body is persisted and digested before
//! the handler ever runs, and the handler receives only the rewritten
//! metadata form. Any failure ahead of the rewrite keeps the downstream
//! handler from being invoked at all.

use crate::prepare::Preparer;
use crate::save::save_stream;
use crate::Result;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use futures::TryStreamExt;
use packhorse_auth::{AccessGate, ActorClass, GateDecision};
use packhorse_metrics::METRICS;
use std::sync::Arc;
use tokio_util::io::StreamReader;

/// Suffix appended to the request path when consulting the gate.
const AUTHORIZE_SUFFIX: &str = "/authorize";

/// Form-field prefix for the rewritten metadata.
const FIELD_PREFIX: &str = "file";

/// Shared state for upload interception.
#[derive(Clone)]
pub struct UploadState {
    /// Access gate consulted before the body is read.
    pub gate: Arc<dyn AccessGate>,
    /// Capability deciding where bodies are persisted.
    pub preparer: Arc<dyn Preparer>,
}

/// Middleware that intercepts the request body on its way upstream.
///
/// Runs pre-authorization, preparation, streaming persistence and
/// verification in order, then substitutes the body with form-encoded
/// digest metadata. Denials pass through untouched.
pub async fn intercept_upload(
    State(state): State<UploadState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let (mut parts, body) = request.into_parts();

    let auth = match state.gate.authorize(&parts, AUTHORIZE_SUFFIX).await? {
        GateDecision::Allow(auth) => auth,
        GateDecision::Deny(response) => return Ok(response),
    };

    let actor = ActorClass::from_headers(&parts.headers);
    METRICS.count_request("upload", actor.as_str());

    let (destination, verifier) = state.preparer.prepare(&auth).await?;

    let body_stream = body
        .into_data_stream()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
    let mut reader = StreamReader::new(body_stream);

    let saved = save_stream(&destination.local_temp_dir, &mut reader).await?;
    METRICS.add_bytes("upload", actor.as_str(), "in", saved.size);

    if let Some(verifier) = verifier {
        verifier.verify(&saved).await?;
    }

    let encoded = serde_urlencoded::to_string(saved.form_fields(FIELD_PREFIX))?;

    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(encoded.len()));
    // The synthetic body has a fixed length; the client's framing header
    // would contradict it.
    parts.headers.remove(header::TRANSFER_ENCODING);

    let request = Request::from_parts(parts, Body::from(encoded));
    Ok(next.run(request).await)
}
