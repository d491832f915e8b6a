// gateway.rs — HTTP front end that reaches the db-server over mutual TLS.
//
// Routes:
//   GET /connect  → greet the db-server; 200 + "Created" on success
//   GET /getdata  → fetch the (redacted) records; 200 + patients on success
//
// Any upstream failure answers 403 with a "Not Created" envelope and a
// reason, never with records. Every response is marked uncacheable.

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::map_response;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use veil_policy::Identity;
use veil_records::Envelope;

use crate::error::UpstreamError;
use crate::upstream::UpstreamClient;

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub upstream: UpstreamClient,
    /// The identity our certificate carries; reported as `client`.
    pub local_identity: Identity,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/connect", get(handle_connect))
        .route("/getdata", get(handle_getdata))
        .layer(map_response(no_cache))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `router` on an already-bound listener until the process exits.
pub async fn serve(listener: tokio::net::TcpListener, router: Router) -> std::io::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "gateway listening");
    axum::serve(listener, router).await
}

async fn no_cache(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}

/// GET /connect
async fn handle_connect(State(state): State<GatewayState>) -> (StatusCode, Json<Envelope>) {
    match state.upstream.greet().await {
        Ok(greeting) => {
            tracing::info!(server_says = %greeting, "db-server connection created");
            (
                StatusCode::OK,
                Json(Envelope::created(
                    &state.local_identity,
                    format!("Policy allowed request: {}", greeting),
                )),
            )
        }
        Err(e) => failure(&state, e),
    }
}

/// GET /getdata
async fn handle_getdata(State(state): State<GatewayState>) -> (StatusCode, Json<Envelope>) {
    match state.upstream.fetch_records().await {
        Ok(patients) => {
            tracing::info!(count = patients.len(), "received records from db-server");
            (
                StatusCode::OK,
                Json(Envelope::with_patients(&state.local_identity, patients)),
            )
        }
        Err(e) => failure(&state, e),
    }
}

fn failure(state: &GatewayState, err: UpstreamError) -> (StatusCode, Json<Envelope>) {
    let reason = err.reason(&state.local_identity);
    tracing::warn!(
        upstream = %state.upstream.address(),
        error = %err,
        %reason,
        "db-server request failed"
    );
    (
        StatusCode::FORBIDDEN,
        Json(Envelope::failed(&state.local_identity, reason)),
    )
}
