//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. WebSocket upgrades on
//! `/inspection` are handed to `server::websocket`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::inspection::{DocumentState, InspectionStore};
use crate::routes::{self, error_response, json_response, ItemRoute};
use crate::server::websocket;
use crate::sync::SyncHub;
use crate::types::Result;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Fan-out to push-channel observers
    pub hub: Arc<SyncHub>,
    /// The checklist; sole writer of the document
    pub document: Arc<DocumentState>,
    pub started_at: Instant,
}

impl AppState {
    /// Load the document from `args.data_file` and wire up the hub
    pub async fn initialize(args: Args) -> Self {
        let hub = Arc::new(SyncHub::new(args.broadcast_capacity));
        let store = InspectionStore::new(&args.data_file);
        let document = Arc::new(DocumentState::load(store, Arc::clone(&hub)).await);

        Self {
            args,
            hub,
            document,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server on `args.listen`
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;
    serve(listener, state).await
}

/// Serve connections from an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    info!(
        "Inspection gateway listening on {} (data file: {})",
        listener.local_addr()?,
        state.args.data_file.display()
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
pub(crate) async fn handle_request<B>(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<B>,
) -> std::result::Result<Response<BoxBody>, Infallible>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(&state).await,

        // Push channel
        (Method::GET, "/inspection") => {
            if hyper_tungstenite::is_upgrade_request(&req) {
                websocket::handle_inspection_upgrade(Arc::clone(&state), req, addr)
            } else {
                error_response(StatusCode::BAD_REQUEST, "WebSocket upgrade required for /inspection")
            }
        }

        (Method::GET, "/api/inspection") => routes::handle_get_document(&state.document).await,

        (Method::POST, "/api/inspection") => match collect_body(req).await {
            Ok(body) => routes::handle_sync_document(&state.document, body).await,
            Err(response) => response,
        },

        (Method::POST, "/api/inspection/item") => match collect_body(req).await {
            Ok(body) => routes::handle_add_item(&state.document, body).await,
            Err(response) => response,
        },

        (method, p) => match (method, ItemRoute::parse(p)) {
            (Method::DELETE, Some(ItemRoute::Item(id))) => {
                routes::handle_delete_item(&state.document, id).await
            }
            (Method::PUT, Some(ItemRoute::Status(id))) => match collect_body(req).await {
                Ok(body) => routes::handle_update_status(&state.document, id, body).await,
                Err(response) => response,
            },
            _ => not_found_response(p),
        },
    };

    Ok(to_boxed(response))
}

/// Read the whole request body
async fn collect_body<B>(req: Request<B>) -> std::result::Result<Bytes, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    match req.into_body().collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => {
            warn!("Request body error: {}", e);
            Err(error_response(StatusCode::BAD_REQUEST, "Failed to read request body"))
        }
    }
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    use hyper::header::{
        HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN,
    };

    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    response
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "success": false,
            "error": "Not found",
            "path": path
        }),
    )
}
