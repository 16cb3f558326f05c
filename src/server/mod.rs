mod error;
mod params;
mod resource;
mod response;
mod transaction;

pub use resource::TelescopeResource;

use crate::api::ServerInfo;
use axum::extract::Path;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{routing, Json, Router};
use params::ActionParams;
use response::Envelope;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use transaction::RequestTransaction;

/// The Alpaca HTTP front-end: management endpoints plus the device API.
#[derive(Debug)]
pub struct Server {
    pub resource: TelescopeResource,
    pub info: ServerInfo,
    pub listen_addr: SocketAddr,
}

impl Server {
    pub async fn start(self) -> anyhow::Result<()> {
        let addr = self.listen_addr;

        tracing::debug!(%addr, "Binding Alpaca server");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Bound Alpaca server");

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down");
            })
            .await?;

        Ok(())
    }

    pub fn into_router(self) -> Router {
        let resource = Arc::new(self.resource);
        let info = Arc::new(self.info);

        Router::new()
            .route(
                "/management/apiversions",
                routing::get(|uri: Uri, mut params: ActionParams| async move {
                    management_envelope(&uri, &mut params, json!([1_u32]))
                }),
            )
            .route("/management/v1/description", {
                let info = Arc::clone(&info);

                routing::get(move |uri: Uri, mut params: ActionParams| async move {
                    management_envelope(&uri, &mut params, to_value_or_null(info.as_ref()))
                })
            })
            .route("/management/v1/configureddevices", {
                let this = Arc::clone(&resource);

                routing::get(move |uri: Uri, mut params: ActionParams| async move {
                    let transaction = match RequestTransaction::extract(&mut params) {
                        Ok(transaction) => transaction,
                        Err(err) => return err.into_response(),
                    };

                    // Listing may talk to the mounts, so it runs off the
                    // async workers like any other device access.
                    match tokio::task::spawn_blocking(move || this.configured_devices()).await {
                        Ok(devices) => {
                            Envelope::ok(transaction, to_value_or_null(&devices)).into_response()
                        }
                        Err(err) => handler_failure(&err),
                    }
                })
            })
            .route(
                "/api/v1/:device_type/:device_number/:operation",
                routing::any({
                    let this = Arc::clone(&resource);

                    move |uri: Uri,
                          Path((device_type, device_number, operation)): Path<(
                        String,
                        String,
                        String,
                    )>,
                          params: ActionParams| {
                        device_request(
                            Arc::clone(&this),
                            uri,
                            device_type,
                            device_number,
                            operation,
                            params,
                        )
                    }
                }),
            )
            .route(
                "/setup/v1/:device_type/:device_number/:operation",
                routing::any(
                    |Path((device_type, device_number, operation)): Path<(
                        String,
                        String,
                        String,
                    )>| async move {
                        Json(json!({
                            "device_type": device_type,
                            "device_number": device_number,
                            "operation": operation,
                        }))
                    },
                ),
            )
    }
}

fn to_value_or_null<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        tracing::error!(%err, "Serialization failure");
        Value::Null
    })
}

fn handler_failure(err: &tokio::task::JoinError) -> axum::response::Response {
    tracing::error!(%err, "Device handler failed");
    (StatusCode::BAD_REQUEST, format!("Handler failure: {err}")).into_response()
}

fn management_envelope(
    uri: &Uri,
    params: &mut ActionParams,
    value: Value,
) -> axum::response::Response {
    match RequestTransaction::extract(params) {
        Ok(transaction) => {
            tracing::debug!(path = %uri.path(), "Management request");
            Envelope::ok(transaction, value).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn device_request(
    resource: Arc<TelescopeResource>,
    uri: Uri,
    device_type: String,
    device_number: String,
    operation: String,
    mut params: ActionParams,
) -> axum::response::Response {
    let transaction = match RequestTransaction::extract(&mut params) {
        Ok(transaction) => transaction,
        Err(err) => return err.into_response(),
    };

    let span = tracing::debug_span!(
        "Alpaca transaction",
        path = uri.path(),
        params = ?params,
        client_id = transaction.client_id,
        client_transaction_id = transaction.client_transaction_id,
    );

    // Handlers block on serial I/O; keep them off the async workers. The
    // device mutex is acquired inside, for the whole wire transaction.
    let outcome = tokio::task::spawn_blocking(move || {
        span.in_scope(|| resource.dispatch(&device_type, &device_number, &operation, &mut params))
    })
    .await;

    match outcome {
        Ok(Ok(result)) => Envelope::new(transaction, result).into_response(),
        Ok(Err(err)) => err.into_response(),
        Err(err) => handler_failure(&err),
    }
}
