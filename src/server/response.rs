use super::transaction::{next_server_transaction_id, RequestTransaction};
use crate::errors::ASCOMResult;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// The uniform Alpaca response envelope. Key order is part of the external
/// contract and follows field declaration order.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope {
    #[serde(rename = "Value")]
    pub(crate) value: Value,
    #[serde(rename = "ClientID")]
    pub(crate) client_id: u32,
    #[serde(rename = "ErrorNumber")]
    pub(crate) error_number: u32,
    #[serde(rename = "ErrorMessage")]
    pub(crate) error_message: String,
    #[serde(rename = "ClientTransactionID")]
    pub(crate) client_transaction_id: u32,
    #[serde(rename = "ServerTransactionID")]
    pub(crate) server_transaction_id: u32,
}

impl Envelope {
    /// Wraps a handler outcome. Handler errors still answer HTTP 200; the
    /// error lives in `ErrorNumber`/`ErrorMessage` with a null `Value`.
    pub(crate) fn new(transaction: RequestTransaction, outcome: ASCOMResult<Value>) -> Self {
        let (value, error_number, error_message) = match outcome {
            Ok(value) => (value, 0, String::new()),
            Err(error) => {
                tracing::warn!(%error, "Alpaca handler returned an error");
                (
                    Value::Null,
                    u32::from(error.code.as_u16()),
                    error.message.into_owned(),
                )
            }
        };

        Self {
            value,
            client_id: transaction.client_id,
            error_number,
            error_message,
            client_transaction_id: transaction.client_transaction_id,
            server_transaction_id: next_server_transaction_id(),
        }
    }

    pub(crate) fn ok(transaction: RequestTransaction, value: Value) -> Self {
        Self::new(transaction, Ok(value))
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}
