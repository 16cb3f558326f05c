use super::error::Error;
use crate::errors::{ASCOMError, ASCOMResult};
use axum::extract::{FromRequest, Request};
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::Form;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserializer;

/// How parameter names are matched against field names. The comparator is
/// fixed when the request is parsed: query-string names compare ASCII
/// case-insensitively, PUT body names compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyMatch {
    Insensitive,
    Exact,
}

impl KeyMatch {
    fn matches(self, key: &str, name: &str) -> bool {
        match self {
            Self::Insensitive => key.eq_ignore_ascii_case(name),
            Self::Exact => key == name,
        }
    }
}

/// Ordered name → raw-string parameter map. Values stay undecoded until a
/// handler extracts them by name; lookups walk the map in request order
/// under the comparator chosen at parse time.
#[derive(Debug)]
pub(crate) struct OpaqueParams {
    matching: KeyMatch,
    entries: IndexMap<Box<str>, String>,
}

impl OpaqueParams {
    fn take(&mut self, name: &str) -> Option<String> {
        let matching = self.matching;
        let index = self
            .entries
            .keys()
            .position(|key| matching.matches(key, name))?;

        self.entries
            .swap_remove_index(index)
            .map(|(_, value)| value)
    }

    /// Decode a typed field. Missing and malformed fields produce
    /// driver-custom errors that travel inside the envelope.
    pub(crate) fn extract<T: DeserializeOwned>(&mut self, name: &'static str) -> ASCOMResult<T> {
        let raw = self
            .take(name)
            .ok_or_else(|| ASCOMError::custom(format!("Field '{name}' not found")))?;

        serde_plain::from_str(&raw)
            .map_err(|_| ASCOMError::custom(format!("Invalid '{name}' field")))
    }

    /// Transaction ids follow stricter rules: missing defaults to 0,
    /// malformed fails the whole request with HTTP 400.
    pub(crate) fn extract_transaction_id(
        &mut self,
        name: &'static str,
    ) -> super::error::Result<u32> {
        match self.take(name) {
            None => Ok(0),
            Some(raw) => raw.parse().map_err(|_| Error::BadTransactionParam(name)),
        }
    }

    pub(crate) fn finish_extraction(&mut self) {
        if !self.entries.is_empty() {
            tracing::warn!("Unused parameters: {:?}", self.entries.keys());
        }
    }
}

#[cfg(test)]
impl OpaqueParams {
    pub(crate) fn insensitive(pairs: &[(&str, &str)]) -> Self {
        Self::with(KeyMatch::Insensitive, pairs)
    }

    pub(crate) fn exact(pairs: &[(&str, &str)]) -> Self {
        Self::with(KeyMatch::Exact, pairs)
    }

    fn with(matching: KeyMatch, pairs: &[(&str, &str)]) -> Self {
        Self {
            matching,
            entries: pairs
                .iter()
                .map(|(key, value)| (Box::<str>::from(*key), (*value).to_owned()))
                .collect(),
        }
    }
}

/// Request parameters tagged by HTTP method, so that setters can only ever
/// be dispatched with a body-backed map and getters with a query-backed
/// one.
#[derive(Debug)]
pub(crate) enum ActionParams {
    Get(OpaqueParams),
    Put(OpaqueParams),
}

impl ActionParams {
    fn params_mut(&mut self) -> &mut OpaqueParams {
        match self {
            Self::Get(params) | Self::Put(params) => params,
        }
    }

    pub(crate) fn extract_transaction_id(
        &mut self,
        name: &'static str,
    ) -> super::error::Result<u32> {
        self.params_mut().extract_transaction_id(name)
    }

    pub(crate) fn finish_extraction(&mut self) {
        self.params_mut().finish_extraction();
    }
}

#[async_trait::async_trait]
impl<S: Send + Sync> FromRequest<S> for ActionParams {
    type Rejection = axum::response::Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // Decide the comparator up front; anything but GET and PUT is
        // rejected before the body is touched.
        let matching = if *req.method() == Method::GET {
            KeyMatch::Insensitive
        } else if *req.method() == Method::PUT {
            KeyMatch::Exact
        } else {
            return Err((StatusCode::BAD_REQUEST, "Unsupported HTTP method").into_response());
        };

        // `Form` pulls from the query string on GET and from the
        // urlencoded body on PUT, which is exactly the Alpaca split.
        let Form(entries) = Form::<IndexMap<Box<str>, String>>::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let params = OpaqueParams { matching, entries };

        Ok(match matching {
            KeyMatch::Insensitive => Self::Get(params),
            KeyMatch::Exact => Self::Put(params),
        })
    }
}

/// `bool` field that accepts `true`/`false` in any casing, which is what
/// conformance clients actually send.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoolParam(bool);

impl From<BoolParam> for bool {
    fn from(param: BoolParam) -> Self {
        param.0
    }
}

impl<'de> serde::Deserialize<'de> for BoolParam {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = BoolParam;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("'true' or 'false' in any casing")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.eq_ignore_ascii_case("true") {
                    Ok(BoolParam(true))
                } else if v.eq_ignore_ascii_case("false") {
                    Ok(BoolParam(false))
                } else {
                    Err(E::invalid_value(serde::de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}
