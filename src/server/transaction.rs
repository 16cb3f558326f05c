use super::params::ActionParams;
use std::sync::atomic::{AtomicU32, Ordering};

/// Client-supplied transaction identifiers. Missing values default to 0;
/// malformed values reject the request before any handler runs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RequestTransaction {
    pub(crate) client_id: u32,
    pub(crate) client_transaction_id: u32,
}

impl RequestTransaction {
    pub(crate) fn extract(params: &mut ActionParams) -> super::error::Result<Self> {
        Ok(Self {
            client_id: params.extract_transaction_id("ClientID")?,
            client_transaction_id: params.extract_transaction_id("ClientTransactionID")?,
        })
    }
}

/// Process-wide monotone transaction counter. Uniqueness is all that is
/// guaranteed; the value is assigned at envelope-build time and need not
/// match serial wire order.
pub(crate) fn next_server_transaction_id() -> u32 {
    static COUNTER: AtomicU32 = AtomicU32::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_transaction_ids_strictly_increase() {
        let first = next_server_transaction_id();
        let second = next_server_transaction_id();
        assert!(second > first);
    }
}
