//! The DA-sequencer client: window and per-block transaction fetches.

use crate::{
    errors::{Cb58Error, DaClientError},
    types::{Header, NmtRoot, Transaction},
};
use alloy_rpc_client::ReqwestClient;
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

/// A window of headers returned by [`DaClient::fetch_headers_for_window`].
#[derive(Debug, Clone)]
pub struct WindowStart {
    /// Height of the first header in `window`.
    pub from: u64,
    /// Headers whose timestamp falls inside `[start, end)`.
    pub window: Vec<Header>,
    /// The header immediately preceding the window. Always present.
    pub prev: Header,
    /// The first header at or past the window's end, if already known.
    pub next: Option<Header>,
}

/// A continuation of a window fetch, returned by [`DaClient::fetch_remaining_headers_for_window`].
#[derive(Debug, Clone, Default)]
pub struct WindowMore {
    /// Newly observed headers.
    pub window: Vec<Header>,
    /// The first header at or past the window's end, if now known.
    pub next: Option<Header>,
}

/// Rollup transaction payloads extracted from a single DA header, filtered to one namespace.
#[derive(Debug, Clone, Default)]
pub struct TransactionsInBlock {
    /// Raw transaction payloads, in server order.
    pub transactions: Vec<Vec<u8>>,
}

/// The contract the sequencer driver uses to pull ordered data from the DA sequencer.
///
/// Implementations must be safe to call concurrently from independent driver instances; a
/// single driver only ever calls it sequentially.
#[async_trait]
pub trait DaClient: std::fmt::Debug + Send + Sync {
    /// Fetches all headers with `timestamp in [start, end)`, along with the header immediately
    /// preceding the window and, if already available, the first header at or past `end`.
    async fn fetch_headers_for_window(
        &self,
        start: u64,
        end: u64,
    ) -> Result<WindowStart, DaClientError>;

    /// Continues a window fetch from `from_height`, returning any newly available headers and,
    /// if now available, the first header at or past `end`.
    async fn fetch_remaining_headers_for_window(
        &self,
        from_height: u64,
        end: u64,
    ) -> Result<WindowMore, DaClientError>;

    /// Fetches the rollup transactions embedded in `header` belonging to `namespace`, failing if
    /// any returned transaction is tagged with a different namespace.
    async fn fetch_transactions_in_block(
        &self,
        header: &Header,
        namespace: u64,
    ) -> Result<TransactionsInBlock, DaClientError>;
}

/// JSON-RPC wire shape of a DA block header, as actually returned by the sequencer service.
#[derive(Debug, Deserialize)]
struct WireBlockInfo {
    height: u64,
    timestamp: u64,
    timestamp_original: u64,
    l1_head: u64,
    #[serde(rename = "blockId")]
    block_id: String,
}

fn convert_block_info_to_header(wire: WireBlockInfo) -> Result<Header, DaClientError> {
    let root = crate::cb58::decode(&wire.block_id)?;
    Ok(Header {
        height: wire.height,
        timestamp: wire.timestamp,
        timestamp_original: wire.timestamp_original,
        l1_head: wire.l1_head,
        transactions_root: NmtRoot { root },
    })
}

#[derive(Debug, Deserialize)]
struct WireWindowResponse {
    from: u64,
    window: Vec<WireBlockInfo>,
    prev: Option<WireBlockInfo>,
    next: Option<WireBlockInfo>,
}

#[derive(Debug, Deserialize)]
struct WireWindowMoreResponse {
    window: Vec<WireBlockInfo>,
    next: Option<WireBlockInfo>,
}

#[derive(Debug, Deserialize)]
struct WireNamespaceResponse {
    transactions: Vec<Transaction>,
}

impl WireNamespaceResponse {
    /// Validates every transaction's namespace against the expected one, then extracts payloads.
    fn validate(self, expected_namespace: &str) -> Result<TransactionsInBlock, DaClientError> {
        let mut transactions = Vec::with_capacity(self.transactions.len());
        for tx in self.transactions {
            if tx.namespace != expected_namespace {
                return Err(DaClientError::NamespaceMismatch {
                    expected: expected_namespace.to_string(),
                    actual: tx.namespace,
                });
            }
            transactions.push(tx.data);
        }
        Ok(TransactionsInBlock { transactions })
    }
}

/// A JSON-RPC backed [`DaClient`] implementation, mirroring the JSON-RPC HTTP transport already
/// used for the execution engine and L1 in this workspace.
#[derive(Debug, Clone)]
pub struct RpcDaClient {
    rpc: ReqwestClient,
}

impl RpcDaClient {
    /// Builds a new client pointed at `url`.
    pub fn new(url: Url) -> Self {
        Self { rpc: ReqwestClient::new_http(url) }
    }
}

#[async_trait]
impl DaClient for RpcDaClient {
    async fn fetch_headers_for_window(
        &self,
        start: u64,
        end: u64,
    ) -> Result<WindowStart, DaClientError> {
        let resp: WireWindowResponse =
            self.rpc.request("seq_getHeadersForWindow", (start, end)).await?;

        let prev = resp.prev.ok_or(DaClientError::MissingPrev)?;
        let prev = convert_block_info_to_header(prev)?;
        let window =
            resp.window.into_iter().map(convert_block_info_to_header).collect::<Result<_, _>>()?;
        let next = resp.next.map(convert_block_info_to_header).transpose()?;

        Ok(WindowStart { from: resp.from, window, prev, next })
    }

    async fn fetch_remaining_headers_for_window(
        &self,
        from_height: u64,
        end: u64,
    ) -> Result<WindowMore, DaClientError> {
        let resp: WireWindowMoreResponse =
            self.rpc.request("seq_getRemainingHeadersForWindow", (from_height, end)).await?;

        let window =
            resp.window.into_iter().map(convert_block_info_to_header).collect::<Result<_, _>>()?;
        let next = resp.next.map(convert_block_info_to_header).transpose()?;

        Ok(WindowMore { window, next })
    }

    async fn fetch_transactions_in_block(
        &self,
        header: &Header,
        namespace: u64,
    ) -> Result<TransactionsInBlock, DaClientError> {
        let expected = Transaction::encode_namespace(namespace);
        let resp: WireNamespaceResponse = self
            .rpc
            .request("seq_getTransactionsInBlock", (header.height, expected.clone()))
            .await?;

        resp.validate(&expected)
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// An in-memory [`DaClient`] used by driver tests.
    #[derive(Debug, Default)]
    pub struct FakeDaClient {
        pub headers: Mutex<Vec<Header>>,
        pub transactions: Mutex<HashMap<u64, Vec<Transaction>>>,
    }

    #[async_trait]
    impl DaClient for FakeDaClient {
        async fn fetch_headers_for_window(
            &self,
            start: u64,
            end: u64,
        ) -> Result<WindowStart, DaClientError> {
            let headers = self.headers.lock().await;
            let prev_idx = headers.iter().rposition(|h| h.timestamp < start);
            let prev = prev_idx.map(|i| headers[i].clone()).ok_or(DaClientError::MissingPrev)?;
            let from = prev_idx.map_or(0, |i| i as u64 + 1);
            let window: Vec<_> =
                headers.iter().filter(|h| h.timestamp >= start && h.timestamp < end).cloned().collect();
            let next = headers.iter().find(|h| h.timestamp >= end).cloned();
            Ok(WindowStart { from, window, prev, next })
        }

        async fn fetch_remaining_headers_for_window(
            &self,
            from_height: u64,
            end: u64,
        ) -> Result<WindowMore, DaClientError> {
            let headers = self.headers.lock().await;
            let window: Vec<_> = headers
                .iter()
                .filter(|h| h.height >= from_height && h.timestamp < end)
                .cloned()
                .collect();
            let next = headers.iter().find(|h| h.timestamp >= end).cloned();
            Ok(WindowMore { window, next })
        }

        async fn fetch_transactions_in_block(
            &self,
            header: &Header,
            namespace: u64,
        ) -> Result<TransactionsInBlock, DaClientError> {
            let expected = Transaction::encode_namespace(namespace);
            let txs = self.transactions.lock().await;
            let for_block = txs.get(&header.height).cloned().unwrap_or_default();
            WireNamespaceResponse { transactions: for_block }.validate(&expected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::FakeDaClient;
    use super::*;
    use crate::types::NmtRoot;

    fn header(height: u64, timestamp: u64) -> Header {
        Header {
            height,
            timestamp,
            timestamp_original: timestamp * 1000,
            l1_head: 1,
            transactions_root: NmtRoot { root: vec![0u8; 32] },
        }
    }

    #[tokio::test]
    async fn namespace_mismatch_is_rejected() {
        let client = FakeDaClient::default();
        let h = header(1, 100);
        client.headers.lock().await.push(h.clone());
        client.transactions.lock().await.insert(
            1,
            vec![
                Transaction { namespace: "0100000000000000".into(), data: vec![1] },
                Transaction { namespace: "0200000000000000".into(), data: vec![2] },
            ],
        );

        let err = client.fetch_transactions_in_block(&h, 2).await.unwrap_err();
        assert!(matches!(err, DaClientError::NamespaceMismatch { .. }));
    }

    #[tokio::test]
    async fn namespace_filter_returns_only_matching_payloads() {
        let client = FakeDaClient::default();
        let h = header(1, 100);
        client.headers.lock().await.push(h.clone());
        client.transactions.lock().await.insert(
            1,
            vec![
                Transaction { namespace: "0200000000000000".into(), data: vec![10] },
                Transaction { namespace: "0200000000000000".into(), data: vec![20] },
            ],
        );

        let result = client.fetch_transactions_in_block(&h, 2).await.unwrap();
        assert_eq!(result.transactions, vec![vec![10], vec![20]]);
    }
}
