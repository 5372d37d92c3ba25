//! The in-progress DA batch and its window invariants.

use crate::{errors::DriverErrorKind, types::Header};
use kona_protocol::L2BlockInfo;
use tracing::{error, warn};

/// The justified prefix of a DA-derived L2 batch: the header immediately preceding the window,
/// the headers accepted into the window so far, and (once known) the first header at or past the
/// window's end.
#[derive(Debug, Clone, Default)]
pub struct BatchJustification {
    /// The header immediately preceding the window. `None` only before the first response.
    pub prev: Option<Header>,
    /// Headers accepted into the window, in server order.
    pub blocks: Vec<Header>,
    /// The first header with `timestamp >= window_end`, once known.
    pub next: Option<Header>,
}

impl BatchJustification {
    /// A batch is complete once its `next` boundary header is known.
    pub const fn is_complete(&self) -> bool {
        self.next.is_some()
    }

    /// The last accepted header, if any.
    pub fn last(&self) -> Option<&Header> {
        self.blocks.last()
    }
}

/// The driver's in-progress DA batch: the L2 parent it builds upon, its window bounds, the
/// justified prefix collected so far, and the raw rollup transactions extracted from it.
#[derive(Debug, Clone)]
pub struct InProgressBatch {
    /// The L2 block this batch will be built on top of.
    pub onto: L2BlockInfo,
    /// Inclusive start of the window, in seconds.
    pub window_start: u64,
    /// Exclusive end of the window, in seconds.
    pub window_end: u64,
    /// The justification accumulated so far.
    pub justification: BatchJustification,
    /// Raw rollup transactions, in the order their headers were accepted.
    pub transactions: Vec<Vec<u8>>,
}

impl InProgressBatch {
    /// Opens a new batch on top of `onto`, with a window starting one `block_time` after it.
    pub fn new(onto: L2BlockInfo, block_time: u64, prev: Header) -> Self {
        let window_start = onto.block_info.timestamp + block_time;
        let window_end = window_start + block_time;
        Self {
            onto,
            window_start,
            window_end,
            justification: BatchJustification { prev: Some(prev), blocks: Vec::new(), next: None },
            transactions: Vec::new(),
        }
    }

    /// Whether the justification is complete (i.e. the batch may be sealed).
    pub const fn is_complete(&self) -> bool {
        self.justification.is_complete()
    }

    /// The height from which the next "remaining headers" fetch should resume.
    pub fn next_fetch_height(&self) -> u64 {
        match self.justification.last() {
            Some(h) => h.height + 1,
            None => self.justification.prev.as_ref().map_or(0, |p| p.height + 1),
        }
    }

    /// Validates and appends a newly-fetched header to the justification, per the lenient
    /// anomaly policy: headers past `window_end` are a critical contract violation; headers
    /// before `window_start`, or out of timestamp order relative to the previous header, are
    /// accepted but logged as anomalies.
    pub fn accept_header(&mut self, header: Header) -> Result<(), DriverErrorKind> {
        if header.timestamp >= self.window_end {
            return Err(DriverErrorKind::crit(HeaderWindowViolation {
                height: header.height,
                timestamp: header.timestamp,
                window_end: self.window_end,
            }));
        }

        if header.timestamp < self.window_start {
            error!(
                target: "nodekit_driver",
                height = header.height,
                timestamp = header.timestamp,
                window_start = self.window_start,
                "header timestamp precedes window start; accepting anyway (known DA anomaly)"
            );
            #[cfg(feature = "metrics")]
            metrics::counter!(crate::metrics::Metrics::NODEKIT_WINDOW_ANOMALY_COUNT).increment(1);
        }

        if let Some(prior) = self.justification.last() {
            if header.timestamp < prior.timestamp {
                error!(
                    target: "nodekit_driver",
                    height = header.height,
                    timestamp = header.timestamp,
                    prior_timestamp = prior.timestamp,
                    "header timestamp precedes prior header; accepting anyway (known DA anomaly)"
                );
                #[cfg(feature = "metrics")]
                metrics::counter!(crate::metrics::Metrics::NODEKIT_WINDOW_ANOMALY_COUNT)
                    .increment(1);
            }
        }

        self.justification.blocks.push(header);
        Ok(())
    }

    /// Appends namespace-filtered rollup transaction payloads extracted from one header.
    pub fn append_transactions(&mut self, payloads: Vec<Vec<u8>>) {
        self.transactions.extend(payloads);
    }

    /// Marks the justification's `next` boundary, completing the batch.
    pub fn complete_with(&mut self, next: Option<Header>) {
        self.justification.next = next;
    }

    /// Drops all accumulated rollup transactions without touching the justification, used when
    /// the sequencer-drift constraint forces an empty batch.
    pub fn clear_transactions(&mut self) {
        if !self.transactions.is_empty() {
            warn!(
                target: "nodekit_driver",
                count = self.transactions.len(),
                "clearing batch transactions to honor max sequencer drift"
            );
        }
        self.transactions.clear();
    }
}

/// A header arrived whose timestamp is at or past the window's exclusive end: a violation of
/// the DA sequencer's contract with the driver.
#[derive(Debug, thiserror::Error)]
#[error("header at height {height} has timestamp {timestamp} >= window_end {window_end}")]
pub struct HeaderWindowViolation {
    /// The offending header's height.
    pub height: u64,
    /// The offending header's timestamp.
    pub timestamp: u64,
    /// The window's exclusive end.
    pub window_end: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NmtRoot;
    use alloy_primitives::B256;
    use kona_protocol::BlockInfo;

    fn header(height: u64, timestamp: u64) -> Header {
        Header {
            height,
            timestamp,
            timestamp_original: timestamp * 1000,
            l1_head: 1,
            transactions_root: NmtRoot { root: vec![0u8; 32] },
        }
    }

    fn onto(timestamp: u64) -> L2BlockInfo {
        L2BlockInfo {
            block_info: BlockInfo { hash: B256::ZERO, number: 10, parent_hash: B256::ZERO, timestamp },
            l1_origin: Default::default(),
            seq_num: 0,
        }
    }

    #[test]
    fn window_bounds_derive_from_parent_and_block_time() {
        let batch = InProgressBatch::new(onto(100), 2, header(0, 98));
        assert_eq!(batch.window_start, 102);
        assert_eq!(batch.window_end, 104);
    }

    #[test]
    fn header_past_window_end_is_critical() {
        let mut batch = InProgressBatch::new(onto(100), 2, header(0, 98));
        let err = batch.accept_header(header(1, 104)).unwrap_err();
        assert!(err.is_critical());
    }

    #[test]
    fn header_before_window_start_is_accepted() {
        let mut batch = InProgressBatch::new(onto(100), 2, header(0, 98));
        assert!(batch.accept_header(header(1, 99)).is_ok());
        assert_eq!(batch.justification.blocks.len(), 1);
    }

    #[test]
    fn out_of_order_timestamp_is_accepted_and_preserves_order() {
        let mut batch = InProgressBatch::new(onto(100), 2, header(0, 98));
        batch.accept_header(header(1, 103)).unwrap();
        batch.accept_header(header(2, 102)).unwrap();
        assert_eq!(batch.justification.blocks[0].height, 1);
        assert_eq!(batch.justification.blocks[1].height, 2);
    }

    #[test]
    fn batch_completes_once_next_is_set() {
        let mut batch = InProgressBatch::new(onto(100), 2, header(0, 98));
        assert!(!batch.is_complete());
        batch.complete_with(Some(header(5, 104)));
        assert!(batch.is_complete());
    }
}
