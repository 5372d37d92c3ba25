//! The sequencer driver state machine: mode detection, DA-batch assembly, and legacy sequencing.
//!
//! Grounded in the upstream `Sequencer` driver: `PlanNextAction`/`RunNextAction` decide and then
//! execute at most one step, `StartBuildingBlock`/`CompleteBuildingBlock`/`CancelBuildingBlock`
//! are the lower-level entry points the tests exercise directly, and `BuildingOnto` exposes the
//! block currently being built.

use crate::{
    batch::InProgressBatch,
    client::DaClient,
    errors::DriverErrorKind,
    origin,
    types::Header,
};
use alloy_eips::BlockNumHash;
use async_trait::async_trait;
use kona_genesis::RollupConfig;
use kona_protocol::{BlockInfo, L2BlockInfo};
use op_alloy_rpc_types_engine::{OpExecutionPayloadEnvelope, OpPayloadAttributes};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

/// How long the driver waits before retrying after a recoverable error.
const TEMPORARY_RETRY_DELAY: Duration = Duration::from_secs(1);
/// How long the driver waits, once a DA window is open but not yet complete, before polling again.
const WINDOW_POLL_DELAY: Duration = Duration::from_secs(1);
/// Margin before a legacy block's deadline at which the driver seals it rather than waiting
/// for the deadline itself.
const SEALING_DURATION: Duration = Duration::from_millis(50);

/// The three-valued driver mode. Holding a batch is only representable once in [`Mode::DaMode`].
#[derive(Debug, Default)]
pub enum Mode {
    /// Mode has not yet been detected from the system config.
    #[default]
    Unknown,
    /// Classic, non-DA-sequenced block production.
    Legacy,
    /// DA-sequencer-driven block production, with an optional in-progress batch.
    DaMode(Option<InProgressBatch>),
}

/// The engine control surface the driver consumes. A narrow adapter over whatever channel-based
/// or direct engine client the embedding actor already uses.
#[async_trait]
pub trait EngineControl: std::fmt::Debug + Send + Sync {
    /// The engine's current unsafe L2 head.
    fn unsafe_l2_head(&self) -> L2BlockInfo;

    /// Whether the engine is currently building a payload, and if so, whether it is a *safe*
    /// block (in which case the driver must not interrupt it).
    async fn building_payload(&self) -> Option<BuildingPayload>;

    /// Starts building a payload on top of `onto` with the given attributes.
    async fn start_payload(
        &self,
        onto: L2BlockInfo,
        attrs: OpPayloadAttributes,
    ) -> Result<(), DriverErrorKind>;

    /// Confirms (finalizes) the currently building payload.
    async fn confirm_payload(&self) -> Result<OpExecutionPayloadEnvelope, DriverErrorKind>;

    /// Cancels the currently building payload, if any.
    async fn cancel_payload(&self, force: bool) -> Result<(), DriverErrorKind>;
}

/// A payload the engine is currently building.
#[derive(Debug, Clone, Copy)]
pub struct BuildingPayload {
    /// The L2 block the payload is built on top of.
    pub onto: L2BlockInfo,
    /// Whether this payload extends the *safe* chain, as opposed to the unsafe tip.
    pub is_safe: bool,
}

/// Selects the next L1 origin for an L2 parent. A narrow trait so the driver does not depend on
/// the concrete `L1OriginSelector` the embedding actor already owns.
#[async_trait]
pub trait L1OriginSelectorIface: std::fmt::Debug + Send + Sync {
    /// Finds the L1 origin the next L2 block on top of `l2_head` should be anchored to.
    async fn find_l1_origin(&self, l2_head: L2BlockInfo) -> Result<BlockInfo, DriverErrorKind>;
}

/// Builds payload attributes for an L2 parent and L1 origin, optionally constrained by a DA
/// batch's justification. A deliberate generalization of the upstream attributes builder contract
/// to carry the justification end-to-end; see `DESIGN.md`.
#[async_trait]
pub trait DaAttributesBuilder: std::fmt::Debug + Send + Sync {
    /// Prepares payload attributes for `l2_parent` anchored at `epoch`. When `justification` is
    /// `Some`, the attributes are being built for a DA-sequenced batch and the justification's
    /// contents constrain them (besides being forced `no_tx_pool`).
    async fn prepare_payload_attributes(
        &self,
        l2_parent: L2BlockInfo,
        epoch: BlockNumHash,
        justification: Option<&crate::batch::BatchJustification>,
    ) -> Result<OpPayloadAttributes, DriverErrorKind>;
}

/// Reads whether DA-mode is active from the L2 system config at `head`.
#[async_trait]
pub trait SystemConfigFetcher: std::fmt::Debug + Send + Sync {
    /// Returns `true` if the rollup's system config marks this chain as DA-sequenced.
    async fn da_mode_enabled(&self, head: L2BlockInfo) -> Result<bool, DriverErrorKind>;
}

/// The sequencer driver: the CORE of this crate, assembling DA-sequenced blocks (or falling back
/// to legacy sequencing) and driving the execution engine.
#[derive(Debug)]
pub struct SequencerDriver<E, D, O, A, S> {
    cfg: Arc<RollupConfig>,
    engine: E,
    da_client: D,
    origin_selector: O,
    attrs_builder: A,
    sys_config: S,
    rollup_namespace: u64,
    mode: Mode,
    next_action_delay: Duration,
}

impl<E, D, O, A, S> SequencerDriver<E, D, O, A, S>
where
    E: EngineControl,
    D: DaClient,
    O: L1OriginSelectorIface,
    A: DaAttributesBuilder,
    S: SystemConfigFetcher,
{
    /// Builds a new driver. `rollup_namespace` is the DA-sequencer namespace this rollup's
    /// transactions are tagged with.
    pub fn new(
        cfg: Arc<RollupConfig>,
        engine: E,
        da_client: D,
        origin_selector: O,
        attrs_builder: A,
        sys_config: S,
        rollup_namespace: u64,
    ) -> Self {
        Self {
            cfg,
            engine,
            da_client,
            origin_selector,
            attrs_builder,
            sys_config,
            rollup_namespace,
            mode: Mode::default(),
            next_action_delay: Duration::ZERO,
        }
    }

    /// The L2 block the current DA batch (if any) is building on top of.
    pub fn building_onto(&self) -> Option<L2BlockInfo> {
        match &self.mode {
            Mode::DaMode(Some(batch)) => Some(batch.onto),
            _ => None,
        }
    }

    /// Decides how long the scheduler should wait before the next `run_next_action` call.
    pub async fn plan_next_action(&self) -> Duration {
        let building = self.engine.building_payload().await;
        if let Some(building) = &building {
            if building.is_safe {
                return Duration::from_secs(self.cfg.block_time);
            }
        }

        match &self.mode {
            Mode::Unknown => Duration::ZERO,
            Mode::DaMode(Some(batch)) => {
                let head = self.engine.unsafe_l2_head();
                if head.block_info.hash != batch.onto.block_info.hash {
                    return Duration::ZERO;
                }
                self.next_action_delay
            }
            Mode::DaMode(None) => self.next_action_delay,
            Mode::Legacy => {
                if self.next_action_delay > Duration::ZERO {
                    self.next_action_delay
                } else {
                    self.plan_next_legacy_action(building)
                }
            }
        }
    }

    /// Schedules relative to `head.time + block_time`, the legacy block's deadline: while no
    /// payload is building yet, wait until `block_time` before the deadline to start one; once
    /// one is building on top of the current head, wait until `sealing_duration` before the
    /// deadline to seal it.
    fn plan_next_legacy_action(&self, building: Option<BuildingPayload>) -> Duration {
        let head = self.engine.unsafe_l2_head();
        let building_onto_head =
            building.is_some_and(|b| b.onto.block_info.hash == head.block_info.hash);

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        let payload_time = Duration::from_secs(head.block_info.timestamp + self.cfg.block_time);
        let remaining = payload_time.saturating_sub(now);

        if building_onto_head {
            remaining.saturating_sub(SEALING_DURATION)
        } else {
            remaining.saturating_sub(Duration::from_secs(self.cfg.block_time))
        }
    }

    /// Executes at most one driver step, returning a sealed payload if one was produced.
    pub async fn run_next_action(&mut self) -> Result<Option<OpExecutionPayloadEnvelope>, DriverErrorKind> {
        if let Some(building) = self.engine.building_payload().await {
            if building.is_safe {
                // Never interrupt safe-head block production.
                return Ok(None);
            }
        }

        if matches!(self.mode, Mode::Unknown) {
            self.detect_mode().await?;
        }

        let result = match &self.mode {
            Mode::DaMode(_) => self.run_da_batch().await,
            Mode::Legacy => self.run_legacy_block().await,
            Mode::Unknown => Ok(None),
        };

        self.handle_result(result).await
    }

    /// Applies the error-classification policy: critical errors propagate, everything else is
    /// recovered internally by scheduling the appropriate retry delay.
    async fn handle_result(
        &mut self,
        result: Result<Option<OpExecutionPayloadEnvelope>, DriverErrorKind>,
    ) -> Result<Option<OpExecutionPayloadEnvelope>, DriverErrorKind> {
        match result {
            Ok(value) => {
                self.next_action_delay = Duration::ZERO;
                Ok(value)
            }
            Err(err @ DriverErrorKind::Critical(_)) => {
                error!(target: "nodekit_driver", ?err, "critical error, bubbling up");
                Err(err)
            }
            Err(DriverErrorKind::Reset(err)) => {
                warn!(target: "nodekit_driver", %err, "reset error, retrying after one block_time");
                self.next_action_delay = Duration::from_secs(self.cfg.block_time);
                Ok(None)
            }
            Err(DriverErrorKind::Temporary(err)) => {
                warn!(target: "nodekit_driver", %err, "temporary error, retrying shortly");
                self.next_action_delay = TEMPORARY_RETRY_DELAY;
                Ok(None)
            }
            Err(err @ DriverErrorKind::Local(_)) => {
                warn!(target: "nodekit_driver", ?err, "local validation error, returning to caller unretried");
                Err(err)
            }
            Err(DriverErrorKind::Unclassified(err)) => {
                warn!(target: "nodekit_driver", %err, "unclassified error, cancelling in-flight payload and retrying shortly");
                if let Err(cancel_err) = self.engine.cancel_payload(true).await {
                    error!(target: "nodekit_driver", ?cancel_err, "failed to cancel in-flight payload");
                }
                self.next_action_delay = TEMPORARY_RETRY_DELAY;
                Ok(None)
            }
        }
    }

    async fn detect_mode(&mut self) -> Result<(), DriverErrorKind> {
        let head = self.engine.unsafe_l2_head();
        let enabled = self.sys_config.da_mode_enabled(head).await?;
        self.mode = if enabled { Mode::DaMode(None) } else { Mode::Legacy };
        Ok(())
    }

    async fn run_da_batch(&mut self) -> Result<Option<OpExecutionPayloadEnvelope>, DriverErrorKind> {
        let head = self.engine.unsafe_l2_head();

        // Reorg check: drop any batch no longer building on the current head.
        if let Mode::DaMode(Some(batch)) = &self.mode {
            if batch.onto.block_info.hash != head.block_info.hash {
                warn!(target: "nodekit_driver", "detected reorg, dropping in-progress DA batch");
                #[cfg(feature = "metrics")]
                metrics::counter!(crate::metrics::Metrics::NODEKIT_REORG_COUNT).increment(1);
                self.mode = Mode::DaMode(None);
            }
        }

        if matches!(self.mode, Mode::DaMode(None)) {
            self.start_building_block().await?;
            return Ok(None);
        }

        let Mode::DaMode(Some(batch)) = &mut self.mode else {
            return Ok(None);
        };

        if !batch.is_complete() {
            Self::advance_batch(batch, &self.da_client, self.rollup_namespace).await?;
        }

        let Mode::DaMode(Some(batch)) = &self.mode else { return Ok(None) };
        if !batch.is_complete() {
            self.next_action_delay = WINDOW_POLL_DELAY;
            return Ok(None);
        }

        self.seal_batch().await.map(Some)
    }

    /// Opens a new DA batch on top of the current unsafe head.
    pub async fn start_building_block(&mut self) -> Result<(), DriverErrorKind> {
        let head = self.engine.unsafe_l2_head();
        let window_start = head.block_info.timestamp + self.cfg.block_time;
        let window_end = window_start + self.cfg.block_time;

        let response = self
            .da_client
            .fetch_headers_for_window(window_start, window_end)
            .await
            .map_err(DriverErrorKind::from)?;

        let mut batch = InProgressBatch::new(head, self.cfg.block_time, response.prev);
        for h in response.window {
            batch.accept_header(h)?;
        }
        if let Some(next) = response.next.clone() {
            batch.complete_with(Some(next));
        }
        for h in batch.justification.blocks.clone() {
            self.fetch_and_append(&mut batch, &h).await?;
        }

        self.mode = Mode::DaMode(Some(batch));
        Ok(())
    }

    async fn advance_batch(
        batch: &mut InProgressBatch,
        da_client: &D,
        rollup_namespace: u64,
    ) -> Result<(), DriverErrorKind> {
        let from_height = batch.next_fetch_height();
        let response = da_client
            .fetch_remaining_headers_for_window(from_height, batch.window_end)
            .await
            .map_err(DriverErrorKind::from)?;

        for h in response.window {
            batch.accept_header(h.clone())?;
            let txs = da_client
                .fetch_transactions_in_block(&h, rollup_namespace)
                .await
                .map_err(DriverErrorKind::from)?;
            batch.append_transactions(txs.transactions);
        }

        if let Some(next) = response.next {
            batch.complete_with(Some(next));
        }

        Ok(())
    }

    async fn fetch_and_append(
        &self,
        batch: &mut InProgressBatch,
        header: &Header,
    ) -> Result<(), DriverErrorKind> {
        let txs = self
            .da_client
            .fetch_transactions_in_block(header, self.rollup_namespace)
            .await
            .map_err(DriverErrorKind::from)?;
        batch.append_transactions(txs.transactions);
        Ok(())
    }

    /// Tries to complete an incomplete batch's justification and, if now complete, seal it.
    pub async fn try_to_seal_batch(
        &mut self,
    ) -> Result<Option<OpExecutionPayloadEnvelope>, DriverErrorKind> {
        {
            let Mode::DaMode(Some(batch)) = &mut self.mode else { return Ok(None) };
            if !batch.is_complete() {
                Self::advance_batch(batch, &self.da_client, self.rollup_namespace).await?;
            }
        }
        let Mode::DaMode(Some(batch)) = &self.mode else { return Ok(None) };
        if !batch.is_complete() {
            return Ok(None);
        }
        self.seal_batch().await.map(Some)
    }

    async fn seal_batch(&mut self) -> Result<OpExecutionPayloadEnvelope, DriverErrorKind> {
        let seal_start = std::time::Instant::now();
        let Mode::DaMode(Some(mut batch)) = std::mem::take(&mut self.mode) else {
            unreachable!("seal_batch called without a complete batch")
        };

        debug_assert!(batch.is_complete(), "seal_batch requires a complete justification");

        let candidate = self.origin_selector.find_l1_origin(batch.onto).await?;
        let l1_origin = origin::next_l1_origin(batch.onto.l1_origin.hash, &candidate)
            .map_err(DriverErrorKind::reset)?;

        if origin::batch_must_be_empty(&self.cfg, &l1_origin, batch.window_start) {
            batch.clear_transactions();
        }

        let epoch = BlockNumHash { number: l1_origin.number, hash: l1_origin.hash };
        let mut attrs = self
            .attrs_builder
            .prepare_payload_attributes(batch.onto, epoch, Some(&batch.justification))
            .await?;
        attrs.no_tx_pool = Some(true);

        let existing = attrs.transactions.get_or_insert_with(Vec::new);
        existing.extend(batch.transactions.iter().cloned().map(alloy_primitives::Bytes::from));

        self.engine.start_payload(batch.onto, attrs).await?;
        let envelope = self.engine.confirm_payload().await?;

        info!(
            target: "nodekit_driver",
            onto = batch.onto.block_info.number,
            window_start = batch.window_start,
            window_end = batch.window_end,
            "sealed DA-sequenced block"
        );

        #[cfg(feature = "metrics")]
        metrics::gauge!(crate::metrics::Metrics::NODEKIT_BATCH_SEAL_DURATION)
            .set(seal_start.elapsed().as_secs_f64());

        self.mode = Mode::DaMode(None);
        Ok(envelope)
    }

    /// Discards the current in-progress batch, if any, without sealing it.
    pub fn cancel_building_block(&mut self) {
        if let Mode::DaMode(batch @ Some(_)) = &mut self.mode {
            *batch = None;
        }
    }

    /// Runs one step of the classical (non-DA) sequencer loop: starts a payload on top of the
    /// current head, or, if one is already building there, confirms it. Unlike DA mode there is
    /// no in-memory batch state; `engine.building_payload()` is the sole source of truth for
    /// which half of the cycle we are in.
    async fn run_legacy_block(&mut self) -> Result<Option<OpExecutionPayloadEnvelope>, DriverErrorKind> {
        let head = self.engine.unsafe_l2_head();
        let building_onto_head = self
            .engine
            .building_payload()
            .await
            .is_some_and(|b| !b.is_safe && b.onto.block_info.hash == head.block_info.hash);

        if building_onto_head {
            let envelope = self.engine.confirm_payload().await?;
            info!(
                target: "nodekit_driver",
                onto = head.block_info.number,
                "sealed legacy-sequenced block"
            );
            return Ok(Some(envelope));
        }

        self.start_legacy_block(head).await?;
        Ok(None)
    }

    /// Opens a new legacy payload build on top of `head`, applying every override the upstream
    /// sequencer loop forces `no_tx_pool` true for: sequencer drift and each hardfork's first
    /// block.
    async fn start_legacy_block(&mut self, head: L2BlockInfo) -> Result<(), DriverErrorKind> {
        let candidate = self.origin_selector.find_l1_origin(head).await?;
        let l1_origin =
            origin::next_l1_origin(head.l1_origin.hash, &candidate).map_err(DriverErrorKind::reset)?;
        let epoch = BlockNumHash { number: l1_origin.number, hash: l1_origin.hash };

        let mut attrs = self.attrs_builder.prepare_payload_attributes(head, epoch, None).await?;
        attrs.no_tx_pool = Some(false);

        let timestamp = attrs.payload_attributes.timestamp;
        if timestamp > l1_origin.timestamp + self.cfg.max_sequencer_drift(l1_origin.timestamp) {
            attrs.no_tx_pool = Some(true);
        }
        if self.cfg.is_first_ecotone_block(timestamp) {
            info!(target: "nodekit_driver", "sequencing ecotone upgrade block");
            attrs.no_tx_pool = Some(true);
        }
        if self.cfg.is_first_fjord_block(timestamp) {
            info!(target: "nodekit_driver", "sequencing fjord upgrade block");
            attrs.no_tx_pool = Some(true);
        }
        if self.cfg.is_first_granite_block(timestamp) {
            info!(target: "nodekit_driver", "sequencing granite upgrade block");
            attrs.no_tx_pool = Some(true);
        }
        if self.cfg.is_first_holocene_block(timestamp) {
            info!(target: "nodekit_driver", "sequencing holocene upgrade block");
            attrs.no_tx_pool = Some(true);
        }
        if self.cfg.is_first_isthmus_block(timestamp) {
            info!(target: "nodekit_driver", "sequencing isthmus upgrade block");
            attrs.no_tx_pool = Some(true);
        }
        if self.cfg.is_first_interop_block(timestamp) {
            info!(target: "nodekit_driver", "sequencing interop upgrade block");
            attrs.no_tx_pool = Some(true);
        }

        self.engine.start_payload(head, attrs).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{TransactionsInBlock, WindowMore, WindowStart, fakes::FakeDaClient},
        errors::DaClientError,
        types::NmtRoot,
    };
    use alloy_primitives::B256;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug)]
    struct FakeEngine {
        head: StdMutex<L2BlockInfo>,
        start_calls: StdMutex<Vec<(L2BlockInfo, OpPayloadAttributes)>>,
    }

    impl FakeEngine {
        fn new(head: L2BlockInfo) -> Self {
            Self { head: StdMutex::new(head), start_calls: StdMutex::new(Vec::new()) }
        }

        fn set_head(&self, head: L2BlockInfo) {
            *self.head.lock().unwrap() = head;
        }
    }

    #[async_trait]
    impl EngineControl for FakeEngine {
        fn unsafe_l2_head(&self) -> L2BlockInfo {
            *self.head.lock().unwrap()
        }
        async fn building_payload(&self) -> Option<BuildingPayload> {
            None
        }
        async fn start_payload(
            &self,
            onto: L2BlockInfo,
            attrs: OpPayloadAttributes,
        ) -> Result<(), DriverErrorKind> {
            self.start_calls.lock().unwrap().push((onto, attrs));
            Ok(())
        }
        async fn confirm_payload(&self) -> Result<OpExecutionPayloadEnvelope, DriverErrorKind> {
            Err(DriverErrorKind::unclassified(std::io::Error::other("not used in this test")))
        }
        async fn cancel_payload(&self, _force: bool) -> Result<(), DriverErrorKind> {
            Ok(())
        }
    }

    // Shares one `FakeEngine`/`FakeDaClient` between the driver (which takes ownership of its
    // collaborators) and the test (which needs to inspect/mutate them across ticks).
    #[async_trait]
    impl EngineControl for Arc<FakeEngine> {
        fn unsafe_l2_head(&self) -> L2BlockInfo {
            self.as_ref().unsafe_l2_head()
        }
        async fn building_payload(&self) -> Option<BuildingPayload> {
            self.as_ref().building_payload().await
        }
        async fn start_payload(
            &self,
            onto: L2BlockInfo,
            attrs: OpPayloadAttributes,
        ) -> Result<(), DriverErrorKind> {
            self.as_ref().start_payload(onto, attrs).await
        }
        async fn confirm_payload(&self) -> Result<OpExecutionPayloadEnvelope, DriverErrorKind> {
            self.as_ref().confirm_payload().await
        }
        async fn cancel_payload(&self, force: bool) -> Result<(), DriverErrorKind> {
            self.as_ref().cancel_payload(force).await
        }
    }

    #[async_trait]
    impl DaClient for Arc<FakeDaClient> {
        async fn fetch_headers_for_window(
            &self,
            start: u64,
            end: u64,
        ) -> Result<WindowStart, DaClientError> {
            self.as_ref().fetch_headers_for_window(start, end).await
        }
        async fn fetch_remaining_headers_for_window(
            &self,
            from_height: u64,
            end: u64,
        ) -> Result<WindowMore, DaClientError> {
            self.as_ref().fetch_remaining_headers_for_window(from_height, end).await
        }
        async fn fetch_transactions_in_block(
            &self,
            header: &Header,
            namespace: u64,
        ) -> Result<TransactionsInBlock, DaClientError> {
            self.as_ref().fetch_transactions_in_block(header, namespace).await
        }
    }

    /// A [`DaClient`] that returns a malformed "remaining headers" response on purpose, to drive
    /// the critical header-window-violation path without relying on `FakeDaClient`'s filtering
    /// (which never produces such a response).
    #[derive(Debug, Default)]
    struct ViolatingDaClient;

    #[async_trait]
    impl DaClient for ViolatingDaClient {
        async fn fetch_headers_for_window(
            &self,
            _start: u64,
            _end: u64,
        ) -> Result<WindowStart, DaClientError> {
            Ok(WindowStart { from: 0, window: Vec::new(), prev: header_at(0, 98), next: None })
        }
        async fn fetch_remaining_headers_for_window(
            &self,
            _from_height: u64,
            end: u64,
        ) -> Result<WindowMore, DaClientError> {
            Ok(WindowMore { window: vec![header_at(1, end)], next: None })
        }
        async fn fetch_transactions_in_block(
            &self,
            _header: &Header,
            _namespace: u64,
        ) -> Result<TransactionsInBlock, DaClientError> {
            Ok(TransactionsInBlock::default())
        }
    }

    #[derive(Debug)]
    struct FakeOriginSelector {
        candidate: BlockInfo,
    }

    #[async_trait]
    impl L1OriginSelectorIface for FakeOriginSelector {
        async fn find_l1_origin(&self, _l2_head: L2BlockInfo) -> Result<BlockInfo, DriverErrorKind> {
            Ok(self.candidate)
        }
    }

    #[derive(Debug, Default)]
    struct FakeAttrsBuilder;

    #[async_trait]
    impl DaAttributesBuilder for FakeAttrsBuilder {
        async fn prepare_payload_attributes(
            &self,
            l2_parent: L2BlockInfo,
            _epoch: BlockNumHash,
            _justification: Option<&crate::batch::BatchJustification>,
        ) -> Result<OpPayloadAttributes, DriverErrorKind> {
            let mut attrs = OpPayloadAttributes::default();
            attrs.payload_attributes.timestamp = l2_parent.block_info.timestamp + 2;
            Ok(attrs)
        }
    }

    #[derive(Debug)]
    struct FakeSystemConfig {
        da_mode: bool,
    }

    #[async_trait]
    impl SystemConfigFetcher for FakeSystemConfig {
        async fn da_mode_enabled(&self, _head: L2BlockInfo) -> Result<bool, DriverErrorKind> {
            Ok(self.da_mode)
        }
    }

    fn l2_block(number: u64, hash: u8, timestamp: u64) -> L2BlockInfo {
        L2BlockInfo {
            block_info: BlockInfo {
                hash: B256::repeat_byte(hash),
                number,
                parent_hash: B256::ZERO,
                timestamp,
            },
            l1_origin: BlockNumHash { number: 1, hash: B256::ZERO },
            seq_num: 0,
        }
    }

    fn header_at(height: u64, timestamp: u64) -> Header {
        Header {
            height,
            timestamp,
            timestamp_original: timestamp * 1000,
            l1_head: 1,
            transactions_root: NmtRoot { root: vec![0u8; 32] },
        }
    }

    /// An L1 origin that is always accepted as same-origin by [`origin::next_l1_origin`], no
    /// matter which L2 head it is checked against in these tests (all share the same genesis
    /// `l1_origin`).
    fn fixed_candidate() -> BlockInfo {
        BlockInfo { hash: B256::ZERO, number: 1, parent_hash: B256::repeat_byte(0xff), timestamp: 1000 }
    }

    fn test_cfg(block_time: u64) -> Arc<RollupConfig> {
        let mut cfg = RollupConfig::default();
        cfg.block_time = block_time;
        Arc::new(cfg)
    }

    #[test]
    fn mode_defaults_to_unknown() {
        assert!(matches!(Mode::default(), Mode::Unknown));
    }

    #[tokio::test]
    async fn da_client_window_fetch_returns_prev_and_window() {
        let client = FakeDaClient::default();
        let header = |h: u64, t: u64| Header {
            height: h,
            timestamp: t,
            timestamp_original: t * 1000,
            l1_head: 1,
            transactions_root: NmtRoot { root: vec![0u8; 32] },
        };
        client.headers.lock().await.extend([header(0, 98), header(1, 100), header(2, 101)]);

        let window = client.fetch_headers_for_window(100, 102).await.unwrap();
        assert_eq!(window.prev.height, 0);
        assert_eq!(window.window.len(), 2);
    }

    #[test]
    fn l2_block_helper_links_origin_to_genesis() {
        let block = l2_block(1, 1, 100);
        assert_eq!(block.l1_origin.number, 1);
        assert_eq!(block.block_info.number, 1);
    }

    /// Window validity: a two-tick window fills and seals with zero transactions:
    /// `start_building_block` opens the window with nothing in it yet, and once the
    /// remaining-headers fetch reports the window's boundary header, `try_to_seal_batch` seals.
    #[tokio::test]
    async fn window_builds_then_seals_across_two_ticks() {
        let head = l2_block(10, 1, 100);
        let da_client = Arc::new(FakeDaClient::default());
        da_client.headers.lock().await.push(header_at(0, 100));

        let engine = Arc::new(FakeEngine::new(head));
        let mut driver = SequencerDriver::new(
            test_cfg(2),
            engine.clone(),
            da_client.clone(),
            FakeOriginSelector { candidate: fixed_candidate() },
            FakeAttrsBuilder,
            FakeSystemConfig { da_mode: true },
            7,
        );

        // Tick 1: open the window (head.time=100, block_time=2 => [102, 104)). No headers in
        // range yet, so the batch stays incomplete.
        driver.start_building_block().await.unwrap();
        assert_eq!(driver.building_onto().map(|b| b.block_info.hash), Some(head.block_info.hash));

        // Tick 2: the window fills and its boundary header (timestamp >= window_end) arrives.
        da_client.headers.lock().await.extend([header_at(1, 102), header_at(2, 103), header_at(3, 104)]);
        let result = driver.try_to_seal_batch().await;

        // The engine's `confirm_payload` deliberately errors (see `FakeEngine`), but the call
        // having reached `start_payload` with an empty transaction list proves the window
        // completed and the driver attempted to seal with zero transactions.
        assert!(result.is_err());
        let calls = engine.start_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.block_info.hash, head.block_info.hash);
        assert!(calls[0].1.transactions.as_ref().map_or(true, |txs| txs.is_empty()));
    }

    /// Reorg mid-batch: while a batch is building onto head `A`, the engine's unsafe head
    /// moves to `B`. The next tick must drop the batch without touching the engine and open
    /// a fresh window anchored at `B`.
    #[tokio::test]
    async fn reorg_drops_batch_and_reopens_on_new_head() {
        let head_a = l2_block(10, 1, 100);
        let head_b = l2_block(10, 2, 100);
        let da_client = Arc::new(FakeDaClient::default());
        da_client.headers.lock().await.push(header_at(0, 100));

        let engine = Arc::new(FakeEngine::new(head_a));
        let mut driver = SequencerDriver::new(
            test_cfg(2),
            engine.clone(),
            da_client,
            FakeOriginSelector { candidate: fixed_candidate() },
            FakeAttrsBuilder,
            FakeSystemConfig { da_mode: true },
            7,
        );

        driver.start_building_block().await.unwrap();
        assert_eq!(driver.building_onto().map(|b| b.block_info.hash), Some(head_a.block_info.hash));

        engine.set_head(head_b);
        let result = driver.run_next_action().await.unwrap();

        assert!(result.is_none());
        assert_eq!(driver.building_onto().map(|b| b.block_info.hash), Some(head_b.block_info.hash));
        assert!(engine.start_calls.lock().unwrap().is_empty());
    }

    /// Critical DA violation: a "remaining headers" response containing a header at or past
    /// `window_end` is a DA-service contract violation: the driver must return a critical
    /// error and must not seal.
    #[tokio::test]
    async fn remaining_headers_past_window_end_is_critical() {
        let head = l2_block(10, 1, 100);
        let engine = Arc::new(FakeEngine::new(head));
        let mut driver = SequencerDriver::new(
            test_cfg(2),
            engine.clone(),
            ViolatingDaClient,
            FakeOriginSelector { candidate: fixed_candidate() },
            FakeAttrsBuilder,
            FakeSystemConfig { da_mode: true },
            7,
        );

        driver.start_building_block().await.unwrap();
        let err = driver.try_to_seal_batch().await.unwrap_err();

        assert!(err.is_critical());
        assert_eq!(driver.building_onto().map(|b| b.block_info.hash), Some(head.block_info.hash));
        assert!(engine.start_calls.lock().unwrap().is_empty());
    }
}
