use crate::collaborators::{Collaborators, InMemoryProtocol, PriceVector};
use crate::db::{Repository, StoredEvent};
use crate::domain::{Address, EngineEvent, TroveView};
use crate::engine::{
    AdjustTroveRequest, BorrowerOperations, ClaimReceipt, EngineError, OpenTroveRequest,
    OperationReceipt, SystemStatus,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct ProtocolState {
    protocol: InMemoryProtocol,
    next_seq: u64,
}

/// Receipts whose events get persisted after the call commits.
trait EmitsEvents {
    fn events(&self) -> &[EngineEvent];
}

impl EmitsEvents for OperationReceipt {
    fn events(&self) -> &[EngineEvent] {
        &self.events
    }
}

impl EmitsEvents for ClaimReceipt {
    fn events(&self) -> &[EngineEvent] {
        &self.events
    }
}

/// Single writer in front of the engine.
///
/// Every engine call holds the protocol lock for its whole duration, so calls never
/// interleave. Events are written to the store after the lock is released.
#[derive(Clone)]
pub struct Orchestrator {
    engine: BorrowerOperations,
    state: Arc<Mutex<ProtocolState>>,
    repo: Arc<Repository>,
}

impl Orchestrator {
    pub fn new(
        engine: BorrowerOperations,
        protocol: InMemoryProtocol,
        repo: Arc<Repository>,
        first_seq: u64,
    ) -> Self {
        Self {
            engine,
            state: Arc::new(Mutex::new(ProtocolState {
                protocol,
                next_seq: first_seq,
            })),
            repo,
        }
    }

    /// Like [`Orchestrator::new`], continuing the operation sequence found in the store.
    pub async fn resume(
        engine: BorrowerOperations,
        protocol: InMemoryProtocol,
        repo: Arc<Repository>,
    ) -> Result<Self, OrchestrationError> {
        let first_seq = repo.max_op_seq().await?.map_or(1, |seq| seq + 1);
        Ok(Self::new(engine, protocol, repo, first_seq))
    }

    pub fn engine(&self) -> &BorrowerOperations {
        &self.engine
    }

    pub async fn open_trove(
        &self,
        caller: &Address,
        req: &OpenTroveRequest,
    ) -> Result<OperationReceipt, OrchestrationError> {
        self.execute(|engine, c| engine.open_trove(c, caller, req))
            .await
    }

    pub async fn adjust_trove(
        &self,
        caller: &Address,
        req: &AdjustTroveRequest,
    ) -> Result<OperationReceipt, OrchestrationError> {
        self.execute(|engine, c| engine.adjust_trove(c, caller, req))
            .await
    }

    pub async fn close_trove(&self, caller: &Address) -> Result<OperationReceipt, OrchestrationError> {
        self.execute(|engine, c| engine.close_trove(c, caller)).await
    }

    pub async fn claim_collateral(
        &self,
        caller: &Address,
    ) -> Result<ClaimReceipt, OrchestrationError> {
        self.execute(|engine, c| engine.claim_collateral(c, caller))
            .await
    }

    pub async fn system_status(&self) -> Result<SystemStatus, OrchestrationError> {
        let mut state = self.state.lock().await;
        Ok(self.engine.system_status(&state.protocol.collaborators())?)
    }

    pub async fn trove_view(&self, owner: &Address) -> Result<TroveView, OrchestrationError> {
        let mut state = self.state.lock().await;
        Ok(self.engine.trove_view(&state.protocol.collaborators(), owner)?)
    }

    /// Replace the price vector the engine reads on its next call.
    pub async fn publish_prices(&self, prices: PriceVector) {
        self.with_protocol(|protocol| protocol.prices.set_prices(prices))
            .await;
    }

    /// Run `f` against the protocol state under the engine lock.
    pub async fn with_protocol<R>(&self, f: impl FnOnce(&mut InMemoryProtocol) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state.protocol)
    }

    pub async fn events(
        &self,
        owner: Option<&Address>,
        limit: i64,
    ) -> Result<Vec<StoredEvent>, OrchestrationError> {
        Ok(self.repo.query_events(owner, limit).await?)
    }

    async fn execute<R, F>(&self, op: F) -> Result<R, OrchestrationError>
    where
        R: EmitsEvents,
        F: FnOnce(&BorrowerOperations, &mut Collaborators<'_>) -> Result<R, EngineError>,
    {
        let (seq, receipt) = {
            let mut state = self.state.lock().await;
            let receipt = op(&self.engine, &mut state.protocol.collaborators())?;
            let seq = state.next_seq;
            state.next_seq += 1;
            (seq, receipt)
        };

        // The operation is committed; a storage failure must not turn it into an error.
        match self.repo.insert_events(seq, receipt.events()).await {
            Ok(stored) => debug!("Persisted {} event(s) for operation {}", stored, seq),
            Err(e) => warn!("Failed to persist events for operation {}: {}", seq, e),
        }
        Ok(receipt)
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Rejected(#[from] EngineError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
