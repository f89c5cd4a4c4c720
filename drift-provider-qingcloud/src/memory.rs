//! In-memory EIP service
//!
//! A deterministic stand-in for the QingCloud EIP API. Each EIP carries a
//! queue of transition statuses: every describe reports the head of the
//! queue and pops it, and once the queue is empty the EIP reports no
//! transition and its settled status.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::client::{AllocateEipsRequest, ClientError, ClientResult, EipClient};
use crate::model::{BillingMode, EipDescription, EipStatus, TransitionStatus};

/// ret_code QingCloud uses for missing resources
pub const RESOURCE_NOT_FOUND: i32 = 2100;

/// Bandwidth assigned when AllocateEips omits it, in Mbps
pub const DEFAULT_BANDWIDTH: u32 = 1;

/// Client operations, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Allocate,
    Describe,
    ModifyAttributes,
    ChangeBandwidth,
    ChangeBillingMode,
    Release,
}

#[derive(Debug)]
struct StoredEip {
    description: EipDescription,
    transitions: VecDeque<TransitionStatus>,
    settled_status: EipStatus,
}

impl StoredEip {
    fn observe(&mut self) -> EipDescription {
        let mut description = self.description.clone();
        match self.transitions.pop_front() {
            Some(transition) => {
                description.transition_status = transition;
            }
            None => {
                if !self.description.status.is_gone() {
                    self.description.status = self.settled_status.clone();
                }
                description.status = self.description.status.clone();
                description.transition_status = TransitionStatus::None;
            }
        }
        description
    }
}

#[derive(Debug, Default)]
struct Inner {
    eips: BTreeMap<String, StoredEip>,
    next_id: u32,
    calls: HashMap<Operation, usize>,
    failures: HashMap<(Operation, usize), ClientError>,
}

impl Inner {
    /// Count the call and return the injected failure for it, if any
    fn record(&mut self, operation: Operation) -> ClientResult<()> {
        let count = self.calls.entry(operation).or_insert(0);
        *count += 1;
        match self.failures.remove(&(operation, *count)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn live_mut(&mut self, eip_id: &str) -> ClientResult<&mut StoredEip> {
        match self.eips.get_mut(eip_id) {
            Some(eip) if !eip.description.status.is_gone() => Ok(eip),
            _ => Err(not_found(eip_id)),
        }
    }
}

fn not_found(eip_id: &str) -> ClientError {
    ClientError::Api {
        ret_code: RESOURCE_NOT_FOUND,
        message: format!("ResourceNotFound, resource [{}] not found", eip_id),
    }
}

/// In-memory implementation of [`EipClient`]
#[derive(Debug)]
pub struct InMemoryEipClient {
    inner: Mutex<Inner>,
    allocation_transitions: Vec<TransitionStatus>,
    settled_status: EipStatus,
}

impl Default for InMemoryEipClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEipClient {
    /// New EIPs report `associating` once, then settle as `active`
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            allocation_transitions: vec![TransitionStatus::Associating],
            settled_status: EipStatus::Active,
        }
    }

    /// Transition statuses every newly allocated EIP reports before settling
    pub fn with_allocation_transitions(mut self, transitions: Vec<TransitionStatus>) -> Self {
        self.allocation_transitions = transitions;
        self
    }

    /// Status EIPs report once their transitions are drained
    pub fn with_settled_status(mut self, status: EipStatus) -> Self {
        self.settled_status = status;
        self
    }

    /// Replace the pending transition statuses of an EIP
    pub async fn set_transitions(&self, eip_id: &str, transitions: Vec<TransitionStatus>) {
        let mut inner = self.inner.lock().await;
        if let Some(eip) = inner.eips.get_mut(eip_id) {
            eip.transitions = transitions.into();
        }
    }

    /// Make the `call`-th invocation (1-based, counted since creation) of `operation` fail
    pub async fn fail_call(&self, operation: Operation, call: usize, error: ClientError) {
        let mut inner = self.inner.lock().await;
        inner.failures.insert((operation, call), error);
    }

    /// Drop an EIP entirely, as if it was deleted behind the provider's back
    pub async fn remove(&self, eip_id: &str) {
        self.inner.lock().await.eips.remove(eip_id);
    }

    /// Current stored record, without advancing transitions
    pub async fn get(&self, eip_id: &str) -> Option<EipDescription> {
        let inner = self.inner.lock().await;
        inner.eips.get(eip_id).map(|eip| eip.description.clone())
    }

    pub async fn calls(&self, operation: Operation) -> usize {
        let inner = self.inner.lock().await;
        inner.calls.get(&operation).copied().unwrap_or(0)
    }

    pub async fn total_calls(&self) -> usize {
        self.inner.lock().await.calls.values().sum()
    }
}

#[async_trait]
impl EipClient for InMemoryEipClient {
    async fn allocate(&self, request: AllocateEipsRequest) -> ClientResult<Vec<String>> {
        let mut inner = self.inner.lock().await;
        inner.record(Operation::Allocate)?;

        let mut ids = Vec::new();
        for _ in 0..request.count {
            inner.next_id += 1;
            let n = inner.next_id;
            let eip_id = format!("eip-{:08x}", n);
            let description = EipDescription {
                eip_id: eip_id.clone(),
                eip_name: request.eip_name.clone().unwrap_or_default(),
                description: None,
                eip_addr: format!("139.198.{}.{}", n / 256, n % 256),
                bandwidth: request.bandwidth.unwrap_or(DEFAULT_BANDWIDTH),
                billing_mode: request.billing_mode.unwrap_or_default(),
                need_icp: request.need_icp.unwrap_or(0),
                status: EipStatus::Pending,
                transition_status: TransitionStatus::None,
                resource: None,
            };
            inner.eips.insert(
                eip_id.clone(),
                StoredEip {
                    description,
                    transitions: self.allocation_transitions.iter().cloned().collect(),
                    settled_status: self.settled_status.clone(),
                },
            );
            ids.push(eip_id);
        }
        Ok(ids)
    }

    async fn describe(
        &self,
        eip_ids: &[String],
        _verbose: bool,
    ) -> ClientResult<Vec<EipDescription>> {
        let mut inner = self.inner.lock().await;
        inner.record(Operation::Describe)?;

        Ok(eip_ids
            .iter()
            .filter_map(|id| inner.eips.get_mut(id).map(StoredEip::observe))
            .collect())
    }

    async fn modify_attributes(
        &self,
        eip_id: &str,
        eip_name: Option<&str>,
        description: Option<&str>,
    ) -> ClientResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record(Operation::ModifyAttributes)?;

        let eip = inner.live_mut(eip_id)?;
        if let Some(name) = eip_name {
            eip.description.eip_name = name.to_string();
        }
        if let Some(description) = description {
            eip.description.description = Some(description.to_string());
        }
        Ok(())
    }

    async fn change_bandwidth(&self, eip_ids: &[String], bandwidth: u32) -> ClientResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record(Operation::ChangeBandwidth)?;

        for eip_id in eip_ids {
            inner.live_mut(eip_id)?.description.bandwidth = bandwidth;
        }
        Ok(())
    }

    async fn change_billing_mode(
        &self,
        eip_ids: &[String],
        billing_mode: BillingMode,
    ) -> ClientResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record(Operation::ChangeBillingMode)?;

        for eip_id in eip_ids {
            inner.live_mut(eip_id)?.description.billing_mode = billing_mode;
        }
        Ok(())
    }

    async fn release(&self, eip_ids: &[String]) -> ClientResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record(Operation::Release)?;

        for eip_id in eip_ids {
            let eip = inner.live_mut(eip_id)?;
            eip.description.status = EipStatus::Released;
            eip.description.resource = None;
            eip.transitions.clear();
        }
        Ok(())
    }
}
