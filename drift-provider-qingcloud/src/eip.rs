//! EIP lifecycle operations
//!
//! Create, read, update and delete of a single Elastic IP. Every operation
//! receives the remote client explicitly.

use std::collections::HashMap;

use drift_core::differ::changed_attributes;
use drift_core::provider::{ProviderError, ProviderResult};
use drift_core::resource::{Resource, ResourceId, State, Value};
use log::{debug, info, warn};

use crate::client::{AllocateEipsRequest, ClientError, EipClient};
use crate::model::BillingMode;
use crate::poller::TransitionPoller;
use crate::schemas::eip::eip_schema;

/// Attributes that can be changed in place
pub const UPDATABLE_ATTRIBUTES: [&str; 4] = ["name", "description", "bandwidth", "billing_mode"];

/// Validated EIP configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EipConfig {
    pub name: String,
    pub description: String,
    /// Mbps; the remote default applies when unset
    pub bandwidth: Option<u32>,
    pub billing_mode: BillingMode,
    pub need_icp: bool,
}

impl EipConfig {
    /// Validate a declared resource against the EIP schema and convert it
    pub fn from_resource(resource: &Resource) -> ProviderResult<Self> {
        Self::from_attributes(&resource.attributes)
            .map_err(|e| e.for_resource(resource.id.clone()))
    }

    pub fn from_attributes(attributes: &HashMap<String, Value>) -> ProviderResult<Self> {
        let schema = eip_schema();
        schema
            .validate(attributes)
            .map_err(|errors| ProviderError::from_type_errors(&errors))?;
        let attributes = schema.with_defaults(attributes);

        let string = |key: &str| {
            attributes
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };

        let bandwidth = match attributes.get("bandwidth").and_then(Value::as_int) {
            Some(n) => Some(u32::try_from(n).map_err(|_| {
                ProviderError::invalid_config(format!("Bandwidth {} is out of range", n))
            })?),
            None => None,
        };

        let billing_mode = string("billing_mode")
            .parse::<BillingMode>()
            .map_err(ProviderError::invalid_config)?;

        Ok(Self {
            name: string("name"),
            description: string("description"),
            bandwidth,
            billing_mode,
            need_icp: attributes.get("need_icp").and_then(Value::as_int) == Some(1),
        })
    }

    pub fn allocate_request(&self) -> AllocateEipsRequest {
        AllocateEipsRequest {
            count: 1,
            eip_name: Some(self.name.clone()),
            bandwidth: self.bandwidth,
            billing_mode: Some(self.billing_mode),
            need_icp: Some(self.need_icp as u8),
        }
    }

    /// Desired values in the shape they take in observed state
    pub fn to_attributes(&self) -> HashMap<String, Value> {
        let mut attributes = HashMap::new();
        attributes.insert("name".to_string(), Value::String(self.name.clone()));
        attributes.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        if let Some(bandwidth) = self.bandwidth {
            attributes.insert("bandwidth".to_string(), Value::Int(bandwidth as i64));
        }
        attributes.insert(
            "billing_mode".to_string(),
            Value::String(self.billing_mode.as_str().to_string()),
        );
        attributes.insert("need_icp".to_string(), Value::Int(self.need_icp as i64));
        attributes
    }
}

/// Allocate an EIP, apply its description and read it back once stable
///
/// Errors after the allocation carry the new identifier.
pub async fn create(
    client: &dyn EipClient,
    poller: &TransitionPoller,
    resource: &Resource,
) -> ProviderResult<State> {
    let config = EipConfig::from_resource(resource)?;

    let eip_ids = client
        .allocate(config.allocate_request())
        .await
        .map_err(|e| {
            ProviderError::allocation_failed("Failed to allocate eip")
                .for_resource(resource.id.clone())
                .with_cause(e)
        })?;
    let eip_id = eip_ids.into_iter().next().ok_or_else(|| {
        ProviderError::allocation_failed("AllocateEips returned no eip")
            .for_resource(resource.id.clone())
    })?;
    info!("allocated {} for {}", eip_id, resource.id);

    // AllocateEips has no description parameter
    if !config.description.is_empty() {
        client
            .modify_attributes(&eip_id, None, Some(&config.description))
            .await
            .map_err(|e| {
                ProviderError::remote_unavailable("Failed to set eip description")
                    .for_resource(resource.id.clone())
                    .with_identifier(&eip_id)
                    .with_cause(e)
            })?;
    }

    read(client, poller, &resource.id, &eip_id).await
}

/// Wait for the EIP to settle and map its description to state
pub async fn read(
    client: &dyn EipClient,
    poller: &TransitionPoller,
    id: &ResourceId,
    eip_id: &str,
) -> ProviderResult<State> {
    let eip = poller
        .wait_for_stable_state(client, eip_id)
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

    if eip.status.is_gone() {
        return Err(ProviderError::not_found(format!("Eip is {}", eip.status))
            .for_resource(id.clone())
            .with_identifier(eip_id));
    }

    Ok(State::existing(id.clone(), eip.to_attributes()).with_identifier(eip_id))
}

/// Apply changes of the updatable attributes, then re-read
///
/// Returns `from` untouched, without calling the remote service, when none
/// of them changed.
pub async fn update(
    client: &dyn EipClient,
    poller: &TransitionPoller,
    id: &ResourceId,
    eip_id: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let config = EipConfig::from_resource(to)?;
    let changed = changed_attributes(&config.to_attributes(), &from.attributes);
    let has_change = |name: &str| changed.iter().any(|c| c == name);

    if has_change("need_icp") {
        warn!(
            "{}: need_icp cannot be changed in place, ignoring the change",
            id
        );
    }
    if !UPDATABLE_ATTRIBUTES.iter().any(|&name| has_change(name)) {
        debug!("{}: no updatable attribute changed", id);
        return Ok(from.clone());
    }

    let remote_error = |message: &str, e: ClientError| {
        ProviderError::remote_unavailable(message)
            .for_resource(id.clone())
            .with_identifier(eip_id)
            .with_cause(e)
    };
    let eip_ids = [eip_id.to_string()];

    if has_change("bandwidth")
        && let Some(bandwidth) = config.bandwidth
    {
        client
            .change_bandwidth(&eip_ids, bandwidth)
            .await
            .map_err(|e| remote_error("Failed to change eip bandwidth", e))?;
    }

    if has_change("billing_mode") {
        client
            .change_billing_mode(&eip_ids, config.billing_mode)
            .await
            .map_err(|e| remote_error("Failed to change eip billing mode", e))?;
    }

    let name = has_change("name").then_some(config.name.as_str());
    let description = has_change("description").then_some(config.description.as_str());
    if name.is_some() || description.is_some() {
        client
            .modify_attributes(eip_id, name, description)
            .await
            .map_err(|e| remote_error("Failed to modify eip attributes", e))?;
    }

    read(client, poller, id, eip_id).await
}

/// Release the EIP. The caller drops the identifier afterwards.
pub async fn delete(client: &dyn EipClient, id: &ResourceId, eip_id: &str) -> ProviderResult<()> {
    if eip_id.is_empty() {
        return Err(
            ProviderError::invalid_config("Cannot release an eip without an identifier")
                .for_resource(id.clone()),
        );
    }

    client
        .release(&[eip_id.to_string()])
        .await
        .map_err(|e| {
            ProviderError::remote_unavailable("Failed to release eip")
                .for_resource(id.clone())
                .with_identifier(eip_id)
                .with_cause(e)
        })?;
    info!("released {} ({})", eip_id, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use drift_core::differ::{Diff, diff};
    use drift_core::provider::ErrorKind;

    use crate::client::ClientResult;
    use crate::config::PollConfig;
    use crate::memory::{DEFAULT_BANDWIDTH, InMemoryEipClient, Operation};
    use crate::model::{EipDescription, TransitionStatus};

    fn poller() -> TransitionPoller {
        TransitionPoller::new(PollConfig::fixed(Duration::from_millis(500), 10))
    }

    fn web_eip() -> Resource {
        Resource::new("eip", "web")
            .with_attribute("name", "web")
            .with_attribute("description", "frontend address")
            .with_attribute("bandwidth", 5_i64)
            .with_attribute("billing_mode", "traffic")
            .with_attribute("need_icp", 0_i64)
    }

    #[test]
    fn config_applies_defaults() {
        let resource = Resource::new("eip", "web")
            .with_attribute("name", "web")
            .with_attribute("description", "");
        let config = EipConfig::from_resource(&resource).unwrap();

        assert_eq!(
            config,
            EipConfig {
                name: "web".to_string(),
                description: String::new(),
                bandwidth: None,
                billing_mode: BillingMode::Traffic,
                need_icp: false,
            }
        );
        assert_eq!(config.allocate_request().need_icp, Some(0));
    }

    #[test]
    fn config_rejects_out_of_range_bandwidth() {
        let resource = web_eip().with_attribute("bandwidth", i64::from(u32::MAX) + 1);
        let err = EipConfig::from_resource(&resource).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfig);
    }

    #[tokio::test(start_paused = true)]
    async fn create_waits_for_association() {
        let client = InMemoryEipClient::new();

        let state = create(&client, &poller(), &web_eip()).await.unwrap();

        assert!(state.exists);
        let eip_id = state.identifier.clone().unwrap();
        assert_eq!(state.get("id"), Some(&Value::String(eip_id)));
        assert!(matches!(state.get("addr"), Some(Value::String(addr)) if !addr.is_empty()));
        assert_eq!(state.get("status"), Some(&Value::String("active".to_string())));
        assert_eq!(
            state.get("transition_status"),
            Some(&Value::String("none".to_string()))
        );
        assert_eq!(client.calls(Operation::Allocate).await, 1);
        assert_eq!(client.calls(Operation::ModifyAttributes).await, 1);
        assert_eq!(client.calls(Operation::Describe).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn create_then_read_round_trips() {
        let client = InMemoryEipClient::new();
        let resource = web_eip().with_attribute("billing_mode", "bandwidth");

        let created = create(&client, &poller(), &resource).await.unwrap();
        let eip_id = created.identifier.clone().unwrap();
        let state = read(&client, &poller(), &resource.id, &eip_id)
            .await
            .unwrap();

        assert_eq!(diff(&resource, &state), Diff::NoChange(resource.id.clone()));
        assert_eq!(state, created);
    }

    #[tokio::test(start_paused = true)]
    async fn round_trip_with_icp_and_remote_bandwidth() {
        let client = InMemoryEipClient::new();
        let resource = Resource::new("eip", "filed")
            .with_attribute("name", "filed")
            .with_attribute("description", "icp filed address")
            .with_attribute("need_icp", 1_i64);

        let created = create(&client, &poller(), &resource).await.unwrap();
        let eip_id = created.identifier.clone().unwrap();
        let state = read(&client, &poller(), &resource.id, &eip_id)
            .await
            .unwrap();

        assert_eq!(state.get("need_icp"), Some(&Value::Int(1)));
        assert_eq!(
            state.get("bandwidth"),
            Some(&Value::Int(i64::from(DEFAULT_BANDWIDTH)))
        );
        assert_eq!(client.get(&eip_id).await.unwrap().need_icp, 1);
        assert_eq!(diff(&resource, &state), Diff::NoChange(resource.id.clone()));
    }

    #[tokio::test(start_paused = true)]
    async fn create_without_description_skips_modify() {
        let client = InMemoryEipClient::new();
        let resource = web_eip().with_attribute("description", "");

        create(&client, &poller(), &resource).await.unwrap();

        assert_eq!(client.calls(Operation::ModifyAttributes).await, 0);
    }

    #[tokio::test]
    async fn create_rejects_invalid_config_before_allocating() {
        let client = InMemoryEipClient::new();
        let resource = Resource::new("eip", "web")
            .with_attribute("description", "")
            .with_attribute("addr", "1.2.3.4");

        let err = create(&client, &poller(), &resource).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidConfig);
        assert!(err.message.contains("'name'"));
        assert!(err.message.contains("'addr'"));
        assert_eq!(client.total_calls().await, 0);
    }

    #[tokio::test]
    async fn allocate_error_is_allocation_failed() {
        let client = InMemoryEipClient::new();
        client
            .fail_call(
                Operation::Allocate,
                1,
                ClientError::Api {
                    ret_code: 2500,
                    message: "QuotaExceeded".to_string(),
                },
            )
            .await;

        let err = create(&client, &poller(), &web_eip()).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::AllocationFailed);
        assert!(err.identifier.is_none());
        assert!(err.to_string().starts_with("[eip.web] Failed to allocate eip"));
    }

    struct NothingAllocated;

    #[async_trait]
    impl EipClient for NothingAllocated {
        async fn allocate(&self, _request: AllocateEipsRequest) -> ClientResult<Vec<String>> {
            Ok(vec![])
        }

        async fn describe(
            &self,
            _eip_ids: &[String],
            _verbose: bool,
        ) -> ClientResult<Vec<EipDescription>> {
            Ok(vec![])
        }

        async fn modify_attributes(
            &self,
            _eip_id: &str,
            _eip_name: Option<&str>,
            _description: Option<&str>,
        ) -> ClientResult<()> {
            Ok(())
        }

        async fn change_bandwidth(&self, _eip_ids: &[String], _bandwidth: u32) -> ClientResult<()> {
            Ok(())
        }

        async fn change_billing_mode(
            &self,
            _eip_ids: &[String],
            _billing_mode: BillingMode,
        ) -> ClientResult<()> {
            Ok(())
        }

        async fn release(&self, _eip_ids: &[String]) -> ClientResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_allocation_is_allocation_failed() {
        let err = create(&NothingAllocated, &poller(), &web_eip())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AllocationFailed);
    }

    #[tokio::test]
    async fn failure_after_allocation_keeps_identifier() {
        let client = InMemoryEipClient::new();
        client
            .fail_call(
                Operation::ModifyAttributes,
                1,
                ClientError::Transport("broken pipe".to_string()),
            )
            .await;

        let err = create(&client, &poller(), &web_eip()).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::RemoteUnavailable);
        assert_eq!(err.identifier.as_deref(), Some("eip-00000001"));
        assert!(client.get("eip-00000001").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn read_after_delete_is_not_found() {
        let client = InMemoryEipClient::new();
        let resource = web_eip();
        let state = create(&client, &poller(), &resource).await.unwrap();
        let eip_id = state.identifier.unwrap();

        delete(&client, &resource.id, &eip_id).await.unwrap();
        let err = read(&client, &poller(), &resource.id, &eip_id)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.message.contains("released"));
    }

    #[tokio::test(start_paused = true)]
    async fn read_of_purged_eip_is_not_found() {
        let client = InMemoryEipClient::new();
        let resource = web_eip();
        let state = create(&client, &poller(), &resource).await.unwrap();
        let eip_id = state.identifier.unwrap();
        client.remove(&eip_id).await;

        let err = read(&client, &poller(), &resource.id, &eip_id)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.resource_id, Some(resource.id));
    }

    #[tokio::test(start_paused = true)]
    async fn read_waits_for_release_transition() {
        let client = InMemoryEipClient::new();
        let resource = web_eip();
        let state = create(&client, &poller(), &resource).await.unwrap();
        let eip_id = state.identifier.unwrap();
        client
            .set_transitions(&eip_id, vec![TransitionStatus::Dissociating; 2])
            .await;
        let before = client.calls(Operation::Describe).await;

        read(&client, &poller(), &resource.id, &eip_id)
            .await
            .unwrap();

        assert_eq!(client.calls(Operation::Describe).await - before, 3);
    }

    async fn created(client: &InMemoryEipClient) -> (Resource, State) {
        let resource = web_eip();
        let state = create(client, &poller(), &resource).await.unwrap();
        (resource, state)
    }

    #[tokio::test(start_paused = true)]
    async fn update_without_changes_makes_no_calls() {
        let client = InMemoryEipClient::new();
        let (resource, state) = created(&client).await;
        let before = client.total_calls().await;

        let eip_id = state.identifier.clone().unwrap();
        let updated = update(&client, &poller(), &resource.id, &eip_id, &state, &resource)
            .await
            .unwrap();

        assert_eq!(updated, state);
        assert_eq!(client.total_calls().await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn update_ignores_need_icp() {
        let client = InMemoryEipClient::new();
        let (resource, state) = created(&client).await;
        let before = client.total_calls().await;

        let to = resource.clone().with_attribute("need_icp", 1_i64);
        let eip_id = state.identifier.clone().unwrap();
        update(&client, &poller(), &resource.id, &eip_id, &state, &to)
            .await
            .unwrap();

        assert_eq!(client.total_calls().await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn update_bandwidth_only() {
        let client = InMemoryEipClient::new();
        let (resource, state) = created(&client).await;

        let to = resource.clone().with_attribute("bandwidth", 20_i64);
        let eip_id = state.identifier.clone().unwrap();
        let updated = update(&client, &poller(), &resource.id, &eip_id, &state, &to)
            .await
            .unwrap();

        assert_eq!(updated.get("bandwidth"), Some(&Value::Int(20)));
        assert_eq!(client.calls(Operation::ChangeBandwidth).await, 1);
        assert_eq!(client.calls(Operation::ChangeBillingMode).await, 0);
        // only the description set during create
        assert_eq!(client.calls(Operation::ModifyAttributes).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn update_billing_mode_and_name() {
        let client = InMemoryEipClient::new();
        let (resource, state) = created(&client).await;

        let to = resource
            .clone()
            .with_attribute("billing_mode", "bandwidth")
            .with_attribute("name", "web-2");
        let eip_id = state.identifier.clone().unwrap();
        let updated = update(&client, &poller(), &resource.id, &eip_id, &state, &to)
            .await
            .unwrap();

        assert_eq!(diff(&to, &updated), Diff::NoChange(to.id.clone()));
        assert_eq!(client.calls(Operation::ChangeBillingMode).await, 1);
        assert_eq!(client.calls(Operation::ChangeBandwidth).await, 0);
        assert_eq!(client.calls(Operation::ModifyAttributes).await, 2);

        let stored = client.get(&eip_id).await.unwrap();
        assert_eq!(stored.eip_name, "web-2");
        assert_eq!(stored.description.as_deref(), Some("frontend address"));
    }

    #[tokio::test(start_paused = true)]
    async fn update_surfaces_remote_errors() {
        let client = InMemoryEipClient::new();
        let (resource, state) = created(&client).await;
        client
            .fail_call(
                Operation::ChangeBandwidth,
                1,
                ClientError::Transport("timed out".to_string()),
            )
            .await;

        let to = resource.clone().with_attribute("bandwidth", 10_i64);
        let eip_id = state.identifier.clone().unwrap();
        let err = update(&client, &poller(), &resource.id, &eip_id, &state, &to)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::RemoteUnavailable);
        assert!(err.message.contains("bandwidth"));
        assert_eq!(client.calls(Operation::ModifyAttributes).await, 1);
    }

    #[tokio::test]
    async fn update_rejects_invalid_target() {
        let client = InMemoryEipClient::new();
        let from = State::existing(ResourceId::new("eip", "web"), HashMap::new());
        let to = web_eip().with_attribute("billing_mode", "monthly");

        let err = update(&client, &poller(), &to.id, "eip-00000001", &from, &to)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidConfig);
        assert_eq!(client.total_calls().await, 0);
    }

    #[tokio::test]
    async fn delete_surfaces_release_errors() {
        let client = InMemoryEipClient::new();
        let id = ResourceId::new("eip", "web");

        let err = delete(&client, &id, "eip-unknown").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::RemoteUnavailable);
        assert!(err.to_string().contains("2100"));

        let err = delete(&client, &id, "").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfig);
    }
}
