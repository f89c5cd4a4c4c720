//! QingCloud Provider implementation
//!
//! Routes the generic provider operations to the EIP lifecycle functions,
//! handing them the injected client.

use std::sync::Arc;

use drift_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use drift_core::resource::{Resource, ResourceId, State};
use drift_core::schema::ResourceSchema;
use log::debug;

use crate::client::EipClient;
use crate::config::{ConfigError, ProviderConfig};
use crate::eip;
use crate::poller::TransitionPoller;
use crate::schemas::eip::{RESOURCE_TYPE, eip_schema};

/// Elastic IP resource type
pub struct EipType;

impl ResourceType for EipType {
    fn name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        eip_schema()
    }
}

/// QingCloud Provider
pub struct QingcloudProvider {
    client: Arc<dyn EipClient>,
    poller: TransitionPoller,
    zone: Option<String>,
}

impl QingcloudProvider {
    /// Create a provider around an API client
    pub fn new(client: Arc<dyn EipClient>, config: ProviderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            "qingcloud provider for zone {}",
            config.zone.as_deref().unwrap_or("<client default>")
        );
        Ok(Self {
            client,
            poller: TransitionPoller::new(config.poll),
            zone: config.zone,
        })
    }

    /// Zone the injected client is expected to target
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    fn check_type(id: &ResourceId) -> ProviderResult<()> {
        if id.resource_type == RESOURCE_TYPE {
            Ok(())
        } else {
            Err(ProviderError::invalid_config(format!(
                "Unknown resource type: {}",
                id.resource_type
            ))
            .for_resource(id.clone()))
        }
    }
}

impl Provider for QingcloudProvider {
    fn name(&self) -> &'static str {
        "qingcloud"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        vec![Box::new(EipType)]
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(String::from);
        Box::pin(async move {
            Self::check_type(&id)?;
            let Some(identifier) = identifier else {
                return Ok(State::not_found(id));
            };
            let result = eip::read(self.client.as_ref(), &self.poller, &id, &identifier).await;
            match result {
                Err(e) if e.is_not_found() => Ok(State::not_found(id)),
                result => result,
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            Self::check_type(&resource.id)?;
            eip::create(self.client.as_ref(), &self.poller, &resource).await
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            Self::check_type(&id)?;
            eip::update(
                self.client.as_ref(),
                &self.poller,
                &id,
                &identifier,
                &from,
                &to,
            )
            .await
        })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            Self::check_type(&id)?;
            eip::delete(self.client.as_ref(), &id, &identifier).await
        })
    }
}
