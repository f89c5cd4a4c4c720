//! Provider - Trait abstracting resource operations
//!
//! A Provider maps the lifecycle of a declared resource (create, read,
//! update, delete) onto calls against a specific cloud's remote API.

use std::future::Future;
use std::pin::Pin;

use crate::resource::{Resource, ResourceId, State};
use crate::schema::{ResourceSchema, TypeError};

/// Category of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Desired configuration failed validation before any remote call
    InvalidConfig,
    /// The remote service did not hand back a new resource
    AllocationFailed,
    /// A remote call returned an error
    RemoteUnavailable,
    /// The remote service has no such resource
    NotFound,
    /// A wait budget was exhausted
    Timeout,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidConfig => "invalid config",
            ErrorKind::AllocationFailed => "allocation failed",
            ErrorKind::RemoteUnavailable => "remote unavailable",
            ErrorKind::NotFound => "not found",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    /// Remote identifier, when the failure happened after one was assigned
    pub identifier: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.resource_id, &self.identifier) {
            (Some(id), Some(identifier)) => write!(f, "[{} ({})] ", id, identifier)?,
            (Some(id), None) => write!(f, "[{}] ", id)?,
            (None, Some(identifier)) => write!(f, "[{}] ", identifier)?,
            (None, None) => {}
        }
        write!(f, "{}", self.message)?;
        if let Some(ref cause) = self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_id: None,
            identifier: None,
            cause: None,
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig, message)
    }

    pub fn allocation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AllocationFailed, message)
    }

    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteUnavailable, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Build an InvalidConfig error from schema validation failures
    pub fn from_type_errors(errors: &[TypeError]) -> Self {
        let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        Self::invalid_config(details.join("; "))
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "eip")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// Each cloud provider implements this trait. All operations are async
/// and involve side effects against the remote API.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "qingcloud")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// Returns `State::not_found()` if there is no identifier yet or the
    /// remote service no longer knows the resource.
    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the remote ID (e.g., eip-xxx)
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    ///
    /// `from` is the last observed state, `to` the desired configuration.
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, from, to)
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    // Mock Provider for testing
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![]
        }

        fn read(
            &self,
            id: &ResourceId,
            _identifier: Option<&str>,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            Box::pin(async move { Ok(State::not_found(id)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            let attrs = resource.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs).with_identifier("mock-id-123")) })
        }

        fn update(
            &self,
            id: &ResourceId,
            _identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            let attrs = to.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs)) })
        }

        fn delete(&self, id: &ResourceId, _identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
            let id = id.clone();
            Box::pin(async move {
                Err(ProviderError::remote_unavailable("delete refused").for_resource(id))
            })
        }
    }

    #[tokio::test]
    async fn boxed_provider_dispatches() {
        let provider: Box<dyn Provider> = Box::new(MockProvider);
        assert_eq!(provider.name(), "mock");

        let id = ResourceId::new("test", "example");
        let state = provider.read(&id, None).await.unwrap();
        assert!(!state.exists);

        let resource = Resource::new("test", "example");
        let state = provider.create(&resource).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier, Some("mock-id-123".to_string()));

        let err = provider.delete(&id, "mock-id-123").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::RemoteUnavailable);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct Transport;

    #[test]
    fn error_display_includes_context() {
        let err = ProviderError::remote_unavailable("Failed to describe eip")
            .for_resource(ResourceId::new("eip", "web"))
            .with_identifier("eip-abc")
            .with_cause(Transport);

        assert_eq!(
            err.to_string(),
            "[eip.web (eip-abc)] Failed to describe eip: connection reset"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn error_display_without_context() {
        let err = ProviderError::timeout("Timed out");
        assert_eq!(err.to_string(), "Timed out");
        assert!(err.source().is_none());
        assert!(!err.is_not_found());
    }

    #[test]
    fn type_errors_are_joined() {
        let err = ProviderError::from_type_errors(&[
            TypeError::MissingRequired {
                name: "name".to_string(),
            },
            TypeError::ComputedAttribute {
                name: "addr".to_string(),
            },
        ]);
        assert_eq!(err.kind, ErrorKind::InvalidConfig);
        assert_eq!(
            err.message,
            "Required attribute 'name' is missing; Attribute 'addr' is computed and cannot be set"
        );
    }
}
