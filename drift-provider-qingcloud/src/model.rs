//! QingCloud EIP data model
//!
//! Field names follow the `eip_set` entries returned by DescribeEips so
//! that a wire client can deserialize responses directly.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use drift_core::resource::Value;
use serde::{Deserialize, Serialize};

/// EIP billing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingMode {
    /// Billed by traffic consumed
    #[default]
    Traffic,
    /// Billed by reserved bandwidth
    Bandwidth,
}

impl BillingMode {
    pub const VALUES: [&'static str; 2] = ["traffic", "bandwidth"];

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingMode::Traffic => "traffic",
            BillingMode::Bandwidth => "bandwidth",
        }
    }
}

impl fmt::Display for BillingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "traffic" => Ok(BillingMode::Traffic),
            "bandwidth" => Ok(BillingMode::Bandwidth),
            other => Err(format!(
                "Invalid billing mode '{}', expected one of: {}",
                other,
                Self::VALUES.join(", ")
            )),
        }
    }
}

/// EIP status as reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EipStatus {
    Pending,
    Available,
    Associated,
    Active,
    Suspended,
    Released,
    Ceased,
    Other(String),
}

impl EipStatus {
    pub fn as_str(&self) -> &str {
        match self {
            EipStatus::Pending => "pending",
            EipStatus::Available => "available",
            EipStatus::Associated => "associated",
            EipStatus::Active => "active",
            EipStatus::Suspended => "suspended",
            EipStatus::Released => "released",
            EipStatus::Ceased => "ceased",
            EipStatus::Other(s) => s,
        }
    }

    /// Released and ceased addresses stay visible to DescribeEips for a while
    pub fn is_gone(&self) -> bool {
        matches!(self, EipStatus::Released | EipStatus::Ceased)
    }
}

impl From<String> for EipStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => EipStatus::Pending,
            "available" => EipStatus::Available,
            "associated" => EipStatus::Associated,
            "active" => EipStatus::Active,
            "suspended" => EipStatus::Suspended,
            "released" => EipStatus::Released,
            "ceased" => EipStatus::Ceased,
            _ => EipStatus::Other(s),
        }
    }
}

impl From<EipStatus> for String {
    fn from(status: EipStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for EipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-flight operation on an EIP
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransitionStatus {
    /// No operation in progress. The API reports this as an empty string.
    #[default]
    None,
    Associating,
    Dissociating,
    Suspending,
    Resuming,
    Releasing,
    Other(String),
}

impl TransitionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TransitionStatus::None => "none",
            TransitionStatus::Associating => "associating",
            TransitionStatus::Dissociating => "dissociating",
            TransitionStatus::Suspending => "suspending",
            TransitionStatus::Resuming => "resuming",
            TransitionStatus::Releasing => "releasing",
            TransitionStatus::Other(s) => s,
        }
    }

    pub fn is_stable(&self) -> bool {
        *self == TransitionStatus::None
    }
}

impl From<String> for TransitionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | "none" => TransitionStatus::None,
            "associating" => TransitionStatus::Associating,
            "dissociating" => TransitionStatus::Dissociating,
            "suspending" => TransitionStatus::Suspending,
            "resuming" => TransitionStatus::Resuming,
            "releasing" => TransitionStatus::Releasing,
            _ => TransitionStatus::Other(s),
        }
    }
}

impl From<TransitionStatus> for String {
    fn from(status: TransitionStatus) -> Self {
        match status {
            TransitionStatus::None => String::new(),
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for TransitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resource currently using an EIP (an instance, load balancer, ...)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachedResource {
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type: String,
}

impl AttachedResource {
    pub fn to_map(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert(
            "resource_id".to_string(),
            Value::String(self.resource_id.clone()),
        );
        map.insert(
            "resource_name".to_string(),
            Value::String(self.resource_name.clone()),
        );
        map.insert(
            "resource_type".to_string(),
            Value::String(self.resource_type.clone()),
        );
        map
    }
}

/// One entry of a DescribeEips response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EipDescription {
    pub eip_id: String,
    #[serde(default)]
    pub eip_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub eip_addr: String,
    pub bandwidth: u32,
    pub billing_mode: BillingMode,
    #[serde(default)]
    pub need_icp: u8,
    pub status: EipStatus,
    #[serde(default)]
    pub transition_status: TransitionStatus,
    #[serde(default)]
    pub resource: Option<AttachedResource>,
}

impl EipDescription {
    /// Attributes as exposed in resource state
    pub fn to_attributes(&self) -> HashMap<String, Value> {
        let mut attributes = HashMap::new();
        attributes.insert("id".to_string(), Value::String(self.eip_id.clone()));
        attributes.insert("name".to_string(), Value::String(self.eip_name.clone()));
        attributes.insert(
            "description".to_string(),
            Value::String(self.description.clone().unwrap_or_default()),
        );
        attributes.insert("bandwidth".to_string(), Value::Int(self.bandwidth as i64));
        attributes.insert(
            "billing_mode".to_string(),
            Value::String(self.billing_mode.as_str().to_string()),
        );
        attributes.insert("need_icp".to_string(), Value::Int(self.need_icp as i64));
        attributes.insert("addr".to_string(), Value::String(self.eip_addr.clone()));
        attributes.insert(
            "status".to_string(),
            Value::String(self.status.as_str().to_string()),
        );
        attributes.insert(
            "transition_status".to_string(),
            Value::String(self.transition_status.as_str().to_string()),
        );
        let resource = self
            .resource
            .as_ref()
            .map(AttachedResource::to_map)
            .unwrap_or_default();
        attributes.insert("resource".to_string(), Value::Map(resource));
        attributes
    }
}

/// DescribeEips response body
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DescribeEipsResponse {
    #[serde(default)]
    pub eip_set: Vec<EipDescription>,
    #[serde(default)]
    pub total_count: u32,
    pub ret_code: i32,
    #[serde(default)]
    pub message: Option<String>,
}
