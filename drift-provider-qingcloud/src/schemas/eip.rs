//! EIP resource schema definitions

use drift_core::resource::Value;
use drift_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::model::BillingMode;

pub const RESOURCE_TYPE: &str = "eip";

/// Billing mode enum type
pub fn billing_mode() -> AttributeType {
    AttributeType::Enum(BillingMode::VALUES.iter().map(|v| v.to_string()).collect())
}

/// Returns the schema for an Elastic IP
pub fn eip_schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .attribute(AttributeSchema::new("name", AttributeType::String).required())
        .attribute(AttributeSchema::new("description", AttributeType::String).required())
        // Mbps
        .attribute(AttributeSchema::new("bandwidth", types::positive_int()))
        .attribute(
            AttributeSchema::new("billing_mode", billing_mode())
                .with_default(Value::String(BillingMode::Traffic.as_str().to_string())),
        )
        // ICP filing: 1 needed, 0 not needed
        .attribute(AttributeSchema::new("need_icp", types::int_flag()).with_default(Value::Int(0)))
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("addr", AttributeType::String).computed())
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("transition_status", AttributeType::String).computed())
        // The resource currently using this address
        .attribute(
            AttributeSchema::new("resource", AttributeType::Map(Box::new(AttributeType::String)))
                .computed(),
        )
}
