//! Remote EIP client abstraction
//!
//! The wire client for the QingCloud API lives outside this crate. Providers
//! receive an implementation of [`EipClient`] explicitly.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::model::{BillingMode, DescribeEipsResponse, EipDescription};

/// Errors returned by the remote EIP service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with a non-zero ret_code
    #[error("QingCloud API error {ret_code}: {message}")]
    Api { ret_code: i32, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// AllocateEips request parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AllocateEipsRequest {
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eip_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_mode: Option<BillingMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub need_icp: Option<u8>,
}

impl DescribeEipsResponse {
    /// Turn a decoded response into the client result
    pub fn into_result(self) -> ClientResult<Vec<EipDescription>> {
        if self.ret_code == 0 {
            Ok(self.eip_set)
        } else {
            Err(ClientError::Api {
                ret_code: self.ret_code,
                message: self.message.unwrap_or_default(),
            })
        }
    }
}

/// Operations the provider needs from the remote EIP service
#[async_trait]
pub trait EipClient: Send + Sync {
    /// Allocate new EIPs, returning their identifiers
    async fn allocate(&self, request: AllocateEipsRequest) -> ClientResult<Vec<String>>;

    /// Describe the given EIPs. Unknown identifiers are omitted from the result.
    async fn describe(&self, eip_ids: &[String], verbose: bool)
    -> ClientResult<Vec<EipDescription>>;

    /// Change name and/or description of one EIP
    async fn modify_attributes(
        &self,
        eip_id: &str,
        eip_name: Option<&str>,
        description: Option<&str>,
    ) -> ClientResult<()>;

    async fn change_bandwidth(&self, eip_ids: &[String], bandwidth: u32) -> ClientResult<()>;

    async fn change_billing_mode(
        &self,
        eip_ids: &[String],
        billing_mode: BillingMode,
    ) -> ClientResult<()>;

    async fn release(&self, eip_ids: &[String]) -> ClientResult<()>;
}
