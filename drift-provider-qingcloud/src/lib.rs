//! Drift QingCloud Provider
//!
//! Manages QingCloud Elastic IPs. The remote API client is supplied by the
//! caller through the [`client::EipClient`] trait.

pub mod client;
pub mod config;
pub mod eip;
pub mod memory;
pub mod model;
pub mod poller;
pub mod provider;
pub mod schemas;

pub use client::{ClientError, EipClient};
pub use config::{PollConfig, ProviderConfig};
pub use poller::TransitionPoller;
pub use provider::QingcloudProvider;
