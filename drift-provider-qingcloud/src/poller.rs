//! Transition poller
//!
//! Waits for an EIP to finish an in-flight operation (associating,
//! releasing, ...) before its attributes are read.

use drift_core::provider::{ProviderError, ProviderResult};
use log::debug;
use tokio::time::{Instant, sleep};

use crate::client::EipClient;
use crate::config::PollConfig;
use crate::model::EipDescription;

/// Polls DescribeEips until the transition status clears
#[derive(Debug, Clone, Default)]
pub struct TransitionPoller {
    config: PollConfig,
}

impl TransitionPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Describe `eip_id` until it reports no transition and return that description.
    ///
    /// Describe errors and a missing EIP end the wait immediately. Running out
    /// of attempts, or a next delay that would overrun the timeout, is a
    /// `Timeout`.
    pub async fn wait_for_stable_state(
        &self,
        client: &dyn EipClient,
        eip_id: &str,
    ) -> ProviderResult<EipDescription> {
        if eip_id.is_empty() {
            return Err(ProviderError::invalid_config(
                "Cannot wait for an eip without an identifier",
            ));
        }

        let deadline = Instant::now()
            .checked_add(self.config.timeout())
            .ok_or_else(|| {
                ProviderError::invalid_config(format!(
                    "Poll timeout of {}s is out of range",
                    self.config.timeout_secs
                ))
                .with_identifier(eip_id)
            })?;
        let mut delay = self.config.interval();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let eip = describe_one(client, eip_id).await?;
            if eip.transition_status.is_stable() {
                debug!(
                    "{} is stable after {} attempt(s), status {}",
                    eip_id, attempts, eip.status
                );
                return Ok(eip);
            }

            let next_attempt = Instant::now().checked_add(delay);
            if attempts >= self.config.max_attempts
                || next_attempt.is_none_or(|next| next > deadline)
            {
                return Err(ProviderError::timeout(format!(
                    "Timed out waiting for eip to finish '{}' after {} attempt(s)",
                    eip.transition_status, attempts
                ))
                .with_identifier(eip_id));
            }

            debug!(
                "{} is {} (attempt {}/{}), retrying in {:?}",
                eip_id, eip.transition_status, attempts, self.config.max_attempts, delay
            );
            sleep(delay).await;
            delay = self.config.next_interval(delay);
        }
    }
}

/// Describe a single EIP
pub(crate) async fn describe_one(
    client: &dyn EipClient,
    eip_id: &str,
) -> ProviderResult<EipDescription> {
    let eips = client
        .describe(&[eip_id.to_string()], true)
        .await
        .map_err(|e| {
            ProviderError::remote_unavailable("Failed to describe eip")
                .with_identifier(eip_id)
                .with_cause(e)
        })?;

    eips.into_iter()
        .find(|eip| eip.eip_id == eip_id)
        .ok_or_else(|| ProviderError::not_found("Eip not found").with_identifier(eip_id))
}
