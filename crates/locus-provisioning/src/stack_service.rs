//! Stack creation and polling
//!
//! One call creates a stack and polls it until it reaches a terminal status
//! or the timeout elapses. Progress lines go to the caller's callback; every
//! failure is also published on the repository's provisioning stream.

use crate::repository::CredentialRepository;
use locus_core::effects::StackPollingEffects;
use locus_core::stack::{is_permanent_failure_status, STATUS_CREATE_COMPLETE};
use locus_core::{
    BootstrapCredentials, DomainError, LocusResult, NetworkError, ProvisioningSettings,
    ProvisioningState, StackEvent, StackProvisioningResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Poll cadence and overall deadline, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            timeout_ms: 600_000,
        }
    }
}

impl From<&ProvisioningSettings> for PollSettings {
    fn from(settings: &ProvisioningSettings) -> Self {
        Self {
            interval_ms: settings.poll_interval_ms,
            timeout_ms: settings.poll_timeout_ms,
        }
    }
}

/// Progress callback; receives one human-readable line per update.
pub type StatusCallback<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Receives the stack id once the provider has accepted the create request.
pub type StackCreatedCallback<'a> = &'a (dyn Fn(&str) + Send + Sync);

pub struct StackProvisioningService<E> {
    effects: Arc<E>,
    repository: Arc<CredentialRepository>,
    settings: PollSettings,
}

impl<E: StackPollingEffects> StackProvisioningService<E> {
    pub fn new(effects: Arc<E>, repository: Arc<CredentialRepository>, settings: PollSettings) -> Self {
        Self {
            effects,
            repository,
            settings,
        }
    }

    /// Create `stack_name` and wait for it to finish.
    ///
    /// Returns the stack ARN and its outputs exactly as reported once the
    /// stack reaches `CREATE_COMPLETE`. Transient describe failures are
    /// retried until the deadline; the deadline itself yields
    /// `Network::Timeout`.
    pub async fn create_and_poll_stack(
        &self,
        creds: &BootstrapCredentials,
        stack_name: &str,
        template: &str,
        parameters: &HashMap<String, String>,
        on_status_update: StatusCallback<'_>,
    ) -> LocusResult<StackProvisioningResult> {
        self.create_and_track_stack(
            creds,
            stack_name,
            template,
            parameters,
            on_status_update,
            &|_| {},
        )
        .await
    }

    /// [`create_and_poll_stack`](Self::create_and_poll_stack), also reporting
    /// the moment the stack exists. Any error after `on_created` fired leaves
    /// a stack behind, so re-running the deployment would duplicate it.
    pub async fn create_and_track_stack(
        &self,
        creds: &BootstrapCredentials,
        stack_name: &str,
        template: &str,
        parameters: &HashMap<String, String>,
        on_status_update: StatusCallback<'_>,
        on_created: StackCreatedCallback<'_>,
    ) -> LocusResult<StackProvisioningResult> {
        on_status_update(&format!("Deploying stack {stack_name}..."));

        let created_id = match self
            .effects
            .create_stack(creds, stack_name, template, parameters)
            .await
        {
            Ok(id) => id,
            Err(err) => {
                warn!(stack_name, error = %err, "stack creation rejected");
                return Err(self.fail(err));
            }
        };
        info!(stack_name, stack_id = %created_id, "stack creation started");
        on_created(&created_id);

        let started = self.effects.now_ms().await;
        let deadline = started.saturating_add(self.settings.timeout_ms);
        let mut seen_events = HashSet::new();

        while self.effects.now_ms().await < deadline {
            self.report_events(creds, stack_name, &mut seen_events, on_status_update)
                .await;

            match self.effects.describe_stack(creds, stack_name).await {
                Ok(details) if details.status == STATUS_CREATE_COMPLETE => {
                    let outputs = match details.outputs {
                        Some(outputs) if !outputs.is_empty() => outputs,
                        _ => {
                            return Err(self.fail(DomainError::deployment_failed(
                                "Missing stack outputs",
                            )))
                        }
                    };
                    info!(stack_name, "stack creation complete");
                    return Ok(StackProvisioningResult {
                        stack_id: details.stack_id.unwrap_or(created_id),
                        outputs,
                    });
                }
                Ok(details) if is_permanent_failure_status(&details.status) => {
                    warn!(stack_name, status = %details.status, "stack creation failed");
                    return Err(self.fail(DomainError::deployment_failed(format!(
                        "Stack creation failed: {}",
                        details.status
                    ))));
                }
                Ok(details) => {
                    debug!(stack_name, status = %details.status, "stack still deploying");
                    on_status_update(&format!("Status: {}", details.status));
                }
                Err(err) if err.is_permanent_polling_error() => {
                    warn!(stack_name, error = %err, "permanent error while polling");
                    return Err(self.fail(DomainError::deployment_failed(format!(
                        "Permanent error during polling: {err}"
                    ))));
                }
                Err(err) => {
                    debug!(stack_name, error = %err, "transient describe failure, retrying");
                }
            }

            self.effects.sleep_ms(self.settings.interval_ms).await;
        }

        warn!(stack_name, timeout_ms = self.settings.timeout_ms, "stack polling timed out");
        Err(self.fail(NetworkError::Timeout.into()))
    }

    /// Emit new resource events oldest first. Fetch errors are ignored.
    async fn report_events(
        &self,
        creds: &BootstrapCredentials,
        stack_name: &str,
        seen: &mut HashSet<String>,
        on_status_update: StatusCallback<'_>,
    ) {
        let mut events: Vec<StackEvent> = match self.effects.describe_stack_events(creds, stack_name).await {
            Ok(events) => events,
            Err(err) => {
                debug!(stack_name, error = %err, "stack events unavailable");
                return;
            }
        };
        events.sort_by_key(|event| event.timestamp_ms);

        for event in events {
            if seen.insert(event.event_id.clone()) && event.is_reportable() {
                on_status_update(&event.progress_line());
            }
        }
    }

    fn fail(&self, err: DomainError) -> DomainError {
        self.repository
            .update_provisioning_state(ProvisioningState::failure(err.clone()));
        err
    }
}
