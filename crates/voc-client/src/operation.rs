//! Remote operation orchestration
//!
//! Submitting a [`RemoteCommand`] returns a server-issued operation handle
//! (`customerServiceId`). The orchestrator then polls
//! `vehicles/{id}/services/{customerServiceId}` until the server reports a
//! terminal state:
//!
//! | Reported status | Outcome |
//! |---|---|
//! | `Successful`, `MessageDelivered` | resolve with the final payload |
//! | `Queued`, `Started` | wait one poll interval, poll again |
//! | `Failed` | [`VocError::OperationFailed`] |
//! | anything else | [`VocError::UnexpectedState`] |
//!
//! At most one operation runs per vehicle. Submitting the same command while
//! it is in flight joins it: every caller receives the same outcome and only
//! one command is sent. A different command is rejected with
//! [`VocError::Busy`]. The entry is cleared as soon as the operation settles.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::PollingConfig;
use crate::error::{Result, VocError};
use crate::session::Session;
use crate::sleep::{Sleeper, TokioSleeper};
use crate::types::{RemoteCommand, ServiceOperation, ServiceState, Vehicle};

/// Delay between polls when nothing else is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Poll timing for remote operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between status polls while the operation is queued or running
    pub interval: Duration,
    /// Upper bound on submit plus polling; `None` waits for a terminal state
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            timeout: config.timeout(),
        }
    }
}

type SharedOutcome = Shared<BoxFuture<'static, Result<ServiceOperation>>>;

struct InFlight {
    generation: u64,
    command: RemoteCommand,
    outcome: SharedOutcome,
    cancel: CancellationToken,
}

type InFlightMap = Arc<Mutex<HashMap<String, InFlight>>>;

/// Runs remote commands and polls them to completion, one per vehicle
#[derive(Clone)]
pub struct OperationOrchestrator {
    session: Arc<Session>,
    sleeper: Arc<dyn Sleeper>,
    policy: PollPolicy,
    in_flight: InFlightMap,
    generation: Arc<AtomicU64>,
    /// Parent of every operation's token; replaced after `cancel_all`
    root: Arc<Mutex<CancellationToken>>,
}

impl std::fmt::Debug for OperationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationOrchestrator")
            .field("policy", &self.policy)
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl OperationOrchestrator {
    /// Create an orchestrator that waits on the tokio timer
    pub fn new(session: Arc<Session>, policy: PollPolicy) -> Self {
        Self::with_sleeper(session, policy, Arc::new(TokioSleeper))
    }

    /// Create an orchestrator with a custom delay source
    pub fn with_sleeper(session: Arc<Session>, policy: PollPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            session,
            sleeper,
            policy,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            root: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        Arc::clone(&self.sleeper)
    }

    /// Submit `command` to `vehicle` and wait for a terminal outcome.
    ///
    /// If the same command is already running for this vehicle, no new
    /// command is sent and the caller waits on the running one. A different
    /// command fails with [`VocError::Busy`].
    #[instrument(skip(self, vehicle), fields(vehicle_id = %vehicle.id))]
    pub async fn submit(
        &self,
        vehicle: &Vehicle,
        command: RemoteCommand,
    ) -> Result<ServiceOperation> {
        self.join_or_start(&vehicle.id, command)?.await
    }

    /// Ask the vehicle to report fresh status
    pub async fn update_status(&self, vehicle: &Vehicle) -> Result<ServiceOperation> {
        self.submit(vehicle, RemoteCommand::UpdateStatus).await
    }

    /// Whether an operation is currently running for the vehicle
    pub fn is_pending(&self, vehicle_id: &str) -> bool {
        self.in_flight.lock().contains_key(vehicle_id)
    }

    /// Number of vehicles with a running operation
    pub fn pending_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Cancel the running operation for a vehicle.
    ///
    /// Returns `false` if nothing was running. Waiters receive
    /// [`VocError::Cancelled`].
    pub fn cancel(&self, vehicle_id: &str) -> bool {
        match self.in_flight.lock().get(vehicle_id) {
            Some(entry) => {
                info!(vehicle_id, command = %entry.command, "Cancelling remote operation");
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every running operation.
    ///
    /// Operations submitted afterwards run normally.
    pub fn cancel_all(&self) {
        let root = std::mem::replace(&mut *self.root.lock(), CancellationToken::new());
        info!(pending = self.pending_count(), "Cancelling all remote operations");
        root.cancel();
    }

    /// Check-and-insert under a single lock so two callers can never both
    /// start a command for the same vehicle.
    fn join_or_start(&self, vehicle_id: &str, command: RemoteCommand) -> Result<SharedOutcome> {
        let mut in_flight = self.in_flight.lock();

        if let Some(existing) = in_flight.get(vehicle_id) {
            if existing.command != command {
                warn!(
                    "Vehicle {} already running {}; rejecting {}",
                    vehicle_id, existing.command, command
                );
                return Err(VocError::Busy {
                    vehicle_id: vehicle_id.to_string(),
                    running: existing.command,
                });
            }
            debug!("Joining in-flight {} operation", command);
            return Ok(existing.outcome.clone());
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.root.lock().child_token();
        let run = OperationRun {
            session: Arc::clone(&self.session),
            sleeper: Arc::clone(&self.sleeper),
            policy: self.policy.clone(),
            vehicle_id: vehicle_id.to_string(),
            command,
            cancel: cancel.clone(),
        };
        let clear = ClearOnDrop {
            in_flight: Arc::clone(&self.in_flight),
            vehicle_id: vehicle_id.to_string(),
            generation,
        };

        // Runs detached so the operation completes even if every caller
        // stops waiting.
        let handle = tokio::spawn(async move {
            let result = run.execute().await;
            drop(clear);
            result
        });

        let outcome = async move {
            handle
                .await
                .unwrap_or_else(|e| Err(VocError::TaskFailed(e.to_string())))
        }
        .boxed()
        .shared();

        in_flight.insert(
            vehicle_id.to_string(),
            InFlight {
                generation,
                command,
                outcome: outcome.clone(),
                cancel,
            },
        );

        Ok(outcome)
    }
}

/// Removes the vehicle's entry when the operation task ends, including by
/// panic.
struct ClearOnDrop {
    in_flight: InFlightMap,
    vehicle_id: String,
    generation: u64,
}

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(&self.vehicle_id)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            in_flight.remove(&self.vehicle_id);
        }
    }
}

/// One submit-and-poll sequence
struct OperationRun {
    session: Arc<Session>,
    sleeper: Arc<dyn Sleeper>,
    policy: PollPolicy,
    vehicle_id: String,
    command: RemoteCommand,
    cancel: CancellationToken,
}

impl OperationRun {
    #[instrument(skip(self), fields(vehicle_id = %self.vehicle_id, command = %self.command))]
    async fn execute(self) -> Result<ServiceOperation> {
        let deadline = self.policy.timeout.map(|limit| Instant::now() + limit);

        let submit_path = format!(
            "vehicles/{}/{}",
            self.vehicle_id,
            self.command.path_segment()
        );
        let submitted: ServiceOperation = self
            .guarded(
                deadline,
                None,
                self.session
                    .post_json(&submit_path, &serde_json::json!({})),
            )
            .await?;

        let operation_id = submitted.customer_service_id;
        info!(
            "Submitted {} as operation {} (initial status {})",
            self.command, operation_id, submitted.status
        );

        let poll_path = format!("vehicles/{}/services/{}", self.vehicle_id, operation_id);
        let mut polls = 0u32;

        loop {
            let operation: ServiceOperation = self
                .guarded(
                    deadline,
                    Some(&operation_id),
                    self.session.get_json(&poll_path),
                )
                .await?;
            polls += 1;

            match &operation.status {
                state if state.is_success() => {
                    info!(
                        "Operation {} finished with {} after {} poll(s)",
                        operation_id, state, polls
                    );
                    return Ok(operation);
                }
                ServiceState::Failed => {
                    warn!("Operation {} reported failure", operation_id);
                    return Err(VocError::OperationFailed {
                        operation_id,
                        reason: operation.failure_reason,
                    });
                }
                state if state.is_pending() => {
                    debug!(
                        "Operation {} is {}; polling again in {:?}",
                        operation_id, state, self.policy.interval
                    );
                    self.guarded(deadline, Some(&operation_id), async {
                        self.sleeper.sleep(self.policy.interval).await;
                        Ok(())
                    })
                    .await?;
                }
                state => {
                    warn!("Operation {} reported unexpected status {}", operation_id, state);
                    return Err(VocError::UnexpectedState {
                        operation_id,
                        state: state.to_string(),
                    });
                }
            }
        }
    }

    /// Run one step of the state machine, abandoning it on cancellation or
    /// when the operation deadline passes.
    async fn guarded<T>(
        &self,
        deadline: Option<Instant>,
        operation_id: Option<&str>,
        step: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(VocError::Cancelled),
            _ = expired => Err(VocError::Timeout {
                operation_id: operation_id.unwrap_or("(unassigned)").to_string(),
            }),
            result = step => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn orchestrator() -> OperationOrchestrator {
        let config = ClientConfig::builder()
            .base_url("http://127.0.0.1:9/")
            .build();
        let session = Session::new(&config).unwrap();
        OperationOrchestrator::new(Arc::new(session), PollPolicy::default())
    }

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(policy.timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_policy_from_config_without_timeout() {
        let config = PollingConfig {
            interval_ms: 250,
            timeout_ms: None,
        };
        let policy = PollPolicy::from(&config);
        assert_eq!(policy.interval, Duration::from_millis(250));
        assert_eq!(policy.timeout, None);
    }

    #[test]
    fn test_cancel_without_pending_operation() {
        let orchestrator = orchestrator();
        assert!(!orchestrator.cancel("YV1ABC"));
        assert!(!orchestrator.is_pending("YV1ABC"));
        assert_eq!(orchestrator.pending_count(), 0);
    }

    #[test]
    fn test_cancel_all_leaves_later_operations_live() {
        let orchestrator = orchestrator();
        let before = orchestrator.root.lock().child_token();

        orchestrator.cancel_all();

        assert!(before.is_cancelled());
        assert!(!orchestrator.root.lock().child_token().is_cancelled());
    }

    #[test]
    fn test_unauthenticated_submit_fails_and_clears_guard() {
        let orchestrator = orchestrator();
        let vehicle = Vehicle::new("YV1ABC", 1, "Verified".to_string().into());

        let err = tokio_test::assert_err!(tokio_test::block_on(
            orchestrator.update_status(&vehicle)
        ));
        assert!(matches!(err, VocError::Unauthenticated));
        assert!(!orchestrator.is_pending("YV1ABC"));
    }
}
