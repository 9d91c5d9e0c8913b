//! VOC API client

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::operation::{OperationOrchestrator, PollPolicy};
use crate::session::Session;
use crate::sleep::{Sleeper, TokioSleeper};
use crate::types::*;

/// Volvo On Call REST API client
///
/// Starts unauthenticated; call [`VocClient::authenticate`] before any
/// request, then [`VocClient::login`] to verify the credential.
#[derive(Debug, Clone)]
pub struct VocClient {
    session: Arc<Session>,
    orchestrator: OperationOrchestrator,
}

impl VocClient {
    /// Create an unauthenticated client
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Create an unauthenticated client with a custom poll delay source
    pub fn with_sleeper(config: ClientConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        let session = Session::new(&config)?;
        Ok(Self::from_session(
            session,
            PollPolicy::from(&config.polling),
            sleeper,
        ))
    }

    fn from_session(session: Session, policy: PollPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        let session = Arc::new(session);
        let orchestrator = OperationOrchestrator::with_sleeper(Arc::clone(&session), policy, sleeper);
        Self {
            session,
            orchestrator,
        }
    }

    /// Attach the account credential. No network call is made.
    pub fn authenticate(self, username: &str, password: &str) -> Self {
        let session = self.session.as_ref().clone().authenticate(username, password);
        Self::from_session(
            session,
            self.orchestrator.policy().clone(),
            self.orchestrator.sleeper(),
        )
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Get the underlying session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get the remote operation orchestrator
    pub fn orchestrator(&self) -> &OperationOrchestrator {
        &self.orchestrator
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Fetch the customer account; fails if the credential is rejected
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<Account> {
        let account: Account = self.session.get_json("customeraccounts").await?;
        info!(
            "Logged in as {} ({} vehicle relation(s))",
            account.username,
            account.account_vehicle_relations.len()
        );
        Ok(account)
    }

    // =========================================================================
    // Vehicles
    // =========================================================================

    /// Fetch relation metadata by relation id
    #[instrument(skip(self))]
    pub async fn vehicle_relation(&self, relation_id: u64) -> Result<VehicleRelation> {
        self.session
            .get_json(&format!("vehicle-account-relations/{}", relation_id))
            .await
    }

    /// Resolve a relation into a vehicle with status and attributes loaded
    #[instrument(skip(self))]
    pub async fn vehicle_by_relation(&self, relation_id: u64) -> Result<Vehicle> {
        let relation = self.vehicle_relation(relation_id).await?;
        let mut vehicle = Vehicle::from(relation);
        self.update_info(&mut vehicle).await?;
        Ok(vehicle)
    }

    /// All vehicles linked to the account, with status and attributes loaded
    #[instrument(skip(self))]
    pub async fn vehicles(&self) -> Result<Vec<Vehicle>> {
        let account = self.login().await?;
        let mut vehicles = Vec::with_capacity(account.account_vehicle_relations.len());
        for relation_id in account.account_vehicle_relations {
            vehicles.push(self.vehicle_by_relation(relation_id).await?);
        }
        Ok(vehicles)
    }

    /// Find a linked vehicle by id without loading status or attributes
    #[instrument(skip(self))]
    pub async fn find_vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>> {
        let account = self.login().await?;
        for relation_id in account.account_vehicle_relations {
            let relation = self.vehicle_relation(relation_id).await?;
            if relation.vehicle_id == vehicle_id {
                return Ok(Some(Vehicle::from(relation)));
            }
        }
        Ok(None)
    }

    /// Latest telemetry the server holds for the vehicle
    #[instrument(skip(self))]
    pub async fn vehicle_status(&self, vehicle_id: &str) -> Result<VehicleStatus> {
        self.session
            .get_json(&format!("vehicles/{}/status", vehicle_id))
            .await
    }

    /// Static attributes of the vehicle
    #[instrument(skip(self))]
    pub async fn vehicle_attributes(&self, vehicle_id: &str) -> Result<VehicleAttributes> {
        self.session
            .get_json(&format!("vehicles/{}/attributes", vehicle_id))
            .await
    }

    /// Fetch attributes and status and store them on the vehicle.
    ///
    /// Reads what the server already has; use
    /// [`VocClient::update_vehicle_status`] to ask the car for fresh data.
    #[instrument(skip(self, vehicle), fields(vehicle_id = %vehicle.id))]
    pub async fn update_info(&self, vehicle: &mut Vehicle) -> Result<VehicleInfo> {
        let attributes = self.vehicle_attributes(&vehicle.id).await?;
        let status = self.vehicle_status(&vehicle.id).await?;
        debug!("Loaded status and attributes for {}", vehicle.id);

        vehicle.attributes = Some(attributes.clone());
        vehicle.status = Some(status.clone());

        Ok(VehicleInfo { status, attributes })
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Fetch a remote operation by its server-issued id
    #[instrument(skip(self))]
    pub async fn service_operation(
        &self,
        vehicle_id: &str,
        operation_id: &str,
    ) -> Result<ServiceOperation> {
        self.session
            .get_json(&format!("vehicles/{}/services/{}", vehicle_id, operation_id))
            .await
    }

    /// Submit a remote command and wait for the server's verdict
    pub async fn submit(
        &self,
        vehicle: &Vehicle,
        command: RemoteCommand,
    ) -> Result<ServiceOperation> {
        self.orchestrator.submit(vehicle, command).await
    }

    /// Ask the vehicle to push fresh status to the server
    pub async fn update_vehicle_status(&self, vehicle: &Vehicle) -> Result<ServiceOperation> {
        self.orchestrator.update_status(vehicle).await
    }
}
