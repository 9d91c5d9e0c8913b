//! Request and response types for the VOC API

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Account Types
// =============================================================================

/// Customer account returned by the login call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub account_id: String,
    /// Relation ids extracted from the relation URLs the server returns
    #[serde(default, deserialize_with = "deserialize_relation_ids")]
    pub account_vehicle_relations: Vec<u64>,
}

/// Extract the numeric id from `.../vehicle-account-relations/{id}`
pub fn parse_relation_id(relation_url: &str) -> Option<u64> {
    const MARKER: &str = "vehicle-account-relations/";
    let start = relation_url.find(MARKER)? + MARKER.len();
    relation_url[start..].trim_end_matches('/').parse().ok()
}

/// Relation entries arrive as URLs; already-numeric entries pass through.
/// Entries that carry no parsable id are dropped.
fn deserialize_relation_ids<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<Value> = Vec::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .filter_map(|entry| match entry {
            Value::String(url) => parse_relation_id(url),
            Value::Number(n) => n.as_u64(),
            _ => None,
        })
        .collect())
}

// =============================================================================
// Vehicle Types
// =============================================================================

/// Verification state of an account-to-vehicle link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationStatus {
    Verified,
    Other(String),
}

impl RelationStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl From<String> for RelationStatus {
    fn from(value: String) -> Self {
        if value == "Verified" {
            Self::Verified
        } else {
            Self::Other(value)
        }
    }
}

impl From<RelationStatus> for String {
    fn from(value: RelationStatus) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for RelationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "Verified"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Account-to-vehicle relation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRelation {
    pub vehicle_id: String,
    pub status: RelationStatus,
    pub customer_vehicle_relation_id: u64,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub account_vehicle_relation: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// A vehicle linked to the account
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: String,
    pub relation_id: u64,
    pub relation_status: RelationStatus,
    /// Last fetched telemetry snapshot
    pub status: Option<VehicleStatus>,
    /// Last fetched attributes
    pub attributes: Option<VehicleAttributes>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, relation_id: u64, relation_status: RelationStatus) -> Self {
        Self {
            id: id.into(),
            relation_id,
            relation_status,
            status: None,
            attributes: None,
        }
    }
}

impl From<VehicleRelation> for Vehicle {
    fn from(relation: VehicleRelation) -> Self {
        Self::new(
            relation.vehicle_id,
            relation.customer_vehicle_relation_id,
            relation.status,
        )
    }
}

/// Door open flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorStatus {
    #[serde(default)]
    pub tailgate_open: bool,
    #[serde(default)]
    pub rear_right_door_open: bool,
    #[serde(default)]
    pub rear_left_door_open: bool,
    #[serde(default)]
    pub front_right_door_open: bool,
    #[serde(default)]
    pub front_left_door_open: bool,
    #[serde(default)]
    pub hood_open: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl DoorStatus {
    pub fn any_open(&self) -> bool {
        self.tailgate_open
            || self.rear_right_door_open
            || self.rear_left_door_open
            || self.front_right_door_open
            || self.front_left_door_open
            || self.hood_open
    }
}

/// Window open flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStatus {
    #[serde(default)]
    pub front_left_window_open: bool,
    #[serde(default)]
    pub front_right_window_open: bool,
    #[serde(default)]
    pub rear_right_window_open: bool,
    #[serde(default)]
    pub rear_left_window_open: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl WindowStatus {
    pub fn any_open(&self) -> bool {
        self.front_left_window_open
            || self.front_right_window_open
            || self.rear_right_window_open
            || self.rear_left_window_open
    }
}

/// Telemetry snapshot from `vehicles/{id}/status`
///
/// Fields not modelled here are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatus {
    #[serde(default)]
    pub average_fuel_consumption: Option<f64>,
    #[serde(default)]
    pub average_speed: Option<f64>,
    #[serde(default)]
    pub brake_fluid: Option<String>,
    #[serde(default)]
    pub car_locked: Option<bool>,
    #[serde(default)]
    pub car_locked_timestamp: Option<String>,
    #[serde(default)]
    pub distance_to_empty: Option<f64>,
    #[serde(default)]
    pub doors: Option<DoorStatus>,
    #[serde(default)]
    pub fuel_amount: Option<f64>,
    #[serde(default)]
    pub fuel_amount_level: Option<f64>,
    #[serde(default)]
    pub odometer: Option<f64>,
    #[serde(default)]
    pub service_warning_status: Option<String>,
    #[serde(default)]
    pub trip_meter1: Option<f64>,
    #[serde(default)]
    pub trip_meter2: Option<f64>,
    #[serde(default)]
    pub washer_fluid_level: Option<String>,
    #[serde(default)]
    pub windows: Option<WindowStatus>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Static vehicle attributes from `vehicles/{id}/attributes`
///
/// Fields not modelled here are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleAttributes {
    #[serde(default, rename = "VIN")]
    pub vin: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub model_year: Option<u32>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub fuel_tank_volume: Option<f64>,
    #[serde(default)]
    pub lock_supported: Option<bool>,
    #[serde(default)]
    pub unlock_supported: Option<bool>,
    #[serde(default)]
    pub honk_and_blink_supported: Option<bool>,
    #[serde(default)]
    pub remote_heater_supported: Option<bool>,
    #[serde(default)]
    pub engine_start_supported: Option<bool>,
    #[serde(default)]
    pub subscription_end_date: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl VehicleAttributes {
    /// VIN from either the `VIN` or the lowercase `vin` key
    pub fn vin(&self) -> Option<&str> {
        self.vin
            .as_deref()
            .or_else(|| self.extra.get("vin").and_then(Value::as_str))
    }
}

/// Status and attributes fetched together
#[derive(Debug, Clone)]
pub struct VehicleInfo {
    pub status: VehicleStatus,
    pub attributes: VehicleAttributes,
}

// =============================================================================
// Remote Operation Types
// =============================================================================

/// Server-reported state of a remote operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceState {
    Successful,
    MessageDelivered,
    Started,
    Queued,
    Failed,
    /// Any value outside the known set
    Unknown(String),
}

impl ServiceState {
    /// The server confirmed the command was delivered or completed
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Successful | Self::MessageDelivered)
    }

    /// The command is waiting or running; poll again
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Started)
    }

    /// The server explicitly reported failure
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl From<String> for ServiceState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Successful" => Self::Successful,
            "MessageDelivered" => Self::MessageDelivered,
            "Started" => Self::Started,
            "Queued" => Self::Queued,
            "Failed" => Self::Failed,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ServiceState> for String {
    fn from(value: ServiceState) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Successful => write!(f, "Successful"),
            Self::MessageDelivered => write!(f, "MessageDelivered"),
            Self::Started => write!(f, "Started"),
            Self::Queued => write!(f, "Queued"),
            Self::Failed => write!(f, "Failed"),
            Self::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Remote operation resource, as returned by command submission and by
/// `vehicles/{id}/services/{customerServiceId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOperation {
    pub customer_service_id: String,
    pub status: ServiceState,
    #[serde(default)]
    pub failure_reason: Option<Value>,
    #[serde(default)]
    pub status_timestamp: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub vehicle_id: Option<String>,
}

/// Commands that run asynchronously on the vendor backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCommand {
    /// Ask the vehicle to report fresh status
    UpdateStatus,
    Lock,
    Unlock,
    HonkAndBlink,
}

impl RemoteCommand {
    /// Path segment under `vehicles/{id}/`
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::UpdateStatus => "updatestatus",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::HonkAndBlink => "honk_and_blink",
        }
    }
}

impl std::fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}
