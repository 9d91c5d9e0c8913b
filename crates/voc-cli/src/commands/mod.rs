//! Command implementations for voc-cli

pub mod account;
pub mod remote;
pub mod service;
pub mod status;
pub mod vehicles;

pub use account::account;
pub use remote::{honk, lock, refresh, unlock};
pub use service::service;
pub use status::{attributes, status};
pub use vehicles::vehicles;

use anyhow::{Context, Result};
use voc_client::{Vehicle, VocClient};

/// Look up a linked vehicle by id
pub(crate) async fn resolve_vehicle(client: &VocClient, vehicle_id: &str) -> Result<Vehicle> {
    client
        .find_vehicle(vehicle_id)
        .await?
        .with_context(|| format!("Vehicle '{}' is not linked to this account", vehicle_id))
}
