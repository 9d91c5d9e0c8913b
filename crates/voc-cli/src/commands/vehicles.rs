//! Vehicles command - list vehicles linked to the account

use anyhow::Result;
use voc_client::{Vehicle, VocClient};

use crate::output::{or_dash, OutputContext, VehicleRow};

/// List linked vehicles with registration and lock state
pub async fn vehicles(client: &VocClient, ctx: &OutputContext) -> Result<()> {
    // Vehicles come back with attributes and status already fetched
    let rows: Vec<VehicleRow> = client.vehicles().await?.into_iter().map(vehicle_row).collect();

    ctx.print(&rows);
    Ok(())
}

fn vehicle_row(vehicle: Vehicle) -> VehicleRow {
    let attributes = vehicle.attributes.unwrap_or_default();
    let status = vehicle.status.unwrap_or_default();

    VehicleRow {
        id: vehicle.id,
        relation_id: vehicle.relation_id,
        relation_status: vehicle.relation_status.to_string(),
        registration: or_dash(attributes.registration_number),
        model_year: or_dash(attributes.model_year),
        locked: or_dash(status.car_locked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voc_client::{VehicleAttributes, VehicleStatus};

    #[test]
    fn test_row_uses_fetched_snapshots() {
        let mut vehicle = Vehicle::new("YV1ABC", 7, "Verified".to_string().into());
        vehicle.attributes = Some(VehicleAttributes {
            registration_number: Some("ABC123".into()),
            model_year: Some(2019),
            ..Default::default()
        });
        vehicle.status = Some(VehicleStatus {
            car_locked: Some(false),
            ..Default::default()
        });

        let row = vehicle_row(vehicle);
        assert_eq!(row.id, "YV1ABC");
        assert_eq!(row.relation_id, 7);
        assert_eq!(row.registration, "ABC123");
        assert_eq!(row.model_year, "2019");
        assert_eq!(row.locked, "false");
    }

    #[test]
    fn test_row_without_snapshots() {
        let row = vehicle_row(Vehicle::new("YV1ABC", 7, "Verified".to_string().into()));
        assert_eq!(row.registration, "-");
        assert_eq!(row.locked, "-");
    }
}
