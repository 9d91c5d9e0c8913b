//! Status and attributes commands

use anyhow::Result;
use voc_client::{VehicleAttributes, VehicleStatus, VocClient};

use crate::output::{or_dash, OutputContext};

/// Show the last status the vehicle reported
pub async fn status(client: &VocClient, vehicle_id: &str, ctx: &OutputContext) -> Result<()> {
    let status = client.vehicle_status(vehicle_id).await?;
    ctx.print_kv(&status_pairs(&status));
    Ok(())
}

/// Show static vehicle attributes
pub async fn attributes(client: &VocClient, vehicle_id: &str, ctx: &OutputContext) -> Result<()> {
    let attributes = client.vehicle_attributes(vehicle_id).await?;
    ctx.print_kv(&attribute_pairs(&attributes));
    Ok(())
}

pub(crate) fn status_pairs(status: &VehicleStatus) -> Vec<(&'static str, String)> {
    vec![
        ("Locked", or_dash(status.car_locked)),
        ("Locked at", or_dash(status.car_locked_timestamp.as_deref())),
        ("Odometer (m)", or_dash(status.odometer)),
        ("Fuel (l)", or_dash(status.fuel_amount)),
        ("Fuel level (%)", or_dash(status.fuel_amount_level)),
        ("Range (km)", or_dash(status.distance_to_empty)),
        ("Doors open", or_dash(status.doors.as_ref().map(|d| d.any_open()))),
        ("Windows open", or_dash(status.windows.as_ref().map(|w| w.any_open()))),
        ("Service warning", or_dash(status.service_warning_status.as_deref())),
        ("Washer fluid", or_dash(status.washer_fluid_level.as_deref())),
        ("Brake fluid", or_dash(status.brake_fluid.as_deref())),
    ]
}

fn attribute_pairs(attributes: &VehicleAttributes) -> Vec<(&'static str, String)> {
    vec![
        ("VIN", or_dash(attributes.vin())),
        ("Registration", or_dash(attributes.registration_number.as_deref())),
        ("Model year", or_dash(attributes.model_year)),
        ("Type", or_dash(attributes.vehicle_type.as_deref())),
        ("Fuel type", or_dash(attributes.fuel_type.as_deref())),
        ("Tank volume (l)", or_dash(attributes.fuel_tank_volume)),
        ("Lock supported", or_dash(attributes.lock_supported)),
        ("Unlock supported", or_dash(attributes.unlock_supported)),
        ("Honk and blink supported", or_dash(attributes.honk_and_blink_supported)),
        ("Subscription ends", or_dash(attributes.subscription_end_date.as_deref())),
    ]
}
