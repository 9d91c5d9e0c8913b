//! Remote commands - refresh, lock, unlock, honk and blink

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use voc_client::{RemoteCommand, ServiceOperation, VocClient, VocError};

use super::resolve_vehicle;
use super::status::status_pairs;
use crate::output::{or_dash, OperationRow, OutputContext};

/// Ask the vehicle for fresh status and print it once the server has it
pub async fn refresh(client: &VocClient, vehicle_id: &str, ctx: &OutputContext) -> Result<()> {
    run(client, vehicle_id, RemoteCommand::UpdateStatus, ctx).await?;

    let status = client.vehicle_status(vehicle_id).await?;
    ctx.print_kv(&status_pairs(&status));
    Ok(())
}

/// Lock the vehicle
pub async fn lock(client: &VocClient, vehicle_id: &str, ctx: &OutputContext) -> Result<()> {
    let operation = run(client, vehicle_id, RemoteCommand::Lock, ctx).await?;
    ctx.print(&[operation_row(operation)]);
    Ok(())
}

/// Unlock the vehicle
pub async fn unlock(client: &VocClient, vehicle_id: &str, ctx: &OutputContext) -> Result<()> {
    let operation = run(client, vehicle_id, RemoteCommand::Unlock, ctx).await?;
    ctx.print(&[operation_row(operation)]);
    Ok(())
}

/// Honk the horn and blink the lights
pub async fn honk(client: &VocClient, vehicle_id: &str, ctx: &OutputContext) -> Result<()> {
    let operation = run(client, vehicle_id, RemoteCommand::HonkAndBlink, ctx).await?;
    ctx.print(&[operation_row(operation)]);
    Ok(())
}

/// Submit a command and wait for its verdict behind a spinner.
///
/// Ctrl+C cancels the running operation instead of killing the process.
async fn run(
    client: &VocClient,
    vehicle_id: &str,
    command: RemoteCommand,
    ctx: &OutputContext,
) -> Result<ServiceOperation> {
    let vehicle = resolve_vehicle(client, vehicle_id).await?;

    let orchestrator = client.orchestrator().clone();
    ctrlc::set_handler(move || orchestrator.cancel_all())
        .context("Failed to install Ctrl+C handler")?;

    ctx.info("Press Ctrl+C to cancel");

    let pb = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {elapsed} {msg}")?);
    pb.set_message(format!("Waiting for {} on {}...", command, vehicle.id));
    pb.enable_steady_tick(Duration::from_millis(120));

    match client.submit(&vehicle, command).await {
        Ok(operation) => {
            pb.finish_and_clear();
            ctx.success(&format!("{} completed ({})", command, operation.status));
            Ok(operation)
        }
        Err(VocError::Cancelled) => {
            pb.abandon_with_message("Cancelled");
            ctx.warn(&format!("{} cancelled; the vehicle may still act on it", command));
            Err(VocError::Cancelled.into())
        }
        Err(e) => {
            pb.abandon_with_message("Failed");
            if let VocError::Busy { running, .. } = &e {
                ctx.warn(&format!(
                    "{} is still running {}; try again once it finishes",
                    vehicle.id, running
                ));
            } else if e.is_operation_outcome() {
                ctx.error(&format!("{} was not carried out", command));
            }
            Err(e.into())
        }
    }
}

fn operation_row(operation: ServiceOperation) -> OperationRow {
    OperationRow {
        operation_id: operation.customer_service_id,
        service: or_dash(operation.service_type.or(operation.service)),
        status: operation.status.to_string(),
        timestamp: or_dash(operation.status_timestamp),
    }
}
