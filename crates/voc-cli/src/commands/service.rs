//! Service command - look up a remote operation

use anyhow::Result;
use voc_client::VocClient;

use crate::output::{or_dash, OutputContext};

/// Show the current state of a remote operation
pub async fn service(
    client: &VocClient,
    vehicle_id: &str,
    operation_id: &str,
    ctx: &OutputContext,
) -> Result<()> {
    let operation = client.service_operation(vehicle_id, operation_id).await?;

    let reason = operation.failure_reason.as_ref().map(|r| match r {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    let pairs = vec![
        ("Operation", operation.customer_service_id),
        ("Status", operation.status.to_string()),
        ("Service", or_dash(operation.service_type.or(operation.service))),
        ("Started", or_dash(operation.start_time)),
        ("Updated", or_dash(operation.status_timestamp)),
        ("Failure reason", or_dash(reason)),
    ];

    ctx.print_kv(&pairs);
    Ok(())
}
