//! Account command - show the logged-in account

use anyhow::Result;
use voc_client::VocClient;

use crate::output::{or_dash, OutputContext};

/// Show the account and its vehicle relations
pub async fn account(client: &VocClient, ctx: &OutputContext) -> Result<()> {
    let account = client.login().await?;

    let relations = account
        .account_vehicle_relations
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    let pairs = vec![
        ("Username", account.username),
        ("Account ID", account.account_id),
        ("First name", or_dash(account.first_name)),
        ("Last name", or_dash(account.last_name)),
        ("Relations", relations),
    ];

    ctx.print_kv(&pairs);
    Ok(())
}
