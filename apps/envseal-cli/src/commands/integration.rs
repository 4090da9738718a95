use envseal_storage::{Environment, IntegrationId, WorkspaceId};

use crate::context::Context;

pub async fn cmd_integration_add(
    ctx: &Context,
    workspace_id: &WorkspaceId,
    environment: Environment,
    provider: &str,
    target: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    let integration = client
        .add_integration(workspace_id, environment, provider, target, Vec::new())
        .await?;

    println!(
        "✓ Integration {} added ({} → {} for {})",
        integration.id, provider, target, environment
    );
    Ok(())
}

pub async fn cmd_integration_list(
    ctx: &Context,
    workspace_id: &WorkspaceId,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    let integrations = client.list_integrations(workspace_id).await?;

    if integrations.is_empty() {
        println!("No integrations found.");
        return Ok(());
    }
    println!("Integrations:");
    for i in integrations {
        let state = if i.is_active { "active" } else { "paused" };
        println!(
            "  {}  {:<8} {:<8} {} [{}]",
            i.id, i.environment, i.provider, i.target, state
        );
    }
    Ok(())
}

pub async fn cmd_integration_set_active(
    ctx: &Context,
    workspace_id: &WorkspaceId,
    id: &IntegrationId,
    is_active: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    client
        .set_integration_active(workspace_id, id, is_active)
        .await?;

    let state = if is_active { "enabled" } else { "disabled" };
    println!("✓ Integration {} {}", id, state);
    Ok(())
}
