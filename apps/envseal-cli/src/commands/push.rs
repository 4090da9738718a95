use envseal_storage::{Environment, WorkspaceId};

use crate::context::Context;

pub async fn cmd_push(
    ctx: &Context,
    workspace_id: &WorkspaceId,
    environment: Environment,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    let report = client.push_secrets(workspace_id, environment).await?;

    if report.sinks.succeeded.is_empty() && report.sinks.failed.is_empty() {
        println!("No active integrations for {}.", environment);
        return Ok(());
    }
    for id in &report.sinks.succeeded {
        println!("✓ {} secret(s) pushed to {}", report.secret_count, id);
    }
    for (id, err) in &report.sinks.failed {
        eprintln!("✗ push to {} failed: {}", id, err);
    }

    report.sinks.into_result()?;
    Ok(())
}
