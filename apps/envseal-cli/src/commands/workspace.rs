use envseal_storage::WorkspaceId;

use crate::context::Context;

pub async fn cmd_workspace_create(
    ctx: &Context,
    id: Option<WorkspaceId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    let workspace_id = id.unwrap_or_default();
    client.create_workspace(&workspace_id).await?;

    println!("✓ Workspace created: {}", workspace_id);
    Ok(())
}

pub async fn cmd_workspace_keys(
    ctx: &Context,
    workspace_id: &WorkspaceId,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    let records = client.list_members(workspace_id).await?;

    println!("Key holders of {}:", workspace_id);
    for record in records {
        let marker = if record.recipient_id == *client.principal_id() {
            " (you)"
        } else {
            ""
        };
        println!(
            "  {}{}  wrapped by {} at {}",
            record.recipient_id,
            marker,
            record.sender_id,
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

pub async fn cmd_workspace_check(
    ctx: &Context,
    workspace_id: &WorkspaceId,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    if client.has_workspace_key(workspace_id).await? {
        println!("✓ Workspace key available");
        Ok(())
    } else {
        Err(format!(
            "workspace key not available for {}; ask a member to add you",
            workspace_id
        )
        .into())
    }
}
