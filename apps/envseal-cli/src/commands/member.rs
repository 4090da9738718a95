use envseal_storage::{PrincipalId, WorkspaceId};

use crate::context::Context;

pub async fn cmd_member_add(
    ctx: &Context,
    workspace_id: &WorkspaceId,
    principal_id: &PrincipalId,
    public_key_hex: Option<&str>,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;

    if let Some(public_key_hex) = public_key_hex {
        let public_key = hex::decode(public_key_hex)?;
        client
            .register_principal(principal_id, name, &public_key)
            .await?;
    }
    client.grant_access(workspace_id, principal_id).await?;

    println!("✓ {} can now unlock workspace {}", principal_id, workspace_id);
    Ok(())
}

pub async fn cmd_member_remove(
    ctx: &Context,
    workspace_id: &WorkspaceId,
    principal_id: &PrincipalId,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    let removed = client.revoke_member(workspace_id, principal_id).await?;

    println!("✓ {} removed from workspace {}", principal_id, workspace_id);
    if removed > 0 {
        println!("  Deleted {} personal secret(s)", removed);
    }
    Ok(())
}
