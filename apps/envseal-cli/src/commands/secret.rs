use envseal_storage::{Environment, SecretScope, Visibility, WorkspaceId};

use crate::context::Context;

fn visibility(personal: bool) -> Visibility {
    if personal {
        Visibility::Personal
    } else {
        Visibility::Shared
    }
}

pub async fn cmd_secret_set(
    ctx: &Context,
    workspace_id: &WorkspaceId,
    environment: Environment,
    name: &str,
    value: &str,
    personal: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    let visibility = visibility(personal);
    client
        .set_secret(workspace_id, environment, name, value, visibility)
        .await?;

    println!("✓ Secret '{}' set ({}, {})", name, environment, visibility);
    Ok(())
}

pub async fn cmd_secret_get(
    ctx: &Context,
    workspace_id: &WorkspaceId,
    environment: Environment,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    let value = client.reveal_secret(workspace_id, environment, name).await?;
    println!("{}", value.as_str());
    Ok(())
}

pub async fn cmd_secret_list(
    ctx: &Context,
    workspace_id: &WorkspaceId,
    environment: Environment,
    reveal: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;

    if reveal {
        let secrets = client.reveal_secrets(workspace_id, environment).await?;
        if secrets.is_empty() {
            println!("No secrets found.");
        }
        for secret in secrets {
            println!(
                "  {:<9} {}={}",
                scope_label(&secret.scope),
                secret.name,
                secret.value.as_str()
            );
        }
    } else {
        let records = client.get_secrets(workspace_id, environment).await?;
        if records.is_empty() {
            println!("No secrets found.");
        }
        for record in records {
            println!("  {:<9} {}", scope_label(record.scope()), record.name());
        }
    }
    Ok(())
}

fn scope_label(scope: &SecretScope) -> &'static str {
    scope.visibility().as_str()
}

pub async fn cmd_secret_delete(
    ctx: &Context,
    workspace_id: &WorkspaceId,
    environment: Environment,
    name: &str,
    personal: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    client
        .delete_secret(workspace_id, environment, name, visibility(personal))
        .await?;

    println!("✓ Secret '{}' deleted", name);
    Ok(())
}

/// `share` moves personal → shared, `unshare` shared → personal.
pub async fn cmd_secret_visibility(
    ctx: &Context,
    workspace_id: &WorkspaceId,
    environment: Environment,
    name: &str,
    share: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.client().await?;
    let (from, to) = if share {
        (Visibility::Personal, Visibility::Shared)
    } else {
        (Visibility::Shared, Visibility::Personal)
    };
    client
        .change_visibility(workspace_id, environment, name, from, to)
        .await?;

    println!("✓ Secret '{}' is now {}", name, to);
    Ok(())
}
