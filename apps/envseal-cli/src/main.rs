mod cli;
mod commands;
mod context;
mod sink;

use clap::Parser;
use cli::{Cli, Command, IntegrationCommand, MemberCommand, SecretCommand, WorkspaceCommand};
use commands::*;
use context::Context;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context::new(cli.config, cli.store);

    match cli.command {
        Command::Init { name } => cmd_init(&ctx, &name).await?,
        Command::Whoami => cmd_whoami(&ctx).await?,
        Command::Workspace { workspace_cmd } => match workspace_cmd {
            WorkspaceCommand::Create { id } => cmd_workspace_create(&ctx, id).await?,
            WorkspaceCommand::Keys { workspace } => cmd_workspace_keys(&ctx, &workspace).await?,
            WorkspaceCommand::Check { workspace } => cmd_workspace_check(&ctx, &workspace).await?,
        },
        Command::Member { member_cmd } => match member_cmd {
            MemberCommand::Add {
                workspace,
                principal,
                public_key,
                name,
            } => {
                cmd_member_add(&ctx, &workspace, &principal, public_key.as_deref(), &name).await?
            }
            MemberCommand::Remove {
                workspace,
                principal,
            } => cmd_member_remove(&ctx, &workspace, &principal).await?,
        },
        Command::Secret { secret_cmd } => match secret_cmd {
            SecretCommand::Set {
                workspace,
                environment,
                name,
                value,
                personal,
            } => cmd_secret_set(&ctx, &workspace, environment, &name, &value, personal).await?,
            SecretCommand::Get {
                workspace,
                environment,
                name,
            } => cmd_secret_get(&ctx, &workspace, environment, &name).await?,
            SecretCommand::List {
                workspace,
                environment,
                reveal,
            } => cmd_secret_list(&ctx, &workspace, environment, reveal).await?,
            SecretCommand::Delete {
                workspace,
                environment,
                name,
                personal,
            } => cmd_secret_delete(&ctx, &workspace, environment, &name, personal).await?,
            SecretCommand::Share {
                workspace,
                environment,
                name,
            } => cmd_secret_visibility(&ctx, &workspace, environment, &name, true).await?,
            SecretCommand::Unshare {
                workspace,
                environment,
                name,
            } => cmd_secret_visibility(&ctx, &workspace, environment, &name, false).await?,
        },
        Command::Integration { integration_cmd } => match integration_cmd {
            IntegrationCommand::Add {
                workspace,
                environment,
                provider,
                target,
            } => cmd_integration_add(&ctx, &workspace, environment, &provider, &target).await?,
            IntegrationCommand::List { workspace } => {
                cmd_integration_list(&ctx, &workspace).await?
            }
            IntegrationCommand::Enable { workspace, id } => {
                cmd_integration_set_active(&ctx, &workspace, &id, true).await?
            }
            IntegrationCommand::Disable { workspace, id } => {
                cmd_integration_set_active(&ctx, &workspace, &id, false).await?
            }
        },
        Command::Push {
            workspace,
            environment,
        } => cmd_push(&ctx, &workspace, environment).await?,
    }

    Ok(())
}
