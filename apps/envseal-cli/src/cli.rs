use clap::{Parser, Subcommand};
use envseal_storage::{Environment, IntegrationId, PrincipalId, WorkspaceId};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "envseal")]
#[command(about = "End-to-end encrypted environment secrets")]
pub struct Cli {
    /// Path to the client config file (defaults to ~/.envseal/config.json)
    #[arg(long, env = "ENVSEAL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite store URL, overriding the config file
    #[arg(long, env = "ENVSEAL_STORE", global = true)]
    pub store: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a local identity and publish its public key
    Init {
        /// Principal (device) name
        #[arg(long)]
        name: String,
    },
    /// Show the current principal
    Whoami,
    /// Workspace commands
    Workspace {
        #[command(subcommand)]
        workspace_cmd: WorkspaceCommand,
    },
    /// Membership commands
    Member {
        #[command(subcommand)]
        member_cmd: MemberCommand,
    },
    /// Secret commands
    Secret {
        #[command(subcommand)]
        secret_cmd: SecretCommand,
    },
    /// Integration commands
    Integration {
        #[command(subcommand)]
        integration_cmd: IntegrationCommand,
    },
    /// Decrypt an environment and deliver it to its active integrations
    Push {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        #[arg(long, short = 'e')]
        environment: Environment,
    },
}

#[derive(Subcommand)]
pub enum WorkspaceCommand {
    /// Create a workspace and its key
    Create {
        /// Use this id instead of generating one
        #[arg(long)]
        id: Option<WorkspaceId>,
    },
    /// List the wrapped key records of a workspace
    Keys {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
    },
    /// Check whether the current principal can unlock the workspace key
    Check {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
    },
}

#[derive(Subcommand)]
pub enum MemberCommand {
    /// Grant a principal access to the workspace key
    Add {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        /// Principal to onboard
        principal: PrincipalId,
        /// Register this hex X25519 public key for the principal first
        #[arg(long)]
        public_key: Option<String>,
        /// Display name used when registering
        #[arg(long, default_value = "member")]
        name: String,
    },
    /// Revoke a principal's access and delete their personal secrets
    Remove {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        principal: PrincipalId,
    },
}

#[derive(Subcommand)]
pub enum SecretCommand {
    /// Set a secret
    Set {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        #[arg(long, short = 'e')]
        environment: Environment,
        name: String,
        value: String,
        /// Only visible to you
        #[arg(long)]
        personal: bool,
    },
    /// Print a secret's effective value
    Get {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        #[arg(long, short = 'e')]
        environment: Environment,
        name: String,
    },
    /// List secrets visible to you
    List {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        #[arg(long, short = 'e')]
        environment: Environment,
        /// Also print decrypted values
        #[arg(long)]
        reveal: bool,
    },
    /// Delete a secret
    Delete {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        #[arg(long, short = 'e')]
        environment: Environment,
        name: String,
        #[arg(long)]
        personal: bool,
    },
    /// Turn your personal secret into a shared one
    Share {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        #[arg(long, short = 'e')]
        environment: Environment,
        name: String,
    },
    /// Turn a shared secret into your personal one
    Unshare {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        #[arg(long, short = 'e')]
        environment: Environment,
        name: String,
    },
}

#[derive(Subcommand)]
pub enum IntegrationCommand {
    /// Authorize a sink for one environment
    Add {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        #[arg(long, short = 'e')]
        environment: Environment,
        /// Sink provider (e.g. dotenv)
        #[arg(long)]
        provider: String,
        /// Provider-specific destination (for dotenv, a file path)
        #[arg(long)]
        target: String,
    },
    /// List integrations of a workspace
    List {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
    },
    /// Resume pushes to an integration
    Enable {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        id: IntegrationId,
    },
    /// Pause pushes to an integration
    Disable {
        #[arg(long, short = 'w')]
        workspace: WorkspaceId,
        id: IntegrationId,
    },
}
