use envseal_config::PrincipalConfig;
use envseal_core::{Client, Identity};

use crate::context::Context;

pub async fn cmd_init(ctx: &Context, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ctx.load_or_default_config()?;
    let principal = PrincipalConfig::generate(name);
    let identity = Identity::new(principal.principal_id()?, principal.keypair()?);
    config.add_principal(principal.clone())?;

    let store = ctx.open_store(&config).await?;
    Client::new(store, identity).register_self(name).await?;
    ctx.save_config(&config)?;

    println!("✓ Principal '{}' created", name);
    println!("  ID:         {}", principal.id);
    println!("  Public key: {}", principal.public_key);
    Ok(())
}

pub async fn cmd_whoami(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let config = ctx.load_config()?;
    let principal = config.current_principal()?;

    println!("Name:       {}", principal.name);
    println!("ID:         {}", principal.id);
    println!("Public key: {}", principal.public_key);
    Ok(())
}
