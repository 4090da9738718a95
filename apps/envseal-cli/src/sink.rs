use std::io::Write;
use std::path::Path;

use envseal_core::{PlainSecrets, SinkError, SinkTransport};
use envseal_storage::IntegrationAuthorization;

/// Writes `KEY="value"` lines to the integration's target file.
pub struct DotenvSink;

/// Double-quoted dotenv value with backslash, quote, and newline escaped.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn render(secrets: &PlainSecrets) -> String {
    let mut out = String::new();
    for (name, value) in secrets {
        out.push_str(name);
        out.push('=');
        out.push_str(&quote(value));
        out.push('\n');
    }
    out
}

fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl SinkTransport for DotenvSink {
    async fn deliver(
        &self,
        integration: &IntegrationAuthorization,
        secrets: &PlainSecrets,
    ) -> Result<(), SinkError> {
        if integration.target.trim().is_empty() {
            return Err(SinkError::Rejected("dotenv target path is empty".into()));
        }
        let path = integration.target.clone();
        let contents = render(secrets);
        tokio::task::spawn_blocking(move || write_private(Path::new(&path), &contents))
            .await
            .map_err(|e| SinkError::Rejected(e.to_string()))??;
        Ok(())
    }
}
