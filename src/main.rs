// Entrypoint for the CLI application.
// - Installs a `tracing` subscriber filtered by `RUST_LOG` (default `warn`).
// - Builds the CMS client from `CMS_*` variables and hands it to the menu.

use cms_client::{api::CmsClient, ui::main_menu};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // CMS_URL defaults to http://localhost:1337; CMS_API_TOKEN is required.
    // See `config::ClientConfig::from_env`.
    let api = CmsClient::from_env()?;

    main_menu(api).await?;
    Ok(())
}
