//! Binary entry point: load config, open storage, start the server.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = primitives::Config::load(config_path.as_deref())?;

    let store = storage::Store::open(std::path::Path::new(&config.data_dir)).await?;
    let server_keypair = crypto::Keypair::generate();
    let bind_addr = config.bind_addr.clone();

    let registry = std::sync::Arc::new(server::Registry::open(store, server_keypair, config)?);
    server::serve(&bind_addr, registry).await
}
