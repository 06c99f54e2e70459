use stashlink_core::Config;

// Use mimalloc as the global allocator for lower fragmentation, especially on
// musl-based container images.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage, services, routes)
    let (_state, router) = stashlink_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    stashlink_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
