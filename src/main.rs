use log::{error, info};

#[tokio::main]
async fn main()
{   env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    let config = match compass::CompassConfig::load()
    {   Ok(config) => config
      , Err(e) => {
          error!("Failed to load configuration: {}", e);
          std::process::exit(2);
        }
    };
    info!(
      "Preferred model {} ({}), attempt timeout {}s",
      config.backend.model,
      config.backend.api_version,
      config.dispatch.attempt_timeout_secs
    );

    if let Err(e) = compass::server::serve(&config).await
    {   error!("Server error: {}", e);
        std::process::exit(1);
    }
}
