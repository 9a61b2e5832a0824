use rstage::logger;
use rstage::Config;
use std::env;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init()?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    match env::var("REPLICATE_API_TOKEN") {
        Ok(token) if !token.trim().is_empty() => {
            log::info!("✅ Replicate token found in environment");
            log::debug!(
                "Token starts with: {}...",
                token.chars().take(4).collect::<String>()
            );
        }
        _ => log::warn!("⚠️  REPLICATE_API_TOKEN is not set; only demo mode will work"),
    }

    let config = Config::from_env()?;
    config.validate()?;
    logger::log_config_info(&config);
    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.host,
        config.port_or_default(),
    );

    if let Err(e) = rstage::server::run(config).await {
        log::error!("❌ Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
