use clap::Parser;
use crowdsale_desk::{start_app, AppArgs};
use dotenv::dotenv;
use eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = AppArgs::parse();

    // Load environment variables
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Start the application
    let rocket = start_app(args).await?;

    // Launch the web server
    let _ = rocket.launch().await?;

    Ok(())
}
