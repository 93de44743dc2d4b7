//! Cashform main entry point

use anyhow::Context;
use cashform_api::{hash_password, start_server};
use cashform_config::{Config, ConfigError};
use clap::Parser;
use std::path::PathBuf;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "cashform")]
#[command(author = "Cashform Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Web forms for recording cash transactions in a Beancount ledger", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,

    /// Print the argon2 hash of PASSWORD for `server.auth.password_hash` and exit
    #[arg(long, value_name = "PASSWORD")]
    hash_password: Option<String>,
}

/// Config from the file, or the built-in defaults when there is no file.
/// The flag says whether the defaults were used.
fn load_config(path: PathBuf) -> anyhow::Result<(Config, bool)> {
    match Config::load(path.clone()) {
        Ok(config) => Ok((config, false)),
        Err(ConfigError::FileNotFound { .. }) => {
            let mut config = Config::from_yaml(Config::generate_default())?;
            config.apply_env_overrides()?;
            config.validate()?;
            Ok((config, true))
        }
        Err(e) => anyhow::bail!("Failed to load configuration from {}\n{}", path.display(), e.to_details()),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }
    if let Some(password) = &args.hash_password {
        let hash = hash_password(password).map_err(|e| anyhow::anyhow!("Could not hash password: {}", e))?;
        println!("{}", hash);
        return Ok(());
    }

    let (config, defaulted) = load_config(args.config.clone())?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str())).init();

    if defaulted {
        log::warn!("Config file {} not found, using defaults", args.config.display());
    }
    log::info!(
        "Config loaded: ledger={}, sync={}",
        config.ledger_path().display(),
        config.sync.mode
    );

    let rt = Runtime::new()?;
    rt.block_on(start_server(config)).context("Server failed")?;
    Ok(())
}
