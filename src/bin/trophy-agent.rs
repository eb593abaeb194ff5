use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use trophy_agent::config::secret::encrypt_with_password;
use trophy_agent::server;
use trophy_agent::utils::config_loader;
use trophy_agent::utils::logging;
use trophy_agent::utils::logging::LogLevel;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "trophy-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Print the `v1:salt:iv:ciphertext:tag` form of a PSN secret
    EncryptSecret {
        #[arg(env = "PSN_TOKEN_PLAIN", hide_env_values = true)]
        secret: String,
        #[arg(env = "PSN_TOKEN_KEY", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command.unwrap_or(Command::Serve) {
        Command::EncryptSecret { secret, password } => {
            if secret.trim().is_empty() || password.is_empty() {
                bail!("both secret and password must be non-empty");
            }
            let encoded = encrypt_with_password(secret.trim(), &password).context("encrypting secret")?;
            println!("{}", encoded);
            Ok(())
        }
        Command::Serve => {
            // -------------------------------
            // 1. Load YAML config
            // -------------------------------
            let service_config = config_loader::run(&args.config).await?;
            logging::run(&service_config, args.log_level).await?;

            // -------------------------------
            // 2. Start http server; stores are built inside and live until shutdown
            // -------------------------------
            info!("Service starting...");
            server::server::start(&service_config).await
        }
    }
}
