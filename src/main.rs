use std::error::Error;
use std::io;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use admin_panel::cli::{Cli, Commands, CryptoCommands, ExportCommands, UserCommands};
use admin_panel::client::ApiClient;
use admin_panel::config::Config;
use admin_panel::decoder::Decoder;
use admin_panel::error::Result;
use admin_panel::session::{FileTokenStore, MemoryTokenStore, TokenStore};
use admin_panel::{commands, output};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");

        // Show error chain if verbose flag was passed
        if std::env::args().any(|arg| arg == "--verbose" || arg == "-v") {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = cause.source();
            }
        }

        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries command output only.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("admin_panel=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("admin_panel=warn"))
    };

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(io::stderr))
            .init();
    }
}

/// The persisted token store, or an in-memory one when there is nowhere to
/// persist.
fn token_store() -> Arc<dyn TokenStore> {
    match FileTokenStore::load() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "token file unavailable, using in-memory session");
            Arc::new(MemoryTokenStore::default())
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Set global output format
    output::set_format(cli.output_format());
    output::set_quiet(cli.quiet);

    match cli.command {
        // Commands that don't require config/client
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "admin", &mut io::stdout());
        }
        Commands::Init => {
            commands::init::run().await?;
        }
        Commands::Login { token } => {
            commands::session::login(&token)?;
        }
        Commands::Logout => {
            commands::session::logout()?;
        }
        // Commands that require config and client
        command => {
            let config = Config::load()?;
            let client = ApiClient::new(&config, token_store())?;

            match command {
                Commands::Users { action } => match action {
                    UserCommands::List(args) => {
                        commands::users::list(&client, &config, args).await?;
                    }
                    UserCommands::Show { id } => {
                        commands::users::show(&client, &id).await?;
                    }
                    UserCommands::Create(args) => {
                        commands::users::create(&client, &config, args).await?;
                    }
                    UserCommands::Update(args) => {
                        commands::users::update(&client, &config, args).await?;
                    }
                    UserCommands::Delete { id, yes } => {
                        commands::users::delete(&client, &config, &id, yes).await?;
                    }
                },
                Commands::Stats => {
                    commands::stats::stats(&client).await?;
                }
                Commands::Chart { days } => {
                    commands::stats::chart(&client, days).await?;
                }
                Commands::Dashboard { days } => {
                    commands::stats::dashboard(&client, days).await?;
                }
                Commands::Export { action } => {
                    let decoder = Decoder::new(config.ensure_schema()?);
                    match action {
                        ExportCommands::Json(args) => {
                            commands::export::json(&client, &config, &decoder, args).await?;
                        }
                        ExportCommands::Binary(args) => {
                            commands::export::binary(&client, &config, &decoder, args).await?;
                        }
                        ExportCommands::Decode => {
                            commands::export::decode(&client, &config, &decoder).await?;
                        }
                    }
                }
                Commands::Crypto { action } => match action {
                    CryptoCommands::PublicKey => {
                        commands::crypto::public_key(&client).await?;
                    }
                    CryptoCommands::Verify { data, signature } => {
                        commands::crypto::verify(&client, &data, &signature).await?;
                    }
                },
                Commands::Health => {
                    commands::health::check(&client).await?;
                }
                Commands::Completions { .. }
                | Commands::Init
                | Commands::Login { .. }
                | Commands::Logout => {
                    // Already handled above
                }
            }
        }
    }

    Ok(())
}
