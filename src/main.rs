//! DropMail - Disposable email relay
//!
//! Main entry point for the DropMail CLI.

use clap::{Parser, Subcommand};
use dropmail::config::DropMailConfig;
use dropmail::dispatcher::Dispatcher;
use dropmail::registry;
use dropmail::server::RelayServer;
use std::path::PathBuf;
use std::process;

/// DropMail - stateless relay over public temporary-mail providers
#[derive(Parser, Debug)]
#[command(name = "dropmail")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/dropmail/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP relay (default)
    Serve {
        /// Bind address, e.g. 127.0.0.1:3000
        #[arg(short, long)]
        bind: Option<String>,

        /// Default provider (secmail, mailtm, templol)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Generate one mailbox and print it as JSON
    Generate {
        /// Provider to use (secmail, mailtm, templol)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Print the domains a provider serves
    Domains {
        /// Provider to query (defaults to the configured default)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Probe the default provider and report reachability
    Check,
}

fn parse_provider(raw: Option<&str>) -> Option<registry::ProviderKind> {
    let raw = raw?;
    match registry::lookup_by_hint(raw) {
        Some(kind) => Some(kind),
        None => {
            eprintln!("Unknown provider '{}'", raw);
            process::exit(2);
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = dropmail::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let cli = Cli::parse();

    let mut config = match DropMailConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let command = cli.command.unwrap_or(Commands::Serve {
        bind: None,
        provider: None,
    });

    match command {
        Commands::Serve { bind, provider } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(kind) = parse_provider(provider.as_deref()) {
                config.default_provider = kind;
            }

            let server = match RelayServer::new(&config) {
                Ok(server) => server,
                Err(e) => {
                    eprintln!("Failed to create server: {}", e);
                    process::exit(1);
                }
            };

            if let Err(e) = server.run(&config.bind).await {
                eprintln!("Server failed: {}", e);
                process::exit(1);
            }
        }

        Commands::Generate { provider } => {
            let hint = parse_provider(provider.as_deref());
            let dispatcher = build_dispatcher(&config);

            match dispatcher.generate(hint).await {
                Ok(mailbox) => {
                    let json = serde_json::to_string_pretty(&mailbox)
                        .unwrap_or_else(|_| mailbox.email.clone());
                    println!("{}", json);
                }
                Err(e) => {
                    eprintln!("Generation failed: {}", e);
                    process::exit(1);
                }
            }
        }

        Commands::Domains { provider } => {
            let hint = parse_provider(provider.as_deref());
            let dispatcher = build_dispatcher(&config);

            let (kind, domains) = dispatcher.list_domains(hint).await;
            println!("{}", kind);
            for domain in domains {
                println!("  {}", domain);
            }
        }

        Commands::Check => {
            let dispatcher = build_dispatcher(&config);
            let kind = dispatcher.default_provider();

            let (_, domains) = dispatcher.list_domains(Some(kind)).await;
            println!("{}: {} domains", kind, domains.len());

            match dispatcher.generate(Some(kind)).await {
                Ok(mailbox) => {
                    println!(
                        "generate: ok ({}, confirmed: {})",
                        mailbox.email, mailbox.confirmed
                    );
                }
                Err(e) => {
                    eprintln!("generate: failed ({})", e);
                    process::exit(1);
                }
            }
        }
    }
}

fn build_dispatcher(config: &DropMailConfig) -> Dispatcher {
    match Dispatcher::new(config) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("Failed to build dispatcher: {}", e);
            process::exit(1);
        }
    }
}
