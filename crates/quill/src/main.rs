// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quill - client for a collaborative research-paper platform.
//!
//! This is the binary entry point for the Quill client.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod shell;

/// Quill - client for a collaborative research-paper platform.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an interactive assistant session on a channel.
    Shell {
        /// Project id.
        #[arg(long)]
        project: String,
        /// Discussion channel id.
        #[arg(long)]
        channel: String,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match quill_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            quill_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.client.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Shell { project, channel }) => {
            if let Err(e) = shell::run(config, project, channel).await {
                eprintln!("quill shell: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("quill config: failed to render: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("quill: use --help for available commands");
        }
    }
}
