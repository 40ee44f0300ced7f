// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maddy - a conversational assistant with long-term memory.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shell;

use clap::{Parser, Subcommand};

/// Maddy - a conversational assistant with long-term memory.
#[derive(Parser, Debug)]
#[command(name = "maddy", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP chat gateway.
    Serve,
    /// Chat in the terminal over a single session.
    Shell,
    /// Validate configuration and print the effective values.
    Config {
        /// Only validate; print nothing on success.
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match maddy_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            maddy_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Shell) => shell::run_shell(config).await,
        Some(Commands::Config { check }) => {
            if check {
                eprintln!("maddy: config is valid");
                Ok(())
            } else {
                match maddy_config::render_effective(&config) {
                    Ok(rendered) => {
                        print!("{rendered}");
                        Ok(())
                    }
                    Err(e) => Err(maddy_core::MaddyError::Config(format!(
                        "failed to render config: {e}"
                    ))),
                }
            }
        }
        None => {
            println!("maddy: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["maddy", "config", "--check"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Config { check: true })));

        let cli = Cli::try_parse_from(["maddy", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = maddy_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.agent.name, "MaddyBot");
        assert_eq!(config.gateway.port, 5000);
    }
}
