use clap::Parser;
use std::path::PathBuf;

use ircd_core::config::{ConfigLifecycle, ConfigSource};
use ircd_core::constants::DEFAULT_CONFIG_PATH;

/// ircd-confcheck: validate a server configuration without starting the daemon.
///
/// Parses the file (following includes), builds the snapshot and runs every
/// cross-reference check. All problems are printed with file:line.
#[derive(Parser, Debug)]
#[command(name = "ircd-confcheck", version, about = "Validate an ircd configuration file")]
struct Cli {
    /// Path to the configuration file
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the derived values of a valid configuration
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let source = match ConfigSource::from_path(&cli.config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };
    let lifecycle = match ConfigLifecycle::startup(&source) {
        Ok(l) => l,
        Err(errors) => {
            eprintln!("{}: {} error(s)", source.name(), errors.len());
            for e in &errors {
                eprintln!("  {}", e);
            }
            std::process::exit(1);
        }
    };
    let config = lifecycle.current();
    println!("{}: OK", source.name());
    if cli.verbose {
        let server = config.server();
        println!("server:   {} ({}) on {}", server.name, server.sid, server.network);
        println!("classes:  {}", config.classes().map(|c| c.name.as_str()).collect::<Vec<_>>().join(" "));
        println!("opers:    {}", config.opers().map(|o| o.name.as_str()).collect::<Vec<_>>().join(" "));
        println!("limits:   {:?}", config.limits());
        if !config.disabled().commands.is_empty() {
            println!("disabled: {}", config.disabled().commands.join(" "));
        }
    }
}
