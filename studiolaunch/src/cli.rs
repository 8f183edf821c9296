use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use studiolaunch_core::config::LaunchOverrides;

/// studiolaunch - provision and run Label Studio behind a platform application proxy
#[derive(Parser, Debug)]
#[command(name = "studiolaunch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub launch: LaunchArgs,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Install if needed, migrate, and run the server (default)
    Run,

    /// Show resolved configuration and setup state without changing anything
    Plan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for values otherwise read from the platform environment.
#[derive(Args, Debug, Clone, Default)]
pub struct LaunchArgs {
    /// Application subdomain; must match the name in the platform's App menu (default: $MY_SUBDOMAIN)
    #[arg(long, global = true, value_name = "NAME")]
    pub subdomain: Option<String>,

    /// Base directory for the venv and data directory (default: $HOME)
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Port to bind on 127.0.0.1 (default: $CDSW_READONLY_PORT or 8100)
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Platform domain used for the access URL and CSRF origin (default: $CDSW_DOMAIN)
    #[arg(long, global = true)]
    pub domain: Option<String>,

    /// Do not merge ./.env into the environment
    #[arg(long, global = true, env = "STUDIOLAUNCH_NO_DOTENV")]
    pub no_dotenv: bool,
}

impl LaunchArgs {
    pub fn overrides(&self) -> LaunchOverrides {
        LaunchOverrides {
            subdomain: self.subdomain.clone(),
            home: self.home.clone(),
            port: self.port,
            domain: self.domain.clone(),
        }
    }
}
