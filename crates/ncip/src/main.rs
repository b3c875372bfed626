use crate::config::{BackendKind, ConnectorConfig};
use crate::prelude::{eprintln, *};
use clap::Parser;
use std::path::PathBuf;

mod aleph;
mod backend;
mod config;
mod error;
mod koha;
mod lookup_request;
mod lookup_user;
mod prelude;
mod service;
mod stdio;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "NCIP Lookup User and Lookup Request connectors for Aleph and Koha"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// TOML configuration file (environment variables are used when omitted)
    #[clap(long, env = "NCIP_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Backend override
    #[clap(long, global = true, value_enum)]
    backend: Option<BackendKind>,

    /// Default agency id override
    #[clap(long, global = true)]
    agency: Option<String>,

    /// Whether to display additional information.
    #[clap(long, env = "NCIP_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

impl Global {
    /// Load the connector configuration and apply the CLI overrides
    pub fn load_config(&self) -> Result<ConnectorConfig> {
        let config = ConnectorConfig::load(self.config.as_deref())?
            .with_overrides(self.backend, self.agency.clone());

        if self.verbose {
            eprintln!(
                "Backend: {} (agency {}, currency {}/{})",
                config.backend,
                config.default_agency_id,
                config.currency.code,
                config.currency.minor_unit
            );
        }

        Ok(config)
    }
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Look up a patron, or verify patron credentials
    LookupUser(crate::lookup_user::LookupUserOptions),

    /// Look up a hold by request id, or by item and user
    LookupRequest(crate::lookup_request::LookupRequestOptions),

    /// Serve line-delimited JSON initiation messages on stdin/stdout
    Stdio,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::LookupUser(options) => crate::lookup_user::run(options, app.global).await,
        SubCommands::LookupRequest(options) => {
            crate::lookup_request::run(options, app.global).await
        }
        SubCommands::Stdio => crate::stdio::run(app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
