use crate::cli::Cli;
use crate::config::EngineConfig;
use crate::error::Result;

/// Per-invocation state shared by the commands.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: EngineConfig,
    pub json: bool,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self {
            config: EngineConfig::load(cli.config.as_deref())?,
            json: cli.json,
            verbosity: cli.verbose,
        })
    }
}
