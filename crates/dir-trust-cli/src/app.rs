//! Defines the command line interface for dir-trust

#![allow(clippy::missing_docs_in_private_items)]

use std::convert::TryInto;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod check;
use check::Check;
mod config;
use config::CliConfig;

mod logging;

/// Entrypoint to the dir-trust CLI
#[derive(Debug, Parser)]
#[clap(version)]
pub(crate) struct App {
    #[clap(flatten)]
    config: config::Global,

    /// Override the log level
    ///
    /// usually one of 'trace', 'debug', 'info', 'warn', 'error'.
    #[clap(short, long)]
    log_level: Option<EnvFilter>,

    #[clap(subcommand)]
    subcommand: SubCommand,
}

/// CLI subcommands
#[derive(Debug, Parser)]
enum SubCommand {
    Check(Check),
}

impl App {
    /// Run the selected subcommand.
    ///
    /// Return false if any path turned out to be insecure.
    pub(crate) fn run(self) -> anyhow::Result<bool> {
        let config: CliConfig = self.config.try_into()?;

        logging::setup(&config.logging, self.log_level);

        let policy = config
            .policy
            .build()
            .context("Invalid policy configuration")?;

        match self.subcommand {
            SubCommand::Check(command) => command.run(policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use test_case::test_case;

    use super::App;

    #[test_case(&["dir-trust", "check", "/srv"] ; "basic")]
    #[test_case(&["dir-trust", "check", "--file", "/srv/key", "/srv/cert"] ; "files")]
    #[test_case(&["dir-trust", "-c", "some-file", "check", "/srv"] ; "config file")]
    #[test_case(&["dir-trust", "-c", "some-file", "-c", "other-file", "check", "/srv"] ; "multiple config files")]
    #[test_case(&["dir-trust", "-o", "policy.trust_group=7", "-l", "debug", "check", "/srv"] ; "overrides")]
    fn parse(input: &[&str]) {
        App::try_parse_from(input).expect("invalid input");
    }

    #[test_case(&["dir-trust"] ; "no subcommand")]
    #[test_case(&["dir-trust", "check"] ; "no paths")]
    #[test_case(&["dir-trust", "check", "--frobnicate", "/srv"] ; "unknown flag")]
    fn reject(input: &[&str]) {
        assert!(App::try_parse_from(input).is_err());
    }
}
