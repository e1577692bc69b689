use std::{convert::TryFrom, path::PathBuf};

use anyhow::{anyhow, Context};
use clap::Parser;
use dir_trust::TrustPolicyBuilder;
use serde::Deserialize;

#[derive(Debug, Parser)]
pub(super) struct Global {
    /// Specify which config file(s) to read.
    #[clap(
        short = 'c',
        long = "config_file",
        value_name("FILE"),
        multiple_occurrences(true),
        number_of_values(1)
    )]
    files: Vec<PathBuf>,

    /// Override config file parameters, using TOML-like syntax.
    #[clap(
        short,
        multiple_occurrences(true),
        number_of_values(1),
        value_name("KEY=VALUE")
    )]
    options: Vec<String>,
}

/// Everything we read from configuration files and overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CliConfig {
    /// How to log.
    pub(super) logging: LoggingConfig,
    /// Which directories to trust.
    pub(super) policy: TrustPolicyBuilder,
}

/// Logging configuration options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub(super) struct LoggingConfig {
    /// Filtering directives that determine tracing levels as described at
    /// <https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/filter/struct.EnvFilter.html>
    ///
    /// You can override this setting with the `-l`, `--log-level` command line
    /// parameter.
    pub(super) trace_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        // Verdicts go to stdout already; only tell people about trouble.
        LoggingConfig {
            trace_filter: "warn".into(),
        }
    }
}

impl TryFrom<Global> for CliConfig {
    type Error = anyhow::Error;
    fn try_from(config: Global) -> anyhow::Result<CliConfig> {
        let config_files = config
            .files
            .into_iter()
            // The second value in this 2-tuple specifies whether the config file is "required" (as in,
            // failure to load it is an error). All config files that aren't the default are required.
            .map(|p| (p, true))
            // try and load the default config file, but don't fail if it's missing
            .chain(default_config_file().map(|p| (p, false)));

        load(config_files, &config.options)
    }
}

/// Return the location of the default configuration file, if we can find a
/// configuration directory.
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dir-trust").join("config.toml"))
}

/// Read `files` in order, then apply the `KEY=VALUE` `options`.
///
/// Later sources override earlier ones.
pub(super) fn load<I>(files: I, options: &[String]) -> anyhow::Result<CliConfig>
where
    I: IntoIterator<Item = (PathBuf, bool)>,
{
    let mut builder = config::Config::builder();
    for (path, required) in files {
        builder = builder.add_source(
            config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(required),
        );
    }
    for option in options {
        builder = builder.add_source(config::File::from_str(
            &option_to_toml(option)?,
            config::FileFormat::Toml,
        ));
    }

    builder
        .build()
        .context("Unable to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

/// Turn a `KEY=VALUE` command-line option into a line of TOML.
///
/// A value that isn't valid TOML on its own is taken as a string, so that
/// `policy.stop_at=/srv/data` works without quotes.
fn option_to_toml(option: &str) -> anyhow::Result<String> {
    let (key, value) = option
        .split_once('=')
        .ok_or_else(|| anyhow!("Option {:?} is not of the form KEY=VALUE", option))?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() {
        return Err(anyhow!("Option {:?} has an empty key", option));
    }

    let line = format!("{} = {}", key, value);
    if line.parse::<toml::Value>().is_ok() {
        Ok(line)
    } else {
        Ok(format!("{} = {}", key, toml::Value::String(value.into())))
    }
}
