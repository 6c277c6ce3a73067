use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use pipebus_channel::ChannelConfig;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod post;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Post a single message to a topic.
    Post(PostArgs),
    /// Subscribe to topics and print received messages.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Post(args) => post::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Endpoint name.
    pub name: String,
    /// Topic to post under.
    pub topic: String,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Delimiter between topic and payload.
    #[arg(long, default_value = ":")]
    pub delimiter: char,
    /// Retries after the first delivery attempt.
    #[arg(long, default_value = "3")]
    pub retries: u32,
    /// Sleep between delivery attempts (e.g. 50ms, 1s).
    #[arg(long, default_value = "50ms")]
    pub retry_delay: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Endpoint name.
    pub name: String,
    /// Topic to subscribe to (repeatable).
    #[arg(long = "topic", required = true)]
    pub topics: Vec<String>,
    /// Delimiter between topic and payload.
    #[arg(long, default_value = ":")]
    pub delimiter: char,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

pub fn channel_config(delimiter: char, retries: u32, retry_delay: &str) -> CliResult<ChannelConfig> {
    Ok(ChannelConfig {
        delimiter: parse_delimiter(delimiter)?,
        retries,
        retry_delay: parse_duration(retry_delay)?,
        ..ChannelConfig::default()
    })
}

pub fn parse_delimiter(delimiter: char) -> CliResult<u8> {
    if !delimiter.is_ascii() {
        return Err(CliError::new(
            USAGE,
            format!("delimiter must be a single ASCII character, got {delimiter:?}"),
        ));
    }
    Ok(delimiter as u8)
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
