use crate::config::Provider;
use clap::{CommandFactory, Parser};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// Command-line interface definition for ged.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ged")]
#[command(about = "Send a prompt script plus some text to Gemini or ChatGPT", long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Display version information and exit
    #[arg(long)]
    pub version: bool,

    /// Create the config file with blank values (does nothing if it already exists)
    #[arg(long)]
    pub configure: bool,

    /// Use this provider instead of DefaultUseService from the config file
    #[arg(long, value_enum, value_name = "PROVIDER")]
    pub provider: Option<Provider>,

    /// Override the model identifier sent to the provider
    #[arg(long, value_name = "ID", allow_hyphen_values = true)]
    pub model: Option<String>,

    /// Read and write the config file at this path instead of the per-user default
    #[arg(long, value_name = "PATH", allow_hyphen_values = true)]
    pub config: Option<PathBuf>,

    /// Prompt script placed before the text
    pub script: Option<String>,

    /// File holding the text; the first line of standard input is used when omitted
    pub file: Option<PathBuf>,
}

/// Profile that takes the Gemini key from `API_KEY` instead of the config file.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ged-lite")]
#[command(about = "Send a prompt script plus some text to Gemini, keyed by $API_KEY", long_about = None)]
#[command(disable_version_flag = true)]
pub struct LiteCli {
    /// Display version information and exit
    #[arg(long)]
    pub version: bool,

    /// Override the model identifier sent to Gemini
    #[arg(long, value_name = "ID", allow_hyphen_values = true)]
    pub model: Option<String>,

    /// Prompt script placed before the text
    pub script: Option<String>,

    /// File holding the text; the first line of standard input is used when omitted
    pub file: Option<PathBuf>,
}

const LEGACY_FLAGS: [(&str, &str); 2] = [("-version", "--version"), ("-configure", "--configure")];

/// Options whose next token is their value, across `Cli` and `LiteCli`.
const VALUE_OPTIONS: [&str; 3] = ["--provider", "--model", "--config"];

/// Rewrites the single-dash `-version` / `-configure` spellings into the
/// long forms clap understands. Option values (`--model -version`) and
/// anything after a `--` terminator are passed through untouched.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut seen_terminator = false;
    let mut expects_value = false;
    args.into_iter()
        .map(|arg| {
            let arg: OsString = arg.into();
            if seen_terminator {
                return arg;
            }
            if expects_value {
                expects_value = false;
                return arg;
            }
            if arg.as_os_str() == OsStr::new("--") {
                seen_terminator = true;
                return arg;
            }
            if VALUE_OPTIONS
                .iter()
                .any(|option| arg.as_os_str() == OsStr::new(option))
            {
                expects_value = true;
                return arg;
            }
            LEGACY_FLAGS
                .iter()
                .find(|(legacy, _)| arg.as_os_str() == OsStr::new(legacy))
                .map(|(_, long)| OsString::from(*long))
                .unwrap_or(arg)
        })
        .collect()
}

pub fn usage() -> String {
    Cli::command().render_usage().to_string()
}

pub fn lite_usage() -> String {
    LiteCli::command().render_usage().to_string()
}
