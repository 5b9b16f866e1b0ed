use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "devcert.toml";

/// Hosts issued when `install` is given none.
pub const DEFAULT_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

#[derive(Parser, Debug)]
#[command(name = "devcert", version, about = "Trusted local TLS certificates for dev servers")]
pub struct Cli {
    /// Options file (default: ./devcert.toml when present)
    #[arg(long, env = "DEVCERT_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for the managed mkcert, state and certificates
    #[arg(long, env = "DEVCERT_DATA_DIR", value_name = "DIR", global = true)]
    pub save_path: Option<PathBuf>,

    /// Use this mkcert binary instead of downloading one
    #[arg(long, env = "DEVCERT_MKCERT_PATH", value_name = "PATH", global = true)]
    pub mkcert_path: Option<PathBuf>,

    /// Where to look for mkcert releases
    #[arg(long, env = "DEVCERT_SOURCE", global = true)]
    pub source: Option<SourceArg>,

    /// Check for a newer mkcert even when one is installed
    #[arg(long, global = true)]
    pub auto_upgrade: bool,

    /// Regenerate the certificate even if it looks current
    #[arg(long, global = true)]
    pub force: bool,

    /// Key file name inside <save-path>/certs
    #[arg(long, value_name = "NAME", global = true)]
    pub key_file_name: Option<String>,

    /// Certificate file name inside <save-path>/certs
    #[arg(long, value_name = "NAME", global = true)]
    pub cert_file_name: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "DEVCERT_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to file (in addition to stderr)
    #[arg(long, env = "DEVCERT_LOG_FILE", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision mkcert and make sure a certificate for HOSTS exists
    Install {
        /// Hostnames and IPs the certificate must cover
        #[arg(default_values_t = DEFAULT_HOSTS.map(String::from))]
        hosts: Vec<String>,
    },
    /// Provision mkcert only
    Init,
    /// Print the existing certificate paths without regenerating
    Show,
    /// Print mkcert's CA root directory
    Caroot,
    /// Show installed mkcert version and the recorded certificate hosts
    Status,
    /// Show version information
    Version,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceArg {
    Github,
    Coding,
}
