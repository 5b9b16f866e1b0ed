mod cli;

use std::path::Path;

use anyhow::Context;
use clap::Parser;

use cli::{Cli, Command, SourceArg, DEFAULT_CONFIG_FILE};
use devcert_mkcert::{Mkcert, MkcertOptions, OptionsBuilder, ProvisionOutcome, SourceKind};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => cli.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    // Hold the non-blocking guards for the lifetime of main so logs flush on exit.
    let _log_guards = init_logging(level, cli.log_file.as_deref())?;

    if let Command::Version = cli.command {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "platform": std::env::consts::OS,
                })
            );
        } else {
            println!("devcert {}", env!("CARGO_PKG_VERSION"));
        }
        return Ok(());
    }

    let options = resolve_options(&cli)?;
    tracing::debug!(
        save_path = %options.save_path.display(),
        source = %options.source,
        auto_upgrade = options.auto_upgrade,
        "Options resolved"
    );
    let mut mkcert = Mkcert::create(options);

    match &cli.command {
        Command::Install { hosts } => {
            let (outcome, _certificate) = mkcert
                .start(hosts.as_slice())
                .context("certificate generation failed")?;
            if let Some(outcome) = &outcome {
                report_outcome(outcome);
            }
            print_paths(&mkcert, cli.json);
        }
        Command::Init => {
            let outcome = mkcert.init()?;
            report_outcome(&outcome);
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "outcome": format!("{outcome:?}"),
                        "binary": mkcert.binary().map(|p| p.display().to_string()),
                    })
                );
            } else {
                match mkcert.binary() {
                    Some(path) => println!("mkcert: {}", path.display()),
                    None => println!("mkcert: not installed"),
                }
            }
        }
        Command::Show => {
            mkcert
                .install::<&str>(&[])
                .context("no certificate has been generated yet")?;
            print_paths(&mkcert, cli.json);
        }
        Command::Caroot => {
            let root = mkcert.ca_root()?;
            println!("{}", root.display());
        }
        Command::Status => print_status(&mkcert, cli.json)?,
        Command::Version => {}
    }

    Ok(())
}

/// Defaults, then the options file, then CLI flags.
fn resolve_options(cli: &Cli) -> anyhow::Result<MkcertOptions> {
    let base = match &cli.config {
        Some(path) => MkcertOptions::from_toml_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            MkcertOptions::from_toml_file(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("reading {DEFAULT_CONFIG_FILE}"))?
        }
        None => MkcertOptions::default(),
    };

    let mut builder = OptionsBuilder::new(base);
    if let Some(path) = &cli.save_path {
        builder = builder.save_path(path);
    }
    if let Some(path) = &cli.mkcert_path {
        builder = builder.mkcert_path(path);
    }
    if let Some(source) = cli.source {
        builder = builder.source(match source {
            SourceArg::Github => SourceKind::Github,
            SourceArg::Coding => SourceKind::Coding,
        });
    }
    if cli.auto_upgrade {
        builder = builder.auto_upgrade(true);
    }
    if cli.force {
        builder = builder.force(true);
    }
    if let Some(name) = &cli.key_file_name {
        builder = builder.key_file_name(name);
    }
    if let Some(name) = &cli.cert_file_name {
        builder = builder.cert_file_name(name);
    }
    Ok(builder.build())
}

fn report_outcome(outcome: &ProvisionOutcome) {
    match outcome {
        ProvisionOutcome::Installed { version } => eprintln!("Installed mkcert {version}"),
        ProvisionOutcome::Upgraded { from, to } => eprintln!(
            "Upgraded mkcert {} -> {to}",
            from.as_deref().unwrap_or("unknown")
        ),
        ProvisionOutcome::BreakingUpgradeDeferred { current, latest } => eprintln!(
            "mkcert {latest} is available but changes major version (installed: {}); not upgrading",
            current.as_deref().unwrap_or("unknown")
        ),
        ProvisionOutcome::LocalBinaryMissing { path } => {
            eprintln!("mkcert not found at {}", path.display())
        }
        ProvisionOutcome::SourceUnavailable
        | ProvisionOutcome::Ready
        | ProvisionOutcome::UpToDate { .. } => {}
    }
}

fn print_paths(mkcert: &Mkcert, json: bool) {
    let key = mkcert.key_path();
    let cert = mkcert.cert_path();
    if json {
        println!(
            "{}",
            serde_json::json!({
                "key": key.display().to_string(),
                "cert": cert.display().to_string(),
            })
        );
    } else {
        println!("key:  {}", key.display());
        println!("cert: {}", cert.display());
    }
}

fn print_status(mkcert: &Mkcert, json: bool) -> anyhow::Result<()> {
    let state_path = devcert_mkcert::StateFile::default_path(&mkcert.options().save_path);
    let state = devcert_mkcert::StateFile::init(&state_path)
        .with_context(|| format!("reading {}", state_path.display()))?;
    let binary = mkcert.binary();
    let hosts: Vec<&str> = state
        .record()
        .map(|r| r.hosts.iter().map(String::as_str).collect())
        .unwrap_or_default();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "binary": binary.map(|p| p.display().to_string()),
                "version": state.version(),
                "hosts": hosts,
                "generated_at": state.record().and_then(|r| r.generated_at),
            })
        );
    } else {
        match binary {
            Some(path) => println!(
                "mkcert:  {} ({})",
                path.display(),
                state.version().unwrap_or("version unknown")
            ),
            None => println!("mkcert:  not installed"),
        }
        if hosts.is_empty() {
            println!("hosts:   no certificate generated");
        } else {
            println!("hosts:   {}", hosts.join(" "));
        }
    }
    Ok(())
}

/// Dependencies that stay at `warn` unless a directive names them.
const QUIET_TARGETS: [&str; 2] = ["ureq", "rustls"];

/// Filter directives for `level` (from `--log-level`, `-v` or `DEVCERT_LOG`).
///
/// A bare level like `debug` is applied to devcert only; HTTP client chatter
/// stays at `warn`. Anything containing a target directive is used as-is.
fn log_directives(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        return "info".to_string();
    }
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let mut directives = level.to_string();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    directives
}

fn init_logging(
    level: &str,
    log_file: Option<&Path>,
) -> anyhow::Result<Vec<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_new(log_directives(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut guards = Vec::with_capacity(2);
    let (nb_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(stderr_guard);
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(nb_stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let (nb_file, file_guard) = tracing_appender::non_blocking(file);
            guards.push(file_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(nb_file),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guards)
}
