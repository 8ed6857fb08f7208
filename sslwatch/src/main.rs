//! sslwatch terminal dashboard
//!
//! An interactive front end to sslwatch-lib: type a domain (or the path of a
//! file of domains), watch certificate checks complete in the background and
//! click a result to see its WHOIS record.

mod tui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::{style, Term};
use sslwatch_lib::{
    load_env_config, parse_timeout_string, CheckConfig, CheckOrchestrator, DomainChecker,
    EnvConfig,
};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

const DEFAULT_CONCURRENCY: usize = 20;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_WHOIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for in-flight checks to notice cancellation on exit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// CLI arguments for sslwatch
#[derive(Parser, Debug)]
#[command(name = "sslwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interactive dashboard for TLS certificate expiry and WHOIS data")]
#[command(
    long_about = "Interactive dashboard for TLS certificate expiry and WHOIS data.\n\nCheck a single domain or import a file of domains; checks run in the background while results page in live. Click a certificate row to see its WHOIS record."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Max concurrent certificate checks (default: 20, max: 100)
    #[arg(
        short = 'c',
        long = "concurrency",
        value_name = "N",
        help_heading = "Performance"
    )]
    pub concurrency: Option<usize>,

    /// Certificate connect and handshake timeout (e.g. 5s, 2m; default: 5s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// WHOIS lookup timeout, 0 for none (default: 30s)
    #[arg(
        long = "whois-timeout",
        value_name = "DURATION",
        help_heading = "Performance"
    )]
    pub whois_timeout: Option<String>,

    /// Input poll interval in milliseconds
    #[arg(
        long = "tick",
        value_name = "MS",
        default_value_t = 100,
        help_heading = "Performance"
    )]
    pub tick: u64,

    /// Write logs to this file (the screen is owned by the dashboard)
    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "SSLWATCH_LOG_FILE",
        help_heading = "Configuration"
    )]
    pub log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,
}

/// Effective settings after layering CLI flags over environment and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    concurrency: usize,
    timeout: Duration,
    whois_timeout: Duration,
    tick: Duration,
}

impl Settings {
    fn check_config(&self) -> CheckConfig {
        CheckConfig::default()
            .with_concurrency(self.concurrency)
            .with_timeout(self.timeout)
            .with_whois_timeout(self.whois_timeout)
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > 100 {
            return Err("Concurrency must be between 1 and 100".to_string());
        }
    }

    if let Some(timeout) = &args.timeout {
        match parse_timeout_string(timeout) {
            Some(secs) if secs > 0 => {}
            _ => {
                return Err(format!(
                    "Invalid timeout '{}', use format like '5s', '30s', '2m'",
                    timeout
                ))
            }
        }
    }

    if let Some(timeout) = &args.whois_timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid WHOIS timeout '{}', use format like '30s', '2m' or '0'",
                timeout
            ));
        }
    }

    if args.tick == 0 {
        return Err("Tick interval must be at least 1 ms".to_string());
    }

    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if !Term::stdout().is_term() {
        return Err("sslwatch needs an interactive terminal".into());
    }

    init_logging(args.log_file.as_deref(), args.debug)?;

    let settings = resolve_settings(&args, &load_env_config());
    info!(
        version = env!("CARGO_PKG_VERSION"),
        concurrency = settings.concurrency,
        timeout = ?settings.timeout,
        whois_timeout = ?settings.whois_timeout,
        "sslwatch starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("sslwatch-worker")
        .build()?;

    let checker = DomainChecker::with_config(settings.check_config())?;
    let orchestrator = CheckOrchestrator::new(
        Arc::new(checker),
        settings.concurrency,
        runtime.handle().clone(),
    );
    info!(concurrency = orchestrator.concurrency(), "worker pool ready");

    let result = tui::run(orchestrator, settings.tick);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    info!("sslwatch exiting");
    result?;

    Ok(())
}

/// Layer CLI flags over `SSLWATCH_*` values over built-in defaults.
///
/// Flags have already been validated, so unparseable values cannot reach here.
fn resolve_settings(args: &Args, env_config: &EnvConfig) -> Settings {
    let cli_secs = |value: &Option<String>| {
        value
            .as_deref()
            .and_then(parse_timeout_string)
            .map(Duration::from_secs)
    };

    Settings {
        concurrency: args
            .concurrency
            .or(env_config.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY),
        timeout: cli_secs(&args.timeout)
            .or(env_config.timeout)
            .unwrap_or(DEFAULT_TIMEOUT),
        whois_timeout: cli_secs(&args.whois_timeout)
            .or(env_config.whois_timeout)
            .unwrap_or(DEFAULT_WHOIS_TIMEOUT),
        tick: Duration::from_millis(args.tick),
    }
}

/// Install the global subscriber.
///
/// The dashboard owns stdout, so logs go to the log file when one is given.
/// Otherwise only errors reach stderr.
fn init_logging(log_file: Option<&Path>, debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_filter = if debug {
        "sslwatch=debug,sslwatch_lib=debug"
    } else {
        "sslwatch=info,sslwatch_lib=info"
    };

    let (file_layer, console_layer) = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let env_filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(env_filter);
            (Some(layer), None)
        }
        None => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new("error"));
            (None, Some(layer))
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        let mut full = vec!["sslwatch"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = resolve_settings(&args(&[]), &EnvConfig::default());
        assert_eq!(
            settings,
            Settings {
                concurrency: 20,
                timeout: Duration::from_secs(5),
                whois_timeout: Duration::from_secs(30),
                tick: Duration::from_millis(100),
            }
        );
    }

    #[test]
    fn test_env_fills_missing_flags() {
        let env_config = EnvConfig {
            concurrency: Some(7),
            timeout: Some(Duration::from_secs(9)),
            whois_timeout: Some(Duration::ZERO),
        };
        let settings = resolve_settings(&args(&[]), &env_config);
        assert_eq!(settings.concurrency, 7);
        assert_eq!(settings.timeout, Duration::from_secs(9));
        assert_eq!(settings.whois_timeout, Duration::ZERO);
        assert_eq!(settings.check_config().whois_timeout, None);
    }

    #[test]
    fn test_flags_beat_env() {
        let env_config = EnvConfig {
            concurrency: Some(7),
            timeout: Some(Duration::from_secs(9)),
            whois_timeout: None,
        };
        let settings = resolve_settings(
            &args(&["-c", "50", "--timeout", "2m", "--whois-timeout", "10s", "--tick", "250"]),
            &env_config,
        );
        assert_eq!(settings.concurrency, 50);
        assert_eq!(settings.timeout, Duration::from_secs(120));
        assert_eq!(settings.whois_timeout, Duration::from_secs(10));
        assert_eq!(settings.tick, Duration::from_millis(250));
    }

    #[test]
    fn test_validate_args() {
        assert!(validate_args(&args(&[])).is_ok());
        assert!(validate_args(&args(&["--whois-timeout", "0"])).is_ok());

        let err = validate_args(&args(&["-c", "0"])).unwrap_err();
        assert!(err.contains("between 1 and 100"));
        assert!(validate_args(&args(&["-c", "101"])).is_err());
        assert!(validate_args(&args(&["--timeout", "0"])).is_err());
        assert!(validate_args(&args(&["--timeout", "soon"])).is_err());
        assert!(validate_args(&args(&["--whois-timeout=-1"])).is_err());
        assert!(validate_args(&args(&["--tick", "0"])).is_err());
    }
}
