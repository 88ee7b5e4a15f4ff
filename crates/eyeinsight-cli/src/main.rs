//! EyeInsight CLI - command-line client for the EyeInsight retinal screening service.
//!
//! Sign up, sign in, upload retinal scans and read prediction reports. Every
//! run starts by validating the persisted session token.

mod app;
mod render;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eyeinsight_core::models::ScanFilter;
use eyeinsight_core::Config;

use app::App;

/// Log file name in the data directory
const LOG_FILE: &str = "eyeinsight.log";

const USAGE: &str = "\
Usage: eyeinsight <command>

Commands:
  login [EMAIL]                 Sign in
  signup                        Create an account
  logout                        Sign out and forget the session token
  whoami [--json]               Show the current session
  reports [--search TERM] [--filter all|normal|abnormal]
                                List scan reports
  result <ID>                   Show one prediction result
  upload <IMAGE>                Upload a retinal scan for analysis
  open <PATH>                   Show what the route guard decides for PATH

Environment:
  EYEINSIGHT_API_URL            API base URL
  EYEINSIGHT_EMAIL              Login email
  EYEINSIGHT_PASSWORD           Login password
  RUST_LOG                      Log filter (default: warn)";

enum Command {
    Login(Option<String>),
    Signup,
    Logout,
    Whoami { json: bool },
    Reports { search: String, filter: ScanFilter },
    Result(String),
    Upload(PathBuf),
    Open(String),
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };
    let rest = &args[1..];

    let command = match command.as_str() {
        "login" => Command::Login(rest.first().cloned()),
        "signup" => Command::Signup,
        "logout" => Command::Logout,
        "whoami" => Command::Whoami {
            json: rest.iter().any(|a| a == "--json"),
        },
        "reports" => {
            let mut search = String::new();
            let mut filter = ScanFilter::All;
            let mut iter = rest.iter();
            while let Some(flag) = iter.next() {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("{} needs a value", flag))?;
                match flag.as_str() {
                    "--search" => search = value.clone(),
                    "--filter" => filter = value.parse().map_err(anyhow::Error::msg)?,
                    other => anyhow::bail!("Unknown option {}", other),
                }
            }
            Command::Reports { search, filter }
        }
        "result" => Command::Result(required(rest, "result <ID>")?),
        "upload" => Command::Upload(PathBuf::from(required(rest, "upload <IMAGE>")?)),
        "open" => Command::Open(required(rest, "open <PATH>")?),
        "help" | "--help" | "-h" => Command::Help,
        other => anyhow::bail!("Unknown command '{}'\n\n{}", other, USAGE),
    };
    Ok(command)
}

fn required(rest: &[String], usage: &str) -> Result<String> {
    rest.first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Usage: eyeinsight {}", usage))
}

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = Config::default()
        .data_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;
    if let Command::Help = command {
        println!("{}", USAGE);
        return Ok(());
    }

    let _log_guard = init_tracing();
    info!("EyeInsight CLI starting");

    let mut app = App::new().await?;

    match command {
        Command::Login(email) => app.login(email).await?,
        Command::Signup => app.signup().await?,
        Command::Logout => app.logout(),
        Command::Whoami { json } => app.whoami(json)?,
        Command::Reports { search, filter } => app.reports(&search, filter).await?,
        Command::Result(id) => app.result(&id).await?,
        Command::Upload(path) => app.upload(&path).await?,
        Command::Open(path) => app.open(&path),
        Command::Help => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_reports_options() {
        match parse_args(&args(&["reports", "--filter", "abnormal", "--search", "glau"])).unwrap() {
            Command::Reports { search, filter } => {
                assert_eq!(search, "glau");
                assert_eq!(filter, ScanFilter::Abnormal);
            }
            _ => panic!("expected reports command"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["reports", "--filter"])).is_err());
        assert!(parse_args(&args(&["reports", "--filter", "sick"])).is_err());
        assert!(parse_args(&args(&["result"])).is_err());
        assert!(parse_args(&args(&["frobnicate"])).is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert!(matches!(parse_args(&[]).unwrap(), Command::Help));
        assert!(matches!(parse_args(&args(&["login"])).unwrap(), Command::Login(None)));
        assert!(matches!(
            parse_args(&args(&["login", "a@x.com"])).unwrap(),
            Command::Login(Some(ref e)) if e == "a@x.com"
        ));
        assert!(matches!(parse_args(&args(&["open", "/reports"])).unwrap(), Command::Open(_)));
        assert!(matches!(
            parse_args(&args(&["whoami", "--json"])).unwrap(),
            Command::Whoami { json: true }
        ));
    }
}
