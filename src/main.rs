//! Purpose: `kirkpatrick` CLI entry point.
//! Role: Binary crate root; parses args, builds the store client, runs commands.
//! Invariants: Commands emit JSON on stdout (CSV only for `list --format csv`).
//! Invariants: Non-interactive errors and notices are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: The store token is checked before any request is sent.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod serve;
mod view_json;

use kirkpatrick::api::{
    BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_SAMPLE_SIZE, DEFAULT_TABLE_ID, DEFAULT_VIEW_ID,
    Dashboard, Error, ErrorKind, FilterParams, MinScore, RecordStoreClient, StoreConfig,
    TABLE_ID_ENV, TOKEN_ENV, VIEW_ID_ENV, to_exit_code,
};
use kirkpatrick::notice::{Notice, notice_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `kirkpatrick <command> --help` for usage."));
            }
        },
    };

    let default_level = if matches!(cli.command, Command::Serve { .. }) {
        "info"
    } else {
        "error"
    };
    init_tracing(default_level);

    command_dispatch::dispatch_command(cli.command, cli.store)
}

#[derive(Parser)]
#[command(
    name = "kirkpatrick",
    version,
    about = "Collect and analyze Level 1 training feedback",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Records live in a hosted tabular store (NocoDB-style REST API).
The store token is read from API_TOKEN or --token-file.
"#,
    after_help = r#"EXAMPLES
  $ kirkpatrick submit --name "Ada" --score 5 --comments "Great labs"
  $ kirkpatrick list --min-score 4 --keyword labs
  $ kirkpatrick export --out-dir ./reports
  $ kirkpatrick analytics
  $ kirkpatrick serve                     # dashboard backend on 127.0.0.1:9780"#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Debug)]
struct StoreArgs {
    #[arg(
        long,
        global = true,
        env = BASE_URL_ENV,
        default_value = DEFAULT_BASE_URL,
        help = "Record store base url (scheme://host[:port])",
        help_heading = "Record store"
    )]
    base_url: String,
    #[arg(
        long,
        global = true,
        env = TABLE_ID_ENV,
        default_value = DEFAULT_TABLE_ID,
        help = "Table id holding feedback records",
        help_heading = "Record store"
    )]
    table_id: String,
    #[arg(
        long,
        global = true,
        env = VIEW_ID_ENV,
        default_value = DEFAULT_VIEW_ID,
        help = "View id used for reads and writes",
        help_heading = "Record store"
    )]
    view_id: String,
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Read the store token from a file instead of API_TOKEN",
        value_hint = ValueHint::FilePath,
        help_heading = "Record store"
    )]
    token_file: Option<PathBuf>,
    #[arg(
        long = "tls-ca",
        global = true,
        value_name = "PATH",
        help = "Trust this PEM CA/certificate for the store's TLS",
        value_hint = ValueHint::FilePath,
        help_heading = "Record store"
    )]
    tls_ca: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value_t = 30,
        value_name = "SECS",
        help = "Per-request timeout in seconds",
        help_heading = "Record store"
    )]
    timeout: u64,
}

#[derive(Args, Clone, Debug)]
struct FilterArgs {
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(i64).range(1..=5),
        help = "Minimum satisfaction score (inclusive, 1-5)"
    )]
    min_score: i64,
    #[arg(long, help = "Case-insensitive match against name or comments")]
    keyword: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ListFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Submit one feedback record",
        after_help = r#"EXAMPLES
  $ kirkpatrick submit --name "Grace" --score 4
  $ kirkpatrick submit --name "Ada" --score 5 --comments "Loved the labs"

NOTES
  - Score 1 = poor, 5 = excellent
  - A rejected submission prints the store's response text and exits 9"#
    )]
    Submit {
        #[arg(long, help = "Participant name")]
        name: String,
        #[arg(
            long,
            value_parser = clap::value_parser!(i64).range(1..=5),
            help = "Satisfaction score (1-5)"
        )]
        score: i64,
        #[arg(long, default_value = "", help = "Free-text comments")]
        comments: String,
    },
    #[command(
        about = "List feedback records, optionally filtered",
        after_help = r#"EXAMPLES
  $ kirkpatrick list
  $ kirkpatrick list --min-score 4 --keyword labs
  $ kirkpatrick list --format csv > feedback.csv

NOTES
  - Records with an unreadable score never pass the threshold
  - If the store cannot be read, an empty list is printed and a notice goes to stderr"#
    )]
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "json", value_enum, help = "Output format: json|csv")]
        format: ListFormat,
    },
    #[command(
        about = "Export filtered records to CSV and/or XLSX files",
        after_help = r#"EXAMPLES
  $ kirkpatrick export                              # both files into .
  $ kirkpatrick export --out-dir reports --min-score 3
  $ kirkpatrick export --csv out.csv

NOTES
  - Without --csv/--xlsx both feedback_records.csv and feedback_records.xlsx are written"#
    )]
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(
            long,
            default_value = ".",
            value_name = "DIR",
            help = "Directory for default-named artifacts",
            value_hint = ValueHint::DirPath
        )]
        out_dir: PathBuf,
        #[arg(long, value_name = "PATH", help = "Write CSV to this path", value_hint = ValueHint::FilePath)]
        csv: Option<PathBuf>,
        #[arg(long, value_name = "PATH", help = "Write XLSX to this path", value_hint = ValueHint::FilePath)]
        xlsx: Option<PathBuf>,
    },
    #[command(about = "Show mean score, score distribution, and sample comments")]
    Analytics {
        #[arg(
            long,
            default_value_t = DEFAULT_SAMPLE_SIZE,
            help = "Number of sample comments to include"
        )]
        samples: usize,
    },
    #[command(
        about = "Serve the dashboard HTTP/JSON API (loopback by default)",
        after_help = r#"EXAMPLES
  $ kirkpatrick serve
  $ kirkpatrick serve --bind 127.0.0.1:9781 --cors-origin http://localhost:5173

NOTES
  - Endpoints: /healthz, /v1/feedback, /v1/records, /v1/records/export.csv,
    /v1/records/export.xlsx, /v1/analytics
  - Non-loopback binds require --allow-non-loopback"#
    )]
    Serve {
        #[arg(long, default_value = "127.0.0.1:9780", help = "Bind address (host:port)")]
        bind: String,
        #[arg(long, help = "Allow binding to a non-loopback address")]
        allow_non_loopback: bool,
        #[arg(long = "cors-origin", value_name = "ORIGIN", help = "Repeatable allowed browser origin")]
        cors_origin: Vec<String>,
    },
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl FilterArgs {
    fn params(&self) -> Result<FilterParams, Error> {
        Ok(FilterParams::new(
            MinScore::new(self.min_score)?,
            self.keyword.clone(),
        ))
    }
}

impl StoreArgs {
    fn config(&self) -> Result<StoreConfig, Error> {
        let token = match &self.token_file {
            Some(path) => std::fs::read_to_string(path).map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("failed to read token file {}", path.display()))
                    .with_source(err)
            })?,
            None => std::env::var(TOKEN_ENV).unwrap_or_default(),
        };
        StoreConfig::new(token)?
            .with_base_url(&self.base_url)?
            .with_table_id(self.table_id.clone())?
            .with_view_id(self.view_id.clone())
    }

    fn dashboard(&self) -> Result<Dashboard, Error> {
        let mut client = RecordStoreClient::new(self.config()?)?
            .with_timeout(Duration::from_secs(self.timeout.max(1)));
        if let Some(path) = &self.tls_ca {
            client = client.with_tls_ca_file(path)?;
        }
        Ok(Dashboard::new(client))
    }
}

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_bytes(bytes: &[u8]) -> Result<(), Error> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|()| stdout.flush())
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write stdout")
                .with_source(err)
        })
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_notice(cmd: &str, message: String) {
    if io::stderr().is_terminal() {
        eprintln!("notice: {message}");
        return;
    }
    let notice = Notice::degraded(cmd, notice_time_now().unwrap_or_default(), message);
    let json = serde_json::to_string(&notice_json(&notice)).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Remote => "record store error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(body) = err.body() {
        inner.insert("response".to_string(), json!(body));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(status) = err.status() {
        lines.push(format!("status: {status}"));
    }
    if let Some(body) = err.body().filter(|body| !body.is_empty()) {
        lines.push(format!("response: {body}"));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}
