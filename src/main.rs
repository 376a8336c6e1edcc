//! Purpose: `board` CLI entry point.
//! Role: Binary crate root; parses args, loads config, runs commands, emits JSON on stdout.
//! Invariants: Command results are JSON on stdout (pretty on a TTY, compact otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Every command in one process shares one cookie jar via `api::BoardClient`.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod shell;

use board_client::api::{ActivityRecord, BoardClient, Credentials, Error, ErrorKind, to_exit_code};
use board_client::config::{BASE_URL_ENV, BoardConfig, default_config_path};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `board --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let context = CommandContext {
        config_path,
        base_url: cli.base_url.clone(),
        login: cli.login.clone(),
        show_activity: cli.activity,
    };

    command_dispatch::dispatch_command(cli.command, &context)
        .map_err(add_network_hint)
        .map_err(add_auth_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "board",
    version,
    about = "Client for a discussion-board REST service",
    long_about = None,
    after_help = r#"EXAMPLES
  $ board config set-url http://127.0.0.1:8080
  $ board posts list --page 2
  $ board posts list --last
  $ board -u kim -p secret posts create --title "Hello" --content "First post"
  $ board -u kim -p secret comments add 12 "Nice post"
  $ board shell

The session cookie lives only as long as the process; pass --username/--password
to sign in before a one-shot command, or use `board shell` for a longer session."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Service base URL (overrides BOARD_BASE_URL and the config file)",
        value_hint = ValueHint::Url
    )]
    base_url: Option<String>,
    #[arg(
        long,
        global = true,
        help = "Config file path (default: ~/.board/config.json)",
        value_hint = ValueHint::FilePath
    )]
    config: Option<PathBuf>,
    #[command(flatten)]
    login: LoginArgs,
    #[arg(
        long,
        global = true,
        help = "Print the request activity log to stderr after the command"
    )]
    activity: bool,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Debug, Default)]
struct LoginArgs {
    #[arg(short = 'u', long, global = true, help = "Sign in as this user first")]
    username: Option<String>,
    #[arg(
        short = 'p',
        long,
        global = true,
        env = "BOARD_PASSWORD",
        hide_env_values = true,
        help = "Password for --username"
    )]
    password: Option<String>,
}

impl LoginArgs {
    fn credentials(&self) -> Result<Option<Credentials>, Error> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                Ok(Some(Credentials::new(username.clone(), password.clone())))
            }
            (Some(_), None) => Err(Error::new(ErrorKind::Usage)
                .with_message("--username requires --password")
                .with_hint("Pass --password or set BOARD_PASSWORD.")),
            (None, _) => Ok(None),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Show the signed-in identity (null when anonymous).
    Me,
    /// Check --username/--password and print the identity they resolve to.
    Login,
    /// Register --username with --password, then sign in with it.
    Signup {
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        email: String,
    },
    /// End the session on the service.
    Logout,
    /// List, read, and write posts.
    Posts {
        #[command(subcommand)]
        command: PostsCommand,
    },
    /// List and write comments under a post.
    Comments {
        #[command(subcommand)]
        command: CommentsCommand,
    },
    /// List registered users.
    Users {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Show or change the stored preferences.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Interactive session reading commands from stdin.
    Shell,
    /// Print a shell completion script.
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PostsCommand {
    List {
        #[arg(long, conflicts_with = "last")]
        page: Option<u32>,
        /// Scan forward to the last page.
        #[arg(long)]
        last: bool,
    },
    Show {
        id: i64,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Replace the content of a post you wrote.
    Edit {
        id: i64,
        #[arg(long)]
        content: String,
        #[arg(long, default_value_t = 1, help = "Page the post is listed on")]
        page: u32,
    },
    Delete {
        id: i64,
        #[arg(long, default_value_t = 1, help = "Page the post is listed on")]
        page: u32,
    },
}

#[derive(Subcommand)]
enum CommentsCommand {
    List {
        post_id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Add {
        post_id: i64,
        content: String,
    },
    Edit {
        post_id: i64,
        comment_id: i64,
        content: String,
        #[arg(long, default_value_t = 1, help = "Page the comment is listed on")]
        page: u32,
    },
    Delete {
        post_id: i64,
        comment_id: i64,
        #[arg(long, default_value_t = 1, help = "Page the comment is listed on")]
        page: u32,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration.
    Show,
    /// Persist the preferred base URL.
    SetUrl { url: String },
}

struct CommandContext {
    config_path: PathBuf,
    base_url: Option<String>,
    login: LoginArgs,
    show_activity: bool,
}

impl CommandContext {
    fn load_config(&self) -> Result<BoardConfig, Error> {
        let env_url = std::env::var(BASE_URL_ENV).ok();
        Ok(BoardConfig::load(&self.config_path)?.resolve(env_url, self.base_url.clone()))
    }

    /// Builds the client and signs in when credentials were passed.
    fn connect(&self) -> Result<BoardClient, Error> {
        let config = self.load_config()?;
        let mut client = BoardClient::new(&config)?;
        if let Some(credentials) = self.login.credentials()? {
            client.session_mut().login(&credentials)?;
        }
        Ok(client)
    }
}

fn add_network_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Network || err.hint().is_some() {
        return err;
    }
    err.with_hint("Service unreachable. Check --base-url or run `board config set-url <url>`.")
}

fn add_auth_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Auth || err.hint().is_some() {
        return err;
    }
    err.with_hint("Pass --username and --password (or BOARD_PASSWORD) to sign in first.")
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode output json")
            .with_source(err)
    })
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

fn emit_activity(records: &[ActivityRecord]) {
    for record in records.iter().rev() {
        eprint!("{record}");
    }
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Network => "network error".to_string(),
        ErrorKind::NonJson => "response was not JSON".to_string(),
        ErrorKind::Http => "request failed".to_string(),
        ErrorKind::ScanExhausted => "last page not found".to_string(),
        ErrorKind::Auth => "not signed in".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Busy => "busy".to_string(),
        ErrorKind::Decode => "unexpected response shape".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Internal => "internal error".to_string(),
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
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    if let Some(status) = err.status() {
        lines.push(format!(
            "{} {status}",
            colorize_label("status:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
