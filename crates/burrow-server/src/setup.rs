//! First-run setup wizard
//!
//! Runs only when the config file or the credential file is missing. The
//! defaulting and validation rules are plain functions; prompting goes
//! through [`Prompter`] so the flow can be driven from a script in tests.

use burrow_core::{
    Config, ConfigError, ConfigStore, CredentialError, CredentialStore, NewUser, User,
    DEFAULT_TOKEN_CIPHER_SUITE, DEFAULT_WEB_DIR, DEFAULT_WEB_URL,
};
use burrow_storage::clean_path;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::warn;

/// Port offered when the answer is left empty
pub const DEFAULT_PORT: u16 = 9000;

/// Data directory offered when the answer is left empty
pub const DEFAULT_ROOT_DATA_DIR: &str = "data";

/// Temp directory offered when the answer is left empty
pub const DEFAULT_ROOT_TEMP_DIR: &str = "tmp";

/// Length of the generated token secret
pub const TOKEN_SECRET_LEN: usize = 20;

/// Errors that abort the wizard; none of them are retried
#[derive(Error, Debug)]
pub enum SetupError {
    /// Reading an answer failed or input ended
    #[error("failed to read input: {0}")]
    Input(#[from] io::Error),

    /// The port answer is not an integer in 1..=65535
    #[error("invalid port {input:?}: {reason}")]
    InvalidPort { input: String, reason: String },

    /// Persisting the config failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Persisting the user failed
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Source of interactive answers
pub trait Prompter {
    /// Show `label` and read one line, without the line terminator
    fn prompt(&mut self, label: &str) -> io::Result<String>;

    /// Like `prompt`, but the answer must not be echoed
    fn prompt_secret(&mut self, label: &str) -> io::Result<String> {
        self.prompt(label)
    }
}

/// Prompts on stdout and reads stdin; passwords are read without echo
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&mut self, label: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{label}")?;
        stdout.flush()?;
        read_answer(&mut io::stdin().lock())
    }

    fn prompt_secret(&mut self, label: &str) -> io::Result<String> {
        rpassword::prompt_password(label)
    }
}

/// Prompter over arbitrary reader/writer pairs
pub struct ScriptedPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ScriptedPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Everything written to the prompt side so far
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompter for ScriptedPrompter<R, W> {
    fn prompt(&mut self, label: &str) -> io::Result<String> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        read_answer(&mut self.input)
    }
}

fn read_answer(input: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(line)
}

/// Raw answers to the config questions, in prompt order
#[derive(Clone, Debug, Default)]
pub struct ConfigAnswers {
    pub port: String,
    pub root_data_dir: String,
    pub root_temp_dir: String,
    pub web_url: String,
    pub web_dir: String,
}

/// Empty answer → `DEFAULT_PORT`; anything else must be an integer in 1..=65535
pub fn resolve_port(input: &str) -> Result<u16, SetupError> {
    if input.is_empty() {
        return Ok(DEFAULT_PORT);
    }
    let invalid = |reason: String| SetupError::InvalidPort {
        input: input.to_string(),
        reason,
    };
    // u16::from_str accepts a leading '+'.
    if !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("port must contain only digits".to_string()));
    }
    match input.parse::<u16>() {
        Ok(0) => Err(invalid("port must be positive".to_string())),
        Ok(port) => Ok(port),
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// Empty answer → `default`; the result is always lexically cleaned
pub fn resolve_dir(input: &str, default: &str) -> String {
    if input.is_empty() {
        clean_path(default)
    } else {
        clean_path(input)
    }
}

/// Resolve the static-site URL prefix.
///
/// An answer that cleans to `""`, `"."` or `"/"` falls back to the default,
/// so static assets never shadow the whole URL space. The prefix is rooted.
pub fn resolve_web_url(input: &str) -> String {
    let cleaned = clean_path(input);
    let prefix = match cleaned.as_str() {
        "" | "." | "/" => clean_path(DEFAULT_WEB_URL),
        _ => cleaned,
    };
    if prefix.starts_with('/') {
        prefix
    } else {
        format!("/{prefix}")
    }
}

/// Random alphanumeric secret for signing session tokens
pub fn generate_token_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_SECRET_LEN)
        .map(char::from)
        .collect()
}

/// Turn raw answers into a config with a fresh token secret
pub fn build_config(answers: &ConfigAnswers) -> Result<Config, SetupError> {
    Ok(Config {
        port: resolve_port(&answers.port)?,
        root_data_dir: resolve_dir(&answers.root_data_dir, DEFAULT_ROOT_DATA_DIR),
        root_temp_dir: resolve_dir(&answers.root_temp_dir, DEFAULT_ROOT_TEMP_DIR),
        token_secret: generate_token_secret(),
        token_cipher_suite: DEFAULT_TOKEN_CIPHER_SUITE.to_string(),
        web_url: resolve_web_url(&answers.web_url),
        web_dir: resolve_dir(&answers.web_dir, DEFAULT_WEB_DIR),
    })
}

/// Ask for the config values, then persist them through `store`
pub fn create_config(prompter: &mut impl Prompter, store: &ConfigStore) -> Result<Config, SetupError> {
    warn!(path = %store.path().display(), "No configuration file found, creating one");

    let port = prompter.prompt(&format!("Enter port [{DEFAULT_PORT}]: "))?;
    // Reject a bad port before asking anything else.
    resolve_port(&port)?;

    let answers = ConfigAnswers {
        port,
        root_data_dir: prompter
            .prompt(&format!("Enter root data directory [{DEFAULT_ROOT_DATA_DIR}]: "))?,
        root_temp_dir: prompter
            .prompt(&format!("Enter root temporary directory [{DEFAULT_ROOT_TEMP_DIR}]: "))?,
        web_url: prompter.prompt(&format!("Enter web URL prefix [{DEFAULT_WEB_URL}]: "))?,
        web_dir: prompter.prompt(&format!("Enter web asset directory [{DEFAULT_WEB_DIR}]: "))?,
    };

    let config = build_config(&answers)?;
    store.create_new_config(&config)?;
    Ok(config)
}

/// Ask for the first account, then persist it through `credentials`
pub fn create_user(
    prompter: &mut impl Prompter,
    credentials: &CredentialStore,
) -> Result<User, SetupError> {
    warn!(path = %credentials.path().display(), "No authentication file found, creating one");

    let username = prompter.prompt("Enter username: ")?;
    let password = prompter.prompt_secret("Enter password: ")?;
    let display_name = prompter.prompt("Enter display name: ")?;
    let email = prompter.prompt("Enter email: ")?;

    let user = credentials.create_user(NewUser {
        username,
        password,
        display_name,
        email,
    })?;
    Ok(user)
}
