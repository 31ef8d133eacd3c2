//! `quickmail` - send an e-mail from the terminal.
//!
//! ```text
//! quickmail --credentials @credentials.toml \
//!     --to one@example.com --to two@example.com \
//!     --subject "Hello" --body "<h1>Hello</h1>"
//! ```
//!
//! The body comes from `--body`, `--body-file` or standard input, in that
//! order. `--unix` pipes the message to the local `sendmail` instead of
//! talking SMTP, and `--dry-run` prints the message without sending it.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use quickmail::{Address, Credentials, Mail, MemoryTransport, Sendmail, config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Send e-mail through an SMTP server or the local sendmail.
#[derive(Parser, Debug)]
#[command(name = "quickmail")]
#[command(about = "Send e-mail through SMTP or the local sendmail", long_about = None)]
#[command(version = quickmail::VERSION)]
struct Cli {
    /// Credentials as inline JSON or a .json/.toml/.yaml file (a leading @ is
    /// allowed). Defaults to <config dir>/quickmail/credentials.toml.
    #[arg(short, long)]
    credentials: Option<String>,

    /// Recipient address; repeat for more.
    #[arg(short, long = "to", required = true)]
    to: Vec<String>,

    /// Sender, e.g. "Name <user@example.com>". Defaults to the username at
    /// the server host.
    #[arg(short, long)]
    from: Option<String>,

    /// Subject line.
    #[arg(short, long, default_value = "")]
    subject: String,

    /// Message body (HTML allowed).
    #[arg(short, long, conflicts_with = "body_file")]
    body: Option<String>,

    /// Read the message body from a file.
    #[arg(long)]
    body_file: Option<PathBuf>,

    /// Pipe the message to sendmail instead of connecting to the server.
    #[arg(long)]
    unix: bool,

    /// sendmail program used with --unix.
    #[arg(long, default_value = quickmail::SENDMAIL_PROGRAM)]
    sendmail: String,

    /// Print the message instead of sending it.
    #[arg(long, conflicts_with = "unix")]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickmail=info,quickmail_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let credentials = load_credentials(cli.credentials.as_deref())?;

    let memory = Arc::new(MemoryTransport::new());
    let mut mail = Mail::new(credentials)
        .context("invalid credentials")?
        .with_sendmail(Sendmail::new(&cli.sendmail));
    if cli.dry_run {
        mail = mail.with_transport(Arc::clone(&memory));
    }

    let mut builder = mail.subject(&cli.subject);
    builder.to(cli.to.iter().cloned());

    if let Some(from) = &cli.from {
        let from = Address::parse(from).with_context(|| format!("invalid --from {from:?}"))?;
        builder.from_address(from);
    }

    match (&cli.body, &cli.body_file) {
        (Some(body), _) => {
            builder.body_string(body);
        }
        (None, Some(path)) => {
            let file =
                File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
            builder
                .body_read_closer(file)
                .with_context(|| format!("cannot read {}", path.display()))?;
        }
        (None, None) => {
            builder
                .body_reader(&mut io::stdin().lock())
                .context("cannot read body from stdin")?;
        }
    }

    if cli.unix {
        builder.send_unix().context("sendmail failed")?;
        info!(recipients = cli.to.len(), "Message handed to sendmail");
        return Ok(());
    }

    builder.send().context("sending failed")?;

    if cli.dry_run {
        let mut stdout = io::stdout().lock();
        for submission in memory.take() {
            stdout.write_all(&submission.message)?;
            writeln!(stdout)?;
        }
    } else {
        info!(server = %mail.server(), recipients = cli.to.len(), "Message sent");
    }

    Ok(())
}

fn load_credentials(flag: Option<&str>) -> Result<Credentials> {
    if let Some(value) = flag {
        return config::load_credentials(value).context("cannot load credentials");
    }

    let Some(path) = dirs::config_dir().map(|dir| dir.join("quickmail").join("credentials.toml"))
    else {
        bail!("no --credentials given and no config directory on this system");
    };
    if !path.exists() {
        bail!(
            "no --credentials given and {} does not exist",
            path.display()
        );
    }
    config::load_credentials(&path.display().to_string())
        .with_context(|| format!("cannot load {}", path.display()))
}
