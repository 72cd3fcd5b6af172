use clap::{ArgAction, Parser, Subcommand};
use std::error::Error;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use axum::http::header;
use hubsig::codec;
use hubsig::logging::{init_logging, LogLevel};
use hubsig::server;
use hubsig::settings::Settings;
use hubsig::{Comparison, Secret, Signature, WebhookSigner};

#[derive(Parser, Debug)]
#[command(name = "hubsig")]
#[command(version)]
#[command(about = "Sign and verify webhook deliveries with X-Hub-Signature")]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(long, short, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Settings file (TOML)
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a receiver that verifies and echoes POST /webhook
    Serve {
        /// Address to bind to
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(long, short)]
        port: Option<u16>,

        /// Shared secret
        #[arg(long, env = "HUBSIG_SECRET", hide_env_values = true)]
        secret: Option<String>,

        /// Refuse bodies larger than this many bytes
        #[arg(long, value_name = "BYTES")]
        max_body_size: Option<usize>,

        /// Compare digests in constant time
        #[arg(long)]
        constant_time: bool,
    },

    /// Print the X-Hub-Signature header value for a body
    Sign {
        /// Shared secret
        #[arg(long, env = "HUBSIG_SECRET", hide_env_values = true)]
        secret: Option<String>,

        /// Body file, or - for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// POST a signed body to a webhook URL
    Send {
        /// Destination URL
        #[arg(long)]
        url: Option<String>,

        /// Shared secret
        #[arg(long, env = "HUBSIG_SECRET", hide_env_values = true)]
        secret: Option<String>,

        /// Content-Type of the body
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,

        /// Body file, or - for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(LogLevel::from_flags(cli.verbose, cli.quiet));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve {
            bind,
            port,
            secret,
            max_body_size,
            constant_time,
        } => {
            let mut receiver = settings.receiver;
            if let Some(bind) = bind {
                receiver.bind_address = bind;
            }
            if let Some(port) = port {
                receiver.port = port;
            }
            if max_body_size.is_some() {
                receiver.max_body_size = max_body_size;
            }
            if constant_time {
                receiver.comparison = Comparison::ConstantTime;
            }
            let secret = require_secret(secret.or(receiver.secret.clone()))?;

            server::run(&receiver, secret).await?;
            Ok(())
        }
        Command::Sign { secret, input } => {
            let secret = require_secret(secret.or(settings.sender.secret))?;
            let body = read_input(&input)?;
            println!("{}", Signature::compute(&secret, &body));
            Ok(())
        }
        Command::Send {
            url,
            secret,
            content_type,
            input,
        } => {
            let url = url
                .or(settings.sender.url)
                .ok_or("A destination URL is required (--url or sender.url)")?;
            let secret = require_secret(secret.or(settings.sender.secret))?;
            let body = read_input(&input)?;

            let client = reqwest::Client::new();
            let mut request = client
                .post(&url)
                .header(header::CONTENT_TYPE, content_type)
                .body(body)
                .build()?;
            WebhookSigner::with_source(secret).sign_reqwest(&mut request)?;

            let response = client.execute(request).await?;
            tracing::info!(%url, status = %response.status(), "Delivered webhook");
            println!("{}", response.status());
            Ok(())
        }
    }
}

fn require_secret(secret: Option<String>) -> Result<Secret, Box<dyn Error>> {
    let secret = secret.ok_or("A secret is required (--secret, HUBSIG_SECRET or settings file)")?;
    Ok(Secret::new(secret)?)
}

fn read_input(input: &Path) -> io::Result<Vec<u8>> {
    if input == Path::new("-") {
        codec::drain(io::stdin().lock())
    } else {
        codec::drain(File::open(input)?)
    }
}
