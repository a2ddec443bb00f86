use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use coinbase_relay::{config, error, info, server, warning};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the relay server (default)
    Serve(ServeOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone, Default)]
pub struct ServeOptions {
    /// Port to listen on; overrides SERVER_PORT
    #[clap(long)]
    pub port: Option<u16>,

    /// Load environment from this file instead of the default locations
    #[clap(long)]
    pub env_file: Option<PathBuf>,

    /// Open the login page in the default browser once listening
    #[clap(long)]
    pub open: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(ServeOptions::default())) {
        Command::Serve(opt) => serve(opt).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}

async fn serve(opt: ServeOptions) {
    match config::load_env(opt.env_file.as_deref()) {
        Ok(Some(path)) => info!("Loaded environment from {}", path.display()),
        Ok(None) => warning!("No .env file found, using process environment"),
        Err(e) => error!("Cannot load environment. Err: {}", e),
    }

    let mut config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration. Err: {}", e),
    };

    if let Some(port) = opt.port {
        config.set_port(port);
    }

    if config.client_id.is_none() || config.client_secret.is_none() {
        warning!("COINBASE_CLIENT_ID/COINBASE_CLIENT_SECRET not set; /login and /callback will fail");
    }
    if config.api_key.is_none() || config.api_secret.is_none() {
        warning!("COINBASE_KEY/COINBASE_SECRET not set; / will fail");
    }

    if let Err(e) = server::start_api_server(config, opt.open).await {
        error!("Server failed. Err: {}", e);
    }
}
