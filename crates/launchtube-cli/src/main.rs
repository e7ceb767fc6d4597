use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "launchtube")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Launch streaming services in a managed browser and divert playback to mpv",
    long_about = "LaunchTube starts a browser (or takes full automation control of one), \
                  serves the local control-plane that injected page scripts talk to, and \
                  hands video playback to an external mpv process."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control-plane and process managers
    Serve {
        /// Data root (defaults to ~/.launchtube)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Bundled asset directory (defaults to <data root>/assets)
        #[arg(long)]
        assets_dir: Option<PathBuf>,

        /// Open this URL in the managed browser on startup
        #[arg(long)]
        open: Option<String>,

        /// Profile whose apps and browser state are used
        #[arg(long, default_value = "default")]
        profile: String,

        /// Drive the browser over the automation protocol instead of
        /// loading the extension
        #[arg(long)]
        automation: bool,

        /// Player binary
        #[arg(long, default_value = "mpv")]
        player: String,
    },

    /// List browsers detected on this system
    Browsers,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve {
            data_dir,
            assets_dir,
            open,
            profile,
            automation,
            player,
        } => commands::serve::execute(data_dir, assets_dir, open, &profile, automation, player),
        Commands::Browsers => commands::browsers::execute(),
        Commands::Completion { shell } => commands::completion::execute(shell, &mut Cli::command()),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "launchtube=debug,launchtube_core=debug,launchtube_player=debug,\
             launchtube_browser=debug,launchtube_gateway=debug",
        )
    } else {
        EnvFilter::new("launchtube=info,launchtube_gateway=info,launchtube_player=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
