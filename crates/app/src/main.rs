use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use clap::{Parser, Subcommand};
use doubleclock_core::{AppConfig, DeviceController, Hardware, JsonFileStore, SharedBuzzer};
use tracing_subscriber::EnvFilter;

mod console;

use console::{ConsoleBuzzer, ConsoleDisplay, StdinInput};

fn main() -> doubleclock_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            state_file,
            slider_right,
        } => run(config.as_deref(), state_file, slider_right),
        Commands::PrintConfig => {
            println!("{}", AppConfig::default().to_json()?);
            Ok(())
        }
    }
}

fn run(
    config_path: Option<&std::path::Path>,
    state_file: Option<PathBuf>,
    slider_right: bool,
) -> doubleclock_core::Result<()> {
    let mut config = match config_path {
        Some(path) => AppConfig::from_json_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(state_file) = state_file {
        config.storage.state_file = state_file;
    }
    tracing::info!(?config_path, state_file = ?config.storage.state_file, "starting double clock");

    let buzzer: SharedBuzzer = Arc::new(Mutex::new(ConsoleBuzzer::default()));
    let hardware = Hardware {
        display: Box::new(ConsoleDisplay::default()),
        buzzer,
        store: Box::new(JsonFileStore::new(&config.storage.state_file)),
    };
    let input = StdinInput::new(slider_right);
    let controller = DeviceController::start(&config, hardware, &input)?;

    println!("{}", console::HELP);
    // Returns when the operator quits or stdin closes.
    input.pump(&controller.sender())?;

    controller.shutdown()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Dual countdown-and-alarm clock", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the clock with console stand-ins for buttons, displays and buzzer.
    Run {
        /// JSON configuration file; defaults apply to anything it leaves out.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// File the configured times are remembered in.
        #[arg(short, long)]
        state_file: Option<PathBuf>,
        /// Start with the slider in the right position.
        #[arg(long)]
        slider_right: bool,
    },
    /// Print the default configuration as JSON.
    PrintConfig,
}
