use clap::{Parser, Subcommand, ValueEnum};
use mongofs::{open_store, Config, MongoFs};
use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

/// MongoFs CLI: browse a MongoDB server as a read-only filesystem
#[derive(Parser)]
#[command(name = "mongofs", version, about)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Connection string to MongoDB (mongodb:// or mongodb+srv://)
    #[arg(short = 'c', long, global = true)]
    connection_string: Option<String>,

    /// Serve an Extended JSON fixture file instead of a live server
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Name of the MongoDB instance, used as the volume label
    #[arg(short = 'n', long, global = true)]
    name: Option<String>,

    /// Path separator
    #[arg(long, global = true)]
    separator: Option<char>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List the entries of a directory
    Ls {
        /// Absolute virtual path (e.g. /shop/orders/data)
        path: String,
        /// Shell-style name filter (e.g. --pattern '*.json')
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Show name, kind, size and creation time of a path
    Stat {
        /// Absolute virtual path
        path: String,
    },

    /// Write the contents of a file to stdout
    Cat {
        /// Absolute virtual path (e.g. /shop/orders/data/0.json)
        path: String,
        /// Byte offset to start reading at
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Maximum number of bytes to read
        #[arg(long)]
        length: Option<usize>,
    },

    /// Show total and free space of the volume
    Df,

    /// Show volume information
    Volume,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&cli)?;
    init_logging(&config.log.level, config.log.file.as_deref())?;
    config.validate()?;

    // Unreachable store is fatal: nothing is served without one.
    let store = open_store(&config)?;
    let fs = MongoFs::from_config(&config, store)?;
    log::info!("Serving '{}' with separator '{}'", fs.name(), fs.separator());

    match cli.command {
        Command::Ls { path, pattern } => {
            let entries = fs.find_files(&path, pattern.as_deref())?;
            print_output(&serde_json::to_value(&entries)?, &cli.format)?;
        }

        Command::Stat { path } => {
            let info = fs.file_info(&path)?;
            print_output(&serde_json::to_value(&info)?, &cli.format)?;
        }

        Command::Cat {
            path,
            offset,
            length,
        } => {
            let bytes = fs.read_file(&path, offset, length.unwrap_or(usize::MAX))?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }

        Command::Df => {
            let space = fs.disk_space()?;
            print_output(&serde_json::to_value(space)?, &cli.format)?;
        }

        Command::Volume => {
            let volume = fs.volume_info();
            print_output(&serde_json::to_value(volume)?, &cli.format)?;
        }
    }

    Ok(())
}

/// Config file values, overridden by any flag given on the command line.
fn resolve_config(cli: &Cli) -> Result<Config, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(uri) = &cli.connection_string {
        config.connection_string = Some(uri.clone());
        config.fixture = None;
    }
    if let Some(fixture) = &cli.fixture {
        config.fixture = Some(fixture.clone());
        config.connection_string = None;
    }
    if let Some(name) = &cli.name {
        config.name = name.clone();
    }
    if let Some(separator) = cli.separator {
        config.separator = separator;
    }
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if let Some(file) = &cli.log_file {
        config.log.file = Some(file.clone());
    }
    Ok(config)
}

/// `RUST_LOG`, when set, takes precedence over the configured level.
fn init_logging(level: &str, file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(level);
    builder.parse_default_env();

    if let Some(path) = file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("Failed to open log file '{}': {e}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    Ok(())
}

fn print_output(value: &serde_json::Value, format: &OutputFormat) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value)?);
        }
    }
    Ok(())
}
