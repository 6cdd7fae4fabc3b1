mod cmd;
mod logging;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use logging::LogLevel;

#[derive(Debug, Parser)]
#[command(name = "quire", version, about = "Configuration tooling for quire documentation projects")]
struct Cli {
    /// Log level on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Also write debug logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate quire.yml and print the resolved configuration
    Check(CheckArgs),

    /// List the themes quire can find
    Themes(ThemesArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Configuration file (defaults to quire.yml or quire.yaml in the current directory)
    #[arg(short = 'f', long = "config-file")]
    pub config_file: Option<String>,

    /// Abort on warnings
    #[arg(long)]
    pub strict: bool,

    /// Override the theme name
    #[arg(long)]
    pub theme: Option<String>,

    /// Override the output directory
    #[arg(long)]
    pub site_dir: Option<String>,

    /// Extra directory to search for themes (repeatable)
    #[arg(long = "themes-dir")]
    pub themes_dirs: Vec<PathBuf>,

    /// Output format of the resolved configuration
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ThemesArgs {
    /// Extra directory to search for themes (repeatable)
    #[arg(long = "themes-dir")]
    pub themes_dirs: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.log_level, cli.log_file.as_deref()) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let code = match cli.command {
        Commands::Check(args) => cmd::check::run(&args),
        Commands::Themes(args) => cmd::themes::run(&args),
    };

    logging::shutdown();
    std::process::exit(code);
}
