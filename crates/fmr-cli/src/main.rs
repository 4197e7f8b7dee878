use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fmr")]
#[command(about = "Futures margin / NAV report", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the report and write it with its manifest
    Report {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Data root holding market/ and filedb/ (overrides data.root)
        #[arg(long)]
        root: Option<String>,

        /// nav | category | if_margin | positions (overrides report.mode)
        #[arg(long)]
        mode: Option<String>,

        /// Output CSV path (overrides report.output)
        #[arg(long)]
        out: Option<String>,

        /// Fail instead of warn when the config carries keys the mode never reads
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print the YYYYMMDD form of a date-like value
    Tdate {
        value: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Report {
            config_paths,
            root,
            mode,
            out,
            strict,
        } => commands::report::report(commands::report::ReportArgs {
            config_paths,
            root,
            mode,
            out,
            strict,
        })?,

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = fmr_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Tdate { value } => {
            let tdate = commands::parse_date_arg(&value)?;
            println!("tdate={tdate}");
        }
    }

    Ok(())
}
