use anyhow::Result;
use apilog_cli::OutputFormat;
use apilog_cli::commands;
use apilog_cli::commands::search::{DEFAULT_TOP_QUERIES, SearchOptions, SearchView};
use apilog_cli::commands::top_endpoints::DEFAULT_TOP;
use apilog_core::normalize::{DEFAULT_API_MARKER, DEFAULT_BASE_PREFIX, NormalizerConfig};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apilog")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Endpoint-level traffic statistics from HTTP access logs",
    long_about = "apilog reads access logs exported as CSV, folds request URLs into endpoint \
                  keys such as /users/{id}, and reports request counts, processing times, \
                  query parameter usage and search activity."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,

    /// Substring marking a request URL as API traffic
    #[arg(long, global = true, env = "APILOG_API_MARKER", default_value = DEFAULT_API_MARKER)]
    api_marker: String,

    /// Path prefix removed before building endpoint keys
    #[arg(long, global = true, env = "APILOG_BASE_PREFIX", default_value = DEFAULT_BASE_PREFIX)]
    base_prefix: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Count requests per client whose URL contains a keyword
    Requests {
        /// Path to the access log CSV
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Case-sensitive substring to look for in request URLs
        #[arg(value_name = "KEYWORD")]
        keyword: String,

        /// Export the counts to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Count API requests per verb and endpoint
    Endpoints {
        /// Path to the access log CSV
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Show an endpoint x verb table
        #[arg(long)]
        pivot: bool,

        /// Export the counts to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show each client's favorite endpoint and the most favored endpoints
    TopEndpoints {
        /// Path to the access log CSV
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of endpoints to rank
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,

        /// Export the per-client rows to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Processing time mean and variance per verb and endpoint
    Timings {
        /// Path to the access log CSV
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Break the statistics down per client
        #[arg(long)]
        by_client: bool,

        /// Export the statistics to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Distribution of a query parameter's values on one endpoint
    Params {
        /// Path to the access log CSV
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Endpoint path, with or without the base prefix (e.g. /search)
        #[arg(long)]
        endpoint: String,

        /// Query parameter name
        #[arg(long)]
        param: String,

        /// Export the value counts to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze search requests by section, category, query or day
    Search {
        /// Path to the access log CSV
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Summary to produce
        #[arg(value_enum)]
        view: SearchView,

        /// Break the summary down per section
        #[arg(long)]
        split: bool,

        /// Number of queries to show
        #[arg(long, default_value_t = DEFAULT_TOP_QUERIES)]
        top: usize,

        /// Path segment that marks a search call (default: fuzzySearch)
        #[arg(long)]
        action: Option<String>,
    },

    /// Generate shell completion scripts
    #[command(long_about = "Generate shell completion scripts for apilog.

SUPPORTED SHELLS:
    bash, zsh, fish, powershell, elvish

INSTALLATION:
    Bash:
        apilog completion --shell bash > ~/.local/share/bash-completion/completions/apilog
        # or source it from ~/.bashrc

    Zsh:
        apilog completion --shell zsh > ~/.zfunc/_apilog
        # add ~/.zfunc to fpath in ~/.zshrc

    Fish:
        apilog completion --shell fish > ~/.config/fish/completions/apilog.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let config = NormalizerConfig {
        api_marker: cli.api_marker,
        base_prefix: cli.base_prefix,
    };
    let format = cli.format;

    match cli.command {
        Commands::Requests {
            file,
            keyword,
            output,
        } => commands::requests::execute(&file, &keyword, output, &config, format),
        Commands::Endpoints {
            file,
            pivot,
            output,
        } => commands::endpoints::execute(&file, pivot, output, &config, format),
        Commands::TopEndpoints { file, top, output } => {
            commands::top_endpoints::execute(&file, top, output, &config, format)
        }
        Commands::Timings {
            file,
            by_client,
            output,
        } => commands::timings::execute(&file, by_client, output, &config, format),
        Commands::Params {
            file,
            endpoint,
            param,
            output,
        } => commands::params::execute(&file, &endpoint, &param, output, &config, format),
        Commands::Search {
            file,
            view,
            split,
            top,
            action,
        } => {
            let options = SearchOptions {
                view,
                split,
                top,
                action,
            };
            commands::search::execute(&file, &options, &config, format)
        }
        Commands::Completion { shell } => {
            commands::completion::execute(shell, &mut Cli::command())
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("apilog=debug,apilog_cli=debug,apilog_core=debug")
    } else {
        EnvFilter::new("apilog=info,apilog_cli=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
