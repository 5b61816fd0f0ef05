use clap::{Parser, Subcommand};
use sebit_models::cli::{self, EngineArgs, InputSource};
use sebit_models::core::{Engine, EvaluateOptions, OutputFormat, SanitizeMode};
use sebit_models::error::SebitResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sebit")]
#[command(about = "SEBIT financial valuation models from the command line.")]
#[command(long_about = "SEBIT - Financial valuation models
Depreciation, lease, bond, expected-loss, OCI, FX and crypto calculators
plus a journal-book writer and session reports.

COMMANDS:
  list     - List model names and labels
  run      - Run one model on a JSON/YAML input
  watch    - Re-run a model whenever its input file is saved
  journal  - Record journal entries into the vendor workbooks
  report   - Write a Markdown session report

EXAMPLES:
  sebit list
  sebit run bdm --input bond.yaml
  sebit run cprm --json '{\"baseCR\": 0.5, \"ddAdj\": 0.024}' --format pct
  sebit watch dda asset.yaml
  sebit journal receipts.json
  sebit report --batch runs.yaml --custom \"Quarter close\"")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List model names and labels
    List,

    #[command(long_about = "Run one model and print its sanitized output as JSON.

Input is read from --input (YAML for .yaml/.yml, JSON otherwise) or --json.
Without either, the model runs on an empty input and falls back to defaults.

OUTPUT:
  --sanitize omit|null|omitNullish  How undefined/non-finite fields are handled
  --format pct                      Render rate-like fields as percent strings
  --debug                           Include the model's debug block")]
    /// Run a model on an input
    Run {
        /// Model name (see `sebit list`)
        model: String,

        /// Input file (YAML or JSON)
        #[arg(short, long, conflicts_with = "json")]
        input: Option<PathBuf>,

        /// Inline JSON input
        #[arg(long)]
        json: Option<String>,

        /// Sanitize mode for this run
        #[arg(short, long)]
        sanitize: Option<SanitizeMode>,

        /// Output format: raw or pct
        #[arg(short, long, default_value = "raw")]
        format: OutputFormat,

        /// Include debug details in the output
        #[arg(short, long)]
        debug: bool,
    },

    /// Re-run a model whenever its input file changes
    Watch {
        /// Model name
        model: String,

        /// Input file to watch (YAML or JSON)
        file: PathBuf,

        /// Output format: raw or pct
        #[arg(short, long, default_value = "raw")]
        format: OutputFormat,
    },

    #[command(long_about = "Record journal entries into the vendor workbooks.

The file holds one entry or a list of entries with the fields
company, date (YYYY-MM-DD), vendor, description, account, debit, credit,
currency and language (ko|en).

Books are written to <journal-root>/<company>/<year>/<vendor>_<year>.xlsx,
one sheet per month. Duplicate (date, vendor, amount) rows are skipped.")]
    /// Record journal entries from a file
    Journal {
        /// Entry file (YAML or JSON)
        file: PathBuf,
    },

    /// Write a Markdown report of the session
    Report {
        /// Runs to execute first: a list of {model, input}
        #[arg(short, long)]
        batch: Option<PathBuf>,

        /// Output directory (defaults to --report-dir)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Free-form analysis paragraph added to the report
        #[arg(short, long)]
        custom: Option<String>,
    },
}

fn main() -> SebitResult<()> {
    let cli = Cli::parse();
    let engine = Engine::new(cli.engine.into());

    match cli.command {
        Commands::List => cli::list(&engine),

        Commands::Run {
            model,
            input,
            json,
            sanitize,
            format,
            debug,
        } => cli::run(
            &engine,
            &model,
            &InputSource::from_args(input, json),
            EvaluateOptions {
                sanitize_mode: sanitize,
                format,
            },
            debug,
        ),

        Commands::Watch {
            model,
            file,
            format,
        } => cli::watch(
            &engine,
            &model,
            file,
            EvaluateOptions {
                sanitize_mode: None,
                format,
            },
        ),

        Commands::Journal { file } => cli::journal(&engine, file),

        Commands::Report { batch, out, custom } => cli::report(&engine, batch, out, custom),
    }
}
