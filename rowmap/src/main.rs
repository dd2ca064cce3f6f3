//! rowmap CLI - convert records with a JSON rule set
//!
//! # Commands
//!
//! ```bash
//! rowmap convert --rules rules.json input.csv      # Convert records, print JSON
//! rowmap check rules.json                          # Validate a rule set
//! rowmap load input.csv                            # Just load records as JSON
//! rowmap operations                                # Show built-in operations
//! rowmap example-rules                             # Show an example rule set
//! ```
//!
//! Logging goes to stderr and honors `RUST_LOG`. A `.env` file is loaded if
//! present, so `ROWMAP_RULES` can name the default rule set.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use rowmap::parser::drop_empty_cells;
use rowmap::{check_rules, convert, load_records, ConversionReport, InputFormat, RuleSet};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "rowmap")]
#[command(about = "Convert loosely-typed records into a canonical shape", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert records with a rule set and output JSON
    Convert {
        /// Input file (.csv or .json)
        input: PathBuf,

        /// Rule set JSON file
        #[arg(short, long, env = "ROWMAP_RULES")]
        rules: PathBuf,

        /// Input format (guessed from the extension if not specified)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Output file for converted records (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON conversion report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Treat empty cells as absent fields
        #[arg(long)]
        empty_as_missing: bool,

        /// Fail when any row has cell errors
        #[arg(long)]
        strict: bool,
    },

    /// Validate a rule set without converting anything
    Check {
        /// Rule set JSON file
        rules: PathBuf,
    },

    /// Load records and output them as JSON
    Load {
        /// Input file (.csv or .json)
        input: PathBuf,

        /// Input format (guessed from the extension if not specified)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show available operations and generators
    Operations,

    /// Show an example rule set
    ExampleRules,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for InputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => InputFormat::Csv,
            FormatArg::Json => InputFormat::Json,
        }
    }
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Convert {
            input,
            rules,
            format,
            output,
            report,
            empty_as_missing,
            strict,
        } => cmd_convert(
            &input,
            &rules,
            format.map(Into::into),
            output.as_deref(),
            report.as_deref(),
            empty_as_missing,
            strict,
        ),

        Commands::Check { rules } => cmd_check(&rules),

        Commands::Load {
            input,
            format,
            output,
        } => cmd_load(&input, format.map(Into::into), output.as_deref()),

        Commands::Operations => cmd_operations(),

        Commands::ExampleRules => cmd_example_rules(),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "rowmap=info",
        1 => "rowmap=debug",
        _ => "rowmap=trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn cmd_convert(
    input: &Path,
    rules_path: &Path,
    format: Option<InputFormat>,
    output: Option<&Path>,
    report_path: Option<&Path>,
    empty_as_missing: bool,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(rules = %rules_path.display(), "loading rule set");
    let rule_set = RuleSet::from_file(rules_path)?;
    let rules = rule_set.compile()?;

    info!(input = %input.display(), "loading records");
    let mut parsed = load_records(input, format)?;
    if empty_as_missing {
        drop_empty_cells(&mut parsed.records);
    }
    info!(
        rows = parsed.records.len(),
        columns = parsed.headers.len(),
        encoding = %parsed.encoding,
        "records loaded"
    );

    if let Err(missing) = rule_set.validate_headers(&parsed.headers) {
        warn!("required source fields missing from input: {}", missing.join(", "));
    }

    let (converted, diagnostics) = convert(&parsed.records, &rules);
    let report = ConversionReport::new(parsed.records.len(), converted.len(), &diagnostics);
    info!(cell_errors = diagnostics.cell_error_count(), "{}", report.summary());

    for rule_error in &diagnostics.rule_errors {
        error!("{}", rule_error);
    }
    for row_error in diagnostics.row_errors.iter().take(5) {
        for cell in &row_error.cell_errors {
            warn!(row = row_error.index, "{}", cell);
        }
    }
    if diagnostics.row_errors.len() > 5 {
        warn!("... {} more failed rows", diagnostics.row_errors.len() - 5);
    }

    if let Some(path) = report_path {
        fs::write(path, report.to_json()?)?;
        info!(report = %path.display(), "report written");
    }

    if diagnostics.has_rule_errors() {
        let count = diagnostics.rule_errors.len();
        return Err(format!("rule set rejected with {} error(s)", count).into());
    }

    let json = serde_json::to_string_pretty(&converted)?;
    write_output(&json, output)?;

    if strict && diagnostics.has_row_errors() {
        return Err(format!("{} row(s) failed conversion", diagnostics.row_errors.len()).into());
    }

    Ok(())
}

fn cmd_check(rules_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let rule_set = RuleSet::from_file(rules_path)?;
    let rules = rule_set.compile()?;
    let errors = check_rules(&rules);

    if errors.is_empty() {
        info!(rules = rules.len(), "rule set is valid");
        for key in rule_set.target_keys() {
            println!("{}", key);
        }
        return Ok(());
    }

    for e in &errors {
        error!("{}", e);
    }
    Err(format!("{} rule error(s)", errors.len()).into())
}

fn cmd_load(
    input: &Path,
    format: Option<InputFormat>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = load_records(input, format)?;
    info!(
        rows = parsed.records.len(),
        encoding = %parsed.encoding,
        delimiter = ?parsed.delimiter,
        "records loaded"
    );
    info!("columns: {}", parsed.headers.join(", "));

    let json = serde_json::to_string_pretty(&parsed.records)?;
    write_output(&json, output)?;
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", rowmap::operations_description());
    Ok(())
}

fn cmd_example_rules() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", rowmap::example_rule_set().to_json()?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            info!(output = %p.display(), "output written");
        }
        None => println!("{}", content),
    }
    Ok(())
}
