use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use luz_calendar::lookup::DEFAULT_BASE_URL;
use luz_calendar::{CalendarConfig, HttpTimeLookup, LookupError, TimeLookup};
use luz_expr::{Evaluator, NameTable, Value};
use luz_templater::{fill_template, DocumentKind, FillError, FillOptions, FillStats};
use serde::Serialize;

use crate::names::{load_names_file, parse_assignment};

/// Exit status for a place the calendar does not know.
pub const EXIT_UNKNOWN_PLACE: u8 = 3;

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "luz", version, about = "Fill Shabbat schedule templates (.docx/.pptx).")]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a template and write `לוז שבת פרשת <portion>.<ext>` into the output directory.
    Fill(FillArgs),
    /// Evaluate one token expression and print the result.
    Eval(EvalArgs),
}

#[derive(clap::Args)]
struct FillArgs {
    /// Template document (.docx or .pptx).
    template: PathBuf,

    #[arg(long, env = "LUZ_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Look the times up for this place.
    #[arg(long, conflicts_with = "names", required_unless_present = "names")]
    place: Option<String>,

    /// JSON object of names to use instead of a calendar lookup.
    #[arg(long, value_name = "FILE.json")]
    names: Option<PathBuf>,

    /// Bind or override a name (repeatable).
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, Value)>,

    #[arg(long, env = "LUZ_CALENDAR_URL", default_value = DEFAULT_BASE_URL)]
    calendar_url: String,

    #[arg(long, env = "LUZ_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(clap::Args)]
struct EvalArgs {
    /// Token body, e.g. `UP(enter_time - 20)`.
    expr: String,

    #[arg(long, value_name = "FILE.json")]
    names: Option<PathBuf>,

    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, Value)>,
}

#[derive(Serialize)]
struct FillReport {
    path: String,
    #[serde(flatten)]
    stats: FillStats,
    warnings: Vec<String>,
}

pub fn run() -> Result<()> {
    run_with_args(Args::parse())
}

pub fn run_with_args(args: Args) -> Result<()> {
    match args.command {
        Command::Fill(args) => fill(args),
        Command::Eval(args) => eval(args),
    }
}

/// Process exit status for an error returned by [`run`].
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let unknown_place = err.chain().any(|cause| {
        cause
            .downcast_ref::<LookupError>()
            .is_some_and(LookupError::is_place_not_found)
            || matches!(
                cause.downcast_ref::<FillError>(),
                Some(FillError::Lookup(LookupError::PlaceNotFound { .. }))
            )
    });
    if unknown_place {
        EXIT_UNKNOWN_PLACE
    } else {
        1
    }
}

fn base_names(names: Option<&PathBuf>, set: Vec<(String, Value)>) -> Result<NameTable> {
    let mut table = match names {
        Some(path) => load_names_file(path)?,
        None => NameTable::new(),
    };
    for (name, value) in set {
        table.set(name, value);
    }
    Ok(table)
}

fn fill(args: FillArgs) -> Result<()> {
    // Reject unsupported templates before spending a request on the lookup.
    DocumentKind::from_path(&args.template)?;

    let names = match &args.place {
        Some(place) => {
            let lookup = HttpTimeLookup::new(CalendarConfig {
                base_url: args.calendar_url.clone(),
                timeout: Duration::from_secs(args.timeout_secs),
                ..CalendarConfig::default()
            })
            .context("failed to set up the calendar client")?;
            let times = lookup.lookup(place).map_err(|err| match err {
                LookupError::PlaceNotFound { .. } => anyhow::Error::new(err).context(format!(
                    "the calendar does not know `{place}`; check the spelling (Hebrew place names are expected)"
                )),
                other => anyhow::Error::new(other).context("calendar lookup failed"),
            })?;
            let mut table = times.to_name_table();
            for (name, value) in args.set {
                table.set(name, value);
            }
            table
        }
        None => base_names(args.names.as_ref(), args.set)?,
    };

    log::debug!(
        "{} names bound: {}",
        names.len(),
        names
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let outcome = fill_template(&args.template, &args.out_dir, names, &FillOptions::default())
        .with_context(|| format!("failed to fill {}", args.template.display()))?;

    let warnings: Vec<String> = outcome.diagnostics.iter().map(ToString::to_string).collect();
    for warning in &warnings {
        log::warn!("{warning}");
    }

    match args.format {
        OutputFormat::Text => print_line(&outcome.path.display().to_string()),
        OutputFormat::Json => {
            let report = FillReport {
                path: outcome.path.to_string_lossy().into_owned(),
                stats: outcome.stats,
                warnings,
            };
            print_line(&serde_json::to_string_pretty(&report)?)
        }
    }
}

fn eval(args: EvalArgs) -> Result<()> {
    let mut names = base_names(args.names.as_ref(), args.set)?;
    let mut evaluator = Evaluator::new(&mut names);
    let value = evaluator
        .evaluate(&args.expr)
        .with_context(|| format!("failed to evaluate `{}`", args.expr))?;
    print_line(&value.to_string())
}

/// Print to stdout, treating a closed pipe (`luz … | head`) as success.
fn print_line(line: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => Ok(other?),
    }
}
