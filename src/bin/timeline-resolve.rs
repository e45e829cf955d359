use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "timeline-resolve", version)]
struct Cli {
    /// Log more to stderr (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a timeline and print every object's instances as JSON.
    Resolve(ResolveArgs),
    /// Resolve a timeline and print the state at one instant as JSON.
    State(StateArgs),
    /// Check a timeline without resolving it.
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct ResolveOpts {
    /// Reference time for repeating objects.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Repetitions emitted per repeating instance.
    #[arg(long)]
    limit_count: Option<usize>,

    /// No repetition starts at or after this time.
    #[arg(long)]
    limit_time: Option<f64>,

    /// Fixpoint depth for layer conflicts.
    #[arg(long)]
    conflict_max_depth: Option<usize>,
}

impl ResolveOpts {
    fn to_options(&self) -> timeline_resolver::ResolveOptions {
        timeline_resolver::ResolveOptions {
            limit_count: self.limit_count,
            limit_time: self.limit_time,
            conflict_max_depth: self.conflict_max_depth,
            ..timeline_resolver::ResolveOptions::at(self.time)
        }
    }
}

#[derive(Parser, Debug)]
struct ResolveArgs {
    /// Input timeline JSON (an array of objects).
    #[arg(long = "in")]
    in_path: PathBuf,

    #[command(flatten)]
    opts: ResolveOpts,
}

#[derive(Parser, Debug)]
struct StateArgs {
    /// Input timeline JSON (an array of objects).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Instant to project.
    #[arg(long)]
    at: f64,

    /// Maximum number of upcoming events.
    #[arg(long)]
    events: Option<usize>,

    #[command(flatten)]
    opts: ResolveOpts,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input timeline JSON (an array of objects).
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Resolve(args) => cmd_resolve(args),
        Command::State(args) => cmd_state(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_timeline_json(path: &Path) -> anyhow::Result<Vec<timeline_resolver::TimelineObject>> {
    let f = File::open(path).with_context(|| format!("open timeline '{}'", path.display()))?;
    let r = BufReader::new(f);
    let objects: Vec<timeline_resolver::TimelineObject> =
        serde_json::from_reader(r).with_context(|| "parse timeline JSON")?;
    Ok(objects)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).context("write JSON")?;
    writeln!(out).context("write JSON")?;
    Ok(())
}

fn cmd_resolve(args: ResolveArgs) -> anyhow::Result<()> {
    let objects = read_timeline_json(&args.in_path)?;
    let resolved = timeline_resolver::resolve_timeline(&objects, &args.opts.to_options())
        .with_context(|| format!("resolve '{}'", args.in_path.display()))?;
    print_json(&resolved)
}

fn cmd_state(args: StateArgs) -> anyhow::Result<()> {
    let objects = read_timeline_json(&args.in_path)?;
    let resolved = timeline_resolver::resolve_timeline(&objects, &args.opts.to_options())
        .with_context(|| format!("resolve '{}'", args.in_path.display()))?;
    let state = timeline_resolver::get_state(&resolved, args.at, args.events);
    print_json(&state)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let objects = read_timeline_json(&args.in_path)?;
    timeline_resolver::validate_timeline(&objects)?;
    println!("ok");
    Ok(())
}
