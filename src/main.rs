//! provlog CLI: split, repair and inspect Preston provenance logs.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use provlog::config::SplitConfig;
use provlog::error::{ProvError, ProvResult};
use provlog::generation::{IdScheme, IdSource, SequentialIds, UuidIds};
use provlog::graph::GraphIndex;
use provlog::nquads;
use provlog::partition::runner;
use provlog::patch;
use provlog::stats::GraphStats;

#[derive(Parser)]
#[command(name = "provlog", version, about = "Split and repair PROV provenance logs")]
struct Cli {
    /// More log output: -v info, -vv debug, -vvv trace. RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a crawl log into one log per source.
    Split {
        /// Log to read; standard input when absent or "-".
        input: Option<PathBuf>,

        /// TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Plan file replacing the bundled GBIF / iDigBio / BioCASe plan.
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Directory for the per-source logs.
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// File name prefix for the per-source logs.
        #[arg(long)]
        prefix: Option<String>,

        /// Number of routed lines kept rewindable.
        #[arg(long)]
        window: Option<usize>,

        /// Output path for one sink, e.g. `--output gbif=gbif.nq`. Repeatable.
        #[arg(long = "output", value_name = "NAME=PATH", value_parser = parse_output)]
        outputs: Vec<(String, PathBuf)>,

        #[command(flatten)]
        ids: IdArgs,
    },

    /// Print qualified generations for every download in a log.
    Patch {
        /// Log to read; standard input when absent or "-".
        input: Option<PathBuf>,

        #[command(flatten)]
        ids: IdArgs,
    },

    /// Show node, predicate and statement counts of a log.
    Stats {
        /// Log to read; standard input when absent or "-".
        input: Option<PathBuf>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Validate a log and print it in canonical form.
    Parse {
        /// Log to read; standard input when absent or "-".
        input: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct IdArgs {
    /// Write new identifiers as `<uuid>` instead of `<urn:uuid:uuid>`.
    #[arg(long)]
    bare_uuid: bool,

    /// Number new identifiers sequentially for reproducible output.
    #[arg(long)]
    sequential_ids: bool,
}

impl IdArgs {
    fn source(&self, default: IdScheme) -> Box<dyn IdSource> {
        let scheme = if self.bare_uuid { IdScheme::BareUuid } else { default };
        if self.sequential_ids {
            Box::new(SequentialIds::new(scheme))
        } else {
            Box::new(UuidIds::new(scheme))
        }
    }
}

fn parse_output(arg: &str) -> std::result::Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got {arg:?}")),
    }
}

fn open_input(path: Option<&Path>) -> ProvResult<Box<dyn BufRead>> {
    match path {
        None => Ok(Box::new(std::io::stdin().lock())),
        Some(p) if p == Path::new("-") => Ok(Box::new(std::io::stdin().lock())),
        Some(p) => {
            let file = File::open(p).map_err(|e| ProvError::io(format!("opening {}", p.display()), e))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

fn load_index(input: Option<&Path>) -> ProvResult<GraphIndex> {
    let mut index = GraphIndex::new();
    index.ingest_reader(open_input(input)?)?;
    Ok(index)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    match cli.command {
        Commands::Split {
            input,
            config,
            plan,
            out_dir,
            prefix,
            window,
            outputs,
            ids,
        } => {
            let mut config = match &config {
                Some(path) => SplitConfig::load(path)?,
                None => SplitConfig::default(),
            };
            if plan.is_some() {
                config.plan = plan;
            }
            if let Some(dir) = out_dir {
                config.output_dir = dir;
            }
            if let Some(prefix) = prefix {
                config.output_prefix = prefix;
            }
            if let Some(window) = window {
                config.window = window;
            }
            config.outputs.extend(outputs);
            config.validate("command line")?;

            let plan = config.load_plan()?;
            config.check_outputs(&plan)?;

            std::fs::create_dir_all(&config.output_dir).into_diagnostic()?;
            let mut paths = Vec::with_capacity(plan.sinks().len());
            let mut writers = Vec::with_capacity(plan.sinks().len());
            for sink in plan.sinks() {
                let path = config.output_path(sink);
                let file = File::create(&path)
                    .map_err(|e| ProvError::io(format!("creating {}", path.display()), e))?;
                writers.push(BufWriter::new(file));
                paths.push(path);
            }

            let input = open_input(input.as_deref())?;
            let (report, summary) =
                runner::split(input, &plan, writers, &config, ids.source(config.id_scheme))?;

            println!("Split {} lines in {} run(s) with plan \"{}\"", summary.lines_read, report.runs, plan.name());
            for (sink, path) in summary.sinks.iter().zip(&paths) {
                println!("  {:<10} {:>8} lines -> {}", sink.name(), sink.lines(), path.display());
            }
            if summary.rewrite.synthesized > 0 || summary.rewrite.relabeled > 0 {
                println!(
                    "Synthesized {} generation(s), relabeled {} predicate(s)",
                    summary.rewrite.synthesized, summary.rewrite.relabeled
                );
            }
            for (run, step) in &report.absent {
                println!("  run {run}: section at step {step} absent");
            }
        }

        Commands::Patch { input, ids } => {
            let index = load_index(input.as_deref())?;
            let mut ids = ids.source(IdScheme::default());
            let stdout = std::io::stdout().lock();
            patch::write_patch(&index, ids.as_mut(), BufWriter::new(stdout))?;
        }

        Commands::Stats { input, json } => {
            let index = load_index(input.as_deref())?;
            let stats = GraphStats::collect(&index);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?);
            } else {
                print!("{stats}");
            }
        }

        Commands::Parse { input } => {
            let reader = open_input(input.as_deref())?;
            let mut out = BufWriter::new(std::io::stdout().lock());
            let mut count = 0usize;
            for (i, line) in reader.lines().enumerate() {
                let line = line.into_diagnostic()?;
                if let Some(quad) = nquads::parse_line(&line, i + 1).map_err(ProvError::from)? {
                    writeln!(out, "{quad}").into_diagnostic()?;
                    count += 1;
                }
            }
            out.flush().into_diagnostic()?;
            tracing::info!(statements = count, "parsed");
        }
    }

    Ok(())
}
