// Progress-bar lengths are batch sizes, well within u64.
#![allow(clippy::cast_possible_truncation)]

//! Titleblock CLI - title-block extraction and validation pipeline
//!
//! Runs the extraction, cleaning, revision, compare and master-validation
//! stages over a project directory, individually or as a full pipeline,
//! and exposes a read-only search over the validated table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use titleblock_core::FieldName;
use titleblock_pipeline::{Pipeline, PipelineConfig, ResumeToken, Stage};

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (default)
    Normal,
    /// Verbose output with extra details
    Verbose,
}

impl Verbosity {
    /// Create from CLI flags
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Check if output should be shown (not quiet)
    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Check if verbose output is requested
    const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "titleblock",
    about = "Extract and validate title-block metadata from scanned drawings",
    long_about = "Extract structured metadata from noisy OCR output of scanned\n\
                  engineering drawings, reconcile conflicting revision signals,\n\
                  and validate the result against the master rule catalog.\n\
                  \n\
                  Stages read and replace whole artifacts under the project\n\
                  directory, so each stage is re-runnable from its input.",
    version
)]
struct Args {
    /// Directory holding collaborator dumps and stage artifacts
    #[arg(short, long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Master rule workbook (.xlsx) or rule CSV (.csv); defaults to
    /// master_rules.xlsx in the project directory
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Edit budget for the drawing-number filename repair
    #[arg(long, global = true, default_value_t = 1)]
    edit_budget: usize,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fold collaborator detections into the raw record batch
    #[command(long_about = "Fold collaborator detections into the raw record batch.\n\
                      \n\
                      Reads stamp_detections.json (the detector + OCR hand-off)\n\
                      and writes raw_extraction.csv, one row per drawing.")]
    Extract,

    /// Normalize every field and apply filename-evidence repairs
    #[command(long_about = "Normalize every field and apply filename-evidence repairs.\n\
                      \n\
                      Reads raw_extraction.csv and writes cleaning_file.csv. The\n\
                      sheet number is checked against trailing filename digits and\n\
                      the drawing number is repaired from the document key when it\n\
                      is within the edit budget.")]
    Clean,

    /// Resolve one authoritative revision code per image
    #[command(long_about = "Resolve one authoritative revision code per image.\n\
                      \n\
                      Reads revision_detections.json (region detections pooled\n\
                      across preprocessing variants) and writes\n\
                      revision_extraction.csv with FILE, FINAL_REV and REV_DATE.")]
    Revision,

    /// Merge revision results and check cross-source consistency
    #[command(long_about = "Merge revision results and check cross-source consistency.\n\
                      \n\
                      Left-joins cleaning_file.csv with revision_extraction.csv on\n\
                      the document key, zero-pads the sheet number and derives\n\
                      REV_STATUS. Writes raw_validated.csv.")]
    Compare,

    /// Validate the merged batch against the master rule catalog
    #[command(long_about = "Validate the merged batch against the master rule catalog.\n\
                      \n\
                      Reads raw_validated.csv and the rule source, flags every\n\
                      field violating its Value or Pattern rule, and writes\n\
                      validation_file.csv, the flag sidecar and the HTML report.")]
    Validate,

    /// Run the full pipeline, stage by stage
    Run {
        /// Skip stages the resume token records as complete
        #[arg(long)]
        resume: bool,
    },

    /// Filter the validated table by exact field equality
    #[command(long_about = "Filter the validated table by exact field equality.\n\
                      \n\
                      The clause is an AND-joined list of LABEL = 'VALUE'\n\
                      conditions, e.g. \"FORMAT = 'A1' AND REV_STATUS = 'ERROR'\".\n\
                      Clauses containing statement separators or mutating keywords\n\
                      are rejected and yield an empty result.")]
    Search {
        /// Filter clause; empty lists the first rows up to the cap
        #[arg(default_value = "")]
        clause: String,

        /// Result-size cap
        #[arg(long, default_value_t = titleblock_query::DEFAULT_TOP_N)]
        top: usize,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    let mut config = PipelineConfig::new(&args.project_dir).with_edit_budget(args.edit_budget);
    if let Some(rules) = args.rules {
        config = config.with_master_rules(rules);
    }
    let pipeline = Pipeline::new(config);

    match args.command {
        Commands::Extract => stage_command(&pipeline, Stage::Extract, verbosity),
        Commands::Clean => stage_command(&pipeline, Stage::Clean, verbosity),
        Commands::Revision => stage_command(&pipeline, Stage::Revision, verbosity),
        Commands::Compare => stage_command(&pipeline, Stage::Compare, verbosity),
        Commands::Validate => stage_command(&pipeline, Stage::Master, verbosity),
        Commands::Run { resume } => run_command(&pipeline, resume, verbosity),
        Commands::Search { clause, top } => search_command(&pipeline, &clause, top, verbosity),
    }
}

fn stage_command(pipeline: &Pipeline, stage: Stage, verbosity: Verbosity) -> Result<()> {
    pipeline
        .run_stage(stage)
        .with_context(|| format!("stage {stage} failed"))?;
    if verbosity.should_show_output() {
        println!("{} stage {stage} complete", "✓".green().bold());
    }
    Ok(())
}

fn run_command(pipeline: &Pipeline, resume: bool, verbosity: Verbosity) -> Result<()> {
    let token = if resume {
        ResumeToken::load(&pipeline.config().resume_token())
            .context("failed to read resume token")?
    } else {
        None
    };

    let progress = if verbosity.should_show_output() {
        let pb = ProgressBar::new(Stage::ALL.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("template is compile-time constant")
                .progress_chars("█▓▒░  "),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    for stage in Stage::ALL {
        progress.set_message(stage.to_string());
        if let Some(token) = token {
            if token.covers(stage) {
                if verbosity.is_verbose() {
                    progress.println(format!("stage {stage} skipped (resume token)"));
                }
                progress.inc(1);
                continue;
            }
        }
        pipeline
            .run_stage(stage)
            .with_context(|| format!("stage {stage} failed"))?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    if verbosity.should_show_output() {
        println!(
            "{} pipeline complete: {}",
            "✓".green().bold(),
            pipeline.config().validation_file().display()
        );
    }
    Ok(())
}

fn search_command(pipeline: &Pipeline, clause: &str, top: usize, verbosity: Verbosity) -> Result<()> {
    let records = pipeline
        .load_validated()
        .context("no validated table found; run the pipeline first")?;

    let hits = titleblock_query::search(&records, clause, top);
    for record in &hits {
        if verbosity.is_verbose() {
            let fields: Vec<String> = FieldName::ALL
                .iter()
                .filter(|f| !record.get(**f).is_empty())
                .map(|f| format!("{f}={}", record.get(*f)))
                .collect();
            println!(
                "{}  REV_STATUS={}  {}",
                record.image,
                record.rev_status,
                fields.join("  ")
            );
        } else {
            println!("{}", record.image);
        }
    }

    if verbosity.should_show_output() {
        println!(
            "{} {} of {} records matched",
            "✓".green().bold(),
            hits.len(),
            records.len()
        );
    }
    Ok(())
}
