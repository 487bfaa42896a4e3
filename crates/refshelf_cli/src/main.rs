//! `refshelf` command-line entry point.
//!
//! # Responsibility
//! - Parse commands, load configuration, and bootstrap logging.
//! - Wire the Zotero store and the Anthropic client into the organizer.
//! - Print human-readable progress for each workflow.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use refshelf_core::service::tagger::TaggingReport;
use refshelf_core::taxonomy::proposal::{load_proposal, raw_reply_path, DEFAULT_PROPOSAL_FILE};
use refshelf_core::{
    init_logging, open_db, AnthropicClient, ClassificationOutcome, Collection, CollectionId,
    LibraryStore, Organizer, OrganizerConfig, OrganizerError, SqliteLibraryStore,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "refshelf", version, about = "Organize a Zotero library with an LLM")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true, default_value = refshelf_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Suggest keywords for every unclassified paper.
    Keywords,
    /// Propose a collection hierarchy from library keywords.
    Propose {
        #[arg(long, short, default_value = DEFAULT_PROPOSAL_FILE)]
        output: PathBuf,
    },
    /// Replace all collections with the hierarchy in a proposal file.
    Implement { structure: PathBuf },
    /// Assign unclassified papers to collections.
    Classify {
        /// Proposal file listing candidate paths; defaults to the live tree.
        #[arg(long)]
        structure: Option<PathBuf>,
    },
    /// Print the live collection tree with paper counts.
    Tree,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = OrganizerConfig::load(&cli.config)
        .with_context(|| format!("loading config `{}`", cli.config.display()))?;
    let log_dir = absolute(config.log_dir()?)?;
    init_logging(config.log_level(), &log_dir).map_err(anyhow::Error::msg)?;

    let db_path = config.database_path()?;
    let conn = open_db(&db_path)
        .with_context(|| format!("opening Zotero database `{}`", db_path.display()))?;
    let store = SqliteLibraryStore::try_new(&conn)?;
    info!(
        "event=cli_start module=cli status=ok command={:?} db={}",
        cli.command,
        db_path.display()
    );

    if let Command::Tree = cli.command {
        print_tree(&store)?;
        return Ok(ExitCode::SUCCESS);
    }

    let client = AnthropicClient::new(&config.api_key()?, config.api_base_url.as_deref())?;
    let organizer = Organizer::new(store, client, config.organizer_settings());

    match cli.command {
        Command::Keywords => {
            let reports = organizer.tag_unclassified_papers()?;
            for report in &reports {
                print_tagging(report);
            }
            println!("Tagged {} papers.", reports.len());
        }
        Command::Propose { output } => match organizer.propose_structure_to(&output) {
            Ok(taxonomy) => {
                println!(
                    "Proposed {} collections; review and edit `{}` before implementing.",
                    taxonomy.total_entries(),
                    output.display()
                );
            }
            Err(err @ OrganizerError::Extract { .. }) => {
                eprintln!("error: {err}");
                eprintln!(
                    "Raw reply saved to `{}`.",
                    raw_reply_path(&output).display()
                );
                return Ok(ExitCode::FAILURE);
            }
            Err(err) => return Err(err.into()),
        },
        Command::Implement { structure } => {
            let taxonomy = load_proposal(&structure)?;
            let report = organizer.implement_structure(&taxonomy)?;
            println!("Created {} collections.", report.created);
        }
        Command::Classify { structure } => {
            let taxonomy = structure.as_deref().map(load_proposal).transpose()?;
            let reports = organizer.classify_unclassified_papers(taxonomy.as_ref())?;
            let mut assigned = 0;
            for report in &reports {
                println!("{}", report.title);
                match &report.outcome {
                    ClassificationOutcome::Assigned { paths, .. } => {
                        assigned += 1;
                        for path in paths {
                            println!("  -> {path}");
                        }
                    }
                    ClassificationOutcome::NoMatch { candidates } => {
                        println!("  no matching collection ({} suggested)", candidates.len());
                    }
                }
            }
            println!("Classified {assigned} of {} papers.", reports.len());
        }
        Command::Tree => {}
    }
    Ok(ExitCode::SUCCESS)
}

fn print_tagging(report: &TaggingReport) {
    println!("{}", report.title);
    if report.added.is_empty() {
        println!("  no new keywords");
    } else {
        println!("  + {}", report.added.join(", "));
    }
}

fn print_tree<S: LibraryStore>(store: &S) -> Result<()> {
    let collections = store.list_collections()?;
    let known: HashSet<CollectionId> = collections.iter().map(|c| c.id).collect();
    let mut children: HashMap<Option<CollectionId>, Vec<&Collection>> = HashMap::new();
    for collection in &collections {
        let parent = collection.parent_id.filter(|id| known.contains(id));
        children
            .entry(parent)
            .or_default()
            .push(collection);
    }
    if collections.is_empty() {
        println!("(no collections)");
        return Ok(());
    }
    print_level(store, &children, None, 0)
}

fn print_level<S: LibraryStore>(
    store: &S,
    children: &HashMap<Option<CollectionId>, Vec<&Collection>>,
    parent: Option<CollectionId>,
    depth: usize,
) -> Result<()> {
    let Some(level) = children.get(&parent) else {
        return Ok(());
    };
    for collection in level {
        let papers = store.list_collection_papers(collection.id)?.len();
        println!("{}{} ({papers})", "  ".repeat(depth), collection.name);
        // Collections on a parent cycle are never reached from a root.
        print_level(store, children, Some(collection.id), depth + 1)?;
    }
    Ok(())
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(std::env::current_dir()?.join(path))
}
