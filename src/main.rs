mod cli;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use pdfium_render::prelude::Pdfium;
use serde::Serialize;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use docmark::config::Config;
use docmark::services::diff;
use docmark::services::extract::{self, FileKind, LoadedDocument};
use docmark::services::highlights::{
    HighlightOutput, MAX_LISTED_HITS, RecomputeInput, SearchHit, ViewState, recompute,
};
use docmark::services::outline::{self, OutlineEntry};
use docmark::services::pipeline::{MemoryCache, PipelineClient, PipelineData};
use docmark::services::resolver::PageSearch;
use docmark::services::store::{CommentRecord, SearchTermRecord, Store};

use crate::cli::{AdminArgs, Cli, Commands, CommentArgs, DiffArgs, OutlineArgs, TermsCommand, ViewArgs};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }

    match cli.command {
        Commands::View(args) => run_view(args, config),
        Commands::Diff(args) => run_diff(args, &config),
        Commands::Terms(command) => run_terms(command, &config),
        Commands::Comment(args) => run_comment(args, &config),
        Commands::Admin(args) => run_admin(args, &config),
        Commands::Outline(args) => run_outline(args, &config),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Serialize)]
struct ViewOutput {
    file: String,
    pages: usize,
    highlights: Vec<HighlightOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_highlights: Option<Vec<HighlightOutput>>,
    hits: Vec<SearchHit>,
    dropped: usize,
    outline: Vec<OutlineEntry>,
    warnings: Vec<String>,
}

fn run_view(args: ViewArgs, mut config: Config) -> Result<()> {
    config.simulate = args.simulate;

    let name = file_name(&args.file);
    let kind = FileKind::from_name(&name)?;
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Could not read {}", args.file.display()))?;
    let pdfium = bind_pdfium_for(&[kind], &config)?;
    let loaded = extract::load_document(pdfium.as_ref(), &bytes, &name)?;

    let cache = MemoryCache::new();
    let mut data = if config.simulate {
        PipelineData::simulated()
    } else {
        match PipelineClient::new(&config, &cache) {
            Ok(client) => PipelineData::load(Some(&client), &name),
            Err(e) => {
                warn!(error = %e, "pipeline client unavailable, continuing without TOC/NER");
                PipelineData {
                    warnings: vec![e.to_string()],
                    ..PipelineData::default()
                }
            }
        }
    };

    let store = match open_store(&config) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "store unavailable, using ad-hoc terms only");
            None
        }
    };

    let mut terms: Vec<String> = match &store {
        Some(store) => store.terms().unwrap_or_else(|e| {
            warn!(error = %e, "could not read saved terms");
            Vec::new()
        }),
        None => Vec::new(),
    };
    for term in args.terms {
        let term = term.trim();
        if !term.is_empty() && !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
    }

    let view = ViewState {
        active_labels: non_empty_set(args.labels),
        active_terms: non_empty_set(args.only_terms),
        selected_page: args.goto_page.map(|p| p.saturating_sub(1)),
        ..ViewState::default()
    }
    .with_max_distance(args.max_distance);

    let renderer = loaded.renderer.as_ref().map(|r| r as &dyn PageSearch);
    if renderer.is_none() {
        data.warnings
            .push("Non-PDF preview not supported; search matches are listed but not placed".to_string());
    }

    let input = RecomputeInput {
        document: &loaded.text,
        terms: &terms,
        entities: &data.entities,
    };
    let result = recompute(input, &view, renderer);

    if let Some(store) = &store {
        for (term, count) in &result.hit_counts {
            if let Err(e) = store.record_hits(term, *count) {
                warn!(error = %e, term, "could not record hit count");
            }
        }
    }

    let output = ViewOutput {
        file: name,
        pages: loaded.text.page_count(),
        highlights: result.output(),
        page_highlights: view
            .selected_page
            .map(|page| result.highlights_on(page).map(|h| h.output()).collect()),
        hits: result.hits.iter().take(MAX_LISTED_HITS).cloned().collect(),
        dropped: result.dropped,
        outline: outline::merge_outline(std::mem::take(&mut data.outline), loaded.native_outline()),
        warnings: data.warnings,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_diff(args: DiffArgs, config: &Config) -> Result<()> {
    let (name_a, name_b) = (file_name(&args.a), file_name(&args.b));
    let kinds = [FileKind::from_name(&name_a)?, FileKind::from_name(&name_b)?];

    let bytes_a = std::fs::read(&args.a)
        .with_context(|| format!("Could not read {}", args.a.display()))?;
    let bytes_b = std::fs::read(&args.b)
        .with_context(|| format!("Could not read {}", args.b.display()))?;

    let pdfium = bind_pdfium_for(&kinds, config)?;
    let doc_a = extract::load_document(pdfium.as_ref(), &bytes_a, &name_a)?;
    let doc_b = extract::load_document(pdfium.as_ref(), &bytes_b, &name_b)?;

    let hunks = diff::unified(&doc_a.text.full_text(), &doc_b.text.full_text(), args.context);
    let rendered = diff::render_unified("Doc A", "Doc B", &hunks);
    if !rendered.is_empty() {
        println!("{}", rendered);
    }
    Ok(())
}

fn run_terms(command: TermsCommand, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    match command {
        TermsCommand::Add { term } => {
            if !store.add_term(&term)? {
                warn!(term, "term already saved");
            }
        }
        TermsCommand::List => {
            for record in store.search_records()? {
                println!("{}\t{}", record.term, record.hits);
            }
        }
    }
    Ok(())
}

fn run_comment(args: CommentArgs, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let id = store.add_comment(&args.file, &args.snippet, &args.note)?;
    println!("{}", id);
    Ok(())
}

#[derive(Serialize)]
struct AdminOutput {
    searches: Vec<SearchTermRecord>,
    comments: Vec<CommentRecord>,
}

fn run_admin(args: AdminArgs, config: &Config) -> Result<()> {
    let store = open_store(config)?;

    if args.markdown {
        print!("{}", store.export_comments_markdown("all documents")?);
        return Ok(());
    }

    let output = AdminOutput {
        searches: store.search_records()?,
        comments: store.comments()?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_outline(args: OutlineArgs, config: &Config) -> Result<()> {
    let name = file_name(&args.file);
    let kind = FileKind::from_name(&name)?;
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Could not read {}", args.file.display()))?;
    let pdfium = bind_pdfium_for(&[kind], config)?;
    let loaded: LoadedDocument<'_> = extract::load_document(pdfium.as_ref(), &bytes, &name)?;

    let rendered = outline::render_outline(&loaded.native_outline());
    if !rendered.is_empty() {
        println!("{}", rendered);
    }
    Ok(())
}

/// PDFium is only bound when one of the inputs is a PDF
fn bind_pdfium_for(kinds: &[FileKind], config: &Config) -> Result<Option<Pdfium>> {
    if !kinds.contains(&FileKind::Pdf) {
        return Ok(None);
    }
    Ok(Some(extract::init_pdfium(config.pdfium_dir.as_deref())?))
}

fn open_store(config: &Config) -> Result<Store> {
    let path = config
        .db_path
        .as_deref()
        .context("Could not determine data directory for the store")?;
    Ok(Store::open(path)?)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn non_empty_set(values: Vec<String>) -> Option<BTreeSet<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.into_iter().collect())
    }
}
