use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use docmark::config::DEFAULT_MAX_DISTANCE;
use docmark::services::diff::DEFAULT_CONTEXT_LINES;

#[derive(Parser, Debug)]
#[command(
    name = "docmark",
    version,
    about = "Search, entity highlighting and diffing for extracted document text"
)]
pub struct Cli {
    /// Term/comment store (defaults to DOCMARK_DB, then the user data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute highlights and search hits for a document
    View(ViewArgs),
    /// Unified line diff of two documents
    Diff(DiffArgs),
    /// Manage saved search terms
    #[command(subcommand)]
    Terms(TermsCommand),
    /// Attach a note to a snippet of a document
    Comment(CommentArgs),
    /// List saved searches and comments
    Admin(AdminArgs),
    /// Print a PDF's native bookmarks
    Outline(OutlineArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    pub file: PathBuf,

    /// Extra terms searched alongside the saved ones
    #[arg(long = "term")]
    pub terms: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub max_distance: u8,

    /// Skip the pipeline fetch and use empty TOC/NER data
    #[arg(long, default_value_t = false)]
    pub simulate: bool,

    /// Only show entities with these labels
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Only show matches for these terms
    #[arg(long = "only-term")]
    pub only_terms: Vec<String>,

    /// 1-based page to list highlights for
    #[arg(long)]
    pub goto_page: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct DiffArgs {
    pub a: PathBuf,
    pub b: PathBuf,

    #[arg(long, default_value_t = DEFAULT_CONTEXT_LINES)]
    pub context: usize,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TermsCommand {
    Add { term: String },
    List,
}

#[derive(Args, Debug, Clone)]
pub struct CommentArgs {
    #[arg(long)]
    pub file: String,

    #[arg(long)]
    pub snippet: String,

    #[arg(long)]
    pub note: String,
}

#[derive(Args, Debug, Clone)]
pub struct AdminArgs {
    /// Export comments as Markdown instead of listing everything as JSON
    #[arg(long, default_value_t = false)]
    pub markdown: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OutlineArgs {
    pub file: PathBuf,
}
