use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "concord",
    about = "Concord: append-only governance ledger and instance reconciliation",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Instance root; relative paths resolve against it
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Ledger file (default from config, then `anchors.json`)
    #[arg(long, global = true)]
    pub ledger: Option<String>,

    /// Config file (default `<root>/concord.toml` when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Seed, append to, verify, or list the governance ledger
    Ledger(LedgerArgs),
    /// Exchange and reconcile hello packets with another instance
    Hello(HelloArgs),
}

#[derive(Args)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub action: LedgerAction,
}

#[derive(Subcommand)]
pub enum LedgerAction {
    /// Create the minimal ledger if it does not exist
    Init,
    /// Append one event pinned to the current ledger hash
    Append(AppendArgs),
    /// Check the working ledger against its last committed revision
    Verify(VerifyArgs),
    /// List ledger events
    Show(ShowArgs),
}

#[derive(Args)]
pub struct AppendArgs {
    pub note: String,
    /// Actor recorded in `by` (default from config, then `operator`)
    #[arg(long)]
    pub by: Option<String>,
    /// Event type
    #[arg(long = "type", default_value = concord_types::EVENT_KIND_DEFAULT)]
    pub kind: String,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Compare against a snapshot file instead of git
    #[arg(long, conflicts_with = "rev")]
    pub against: Option<PathBuf>,
    /// Git revision holding the committed ledger (default from config, then HEAD)
    #[arg(long)]
    pub rev: Option<String>,
    /// Fail when more than one event was appended
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Show only the last N events
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct HelloArgs {
    #[command(subcommand)]
    pub action: HelloAction,
}

#[derive(Subcommand)]
pub enum HelloAction {
    /// Build this instance's hello packet
    Emit(EmitArgs),
    /// Compare two hello packets
    Diff(PairArgs),
    /// Summarize two hello packets and draft a synchronization anchor
    Merge(MergeArgs),
    /// Copy receipts referenced by a peer packet into a directory
    Fetch(FetchArgs),
}

#[derive(Args)]
pub struct EmitArgs {
    /// Instance id (default from config)
    pub instance_id: Option<String>,
    #[arg(long = "capability")]
    pub capabilities: Vec<String>,
    #[arg(long = "receipt")]
    pub receipts: Vec<String>,
    /// Commandments document (default from config, then `commandments.md`)
    #[arg(long)]
    pub commandments: Option<String>,
    /// Anchors document (default: the ledger)
    #[arg(long)]
    pub anchors: Option<String>,
    /// Output file; `-` or omitted writes to stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct PairArgs {
    pub left: PathBuf,
    pub right: PathBuf,
}

#[derive(Args)]
pub struct MergeArgs {
    #[command(flatten)]
    pub pair: PairArgs,
    /// Write the summary as a JSON receipt
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Append the anchor note to the local ledger when the packets match
    #[arg(long)]
    pub append: bool,
}

#[derive(Args)]
pub struct FetchArgs {
    pub peer: PathBuf,
    pub dest: PathBuf,
}
