use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;
use concord_crypto::ContentHasher;
use concord_diff::{compare, diff_events};
use concord_ledger::{
    parse, verify_with, GitPriorRevision, GuardError, GuardPolicy, LedgerStore,
    PriorRevisionProvider, SeedOutcome, SnapshotFile,
};
use concord_merge::summarize;
use concord_sync::{
    build_packet, encode_packet, fetch_receipts, read_packet, write_packet, HelloRequest,
};
use concord_types::{ErrorClass, EVENT_KIND_SYNC_ANCHOR};

use crate::cli::*;
use crate::config::{ConcordConfig, Settings};
use crate::exit::{Failure, Status};

pub fn run_command(cli: Cli) -> anyhow::Result<Status> {
    let config = ConcordConfig::discover(&cli.root, cli.config.as_deref())?;
    let settings = Settings::new(cli.root, config, cli.ledger);

    match cli.command {
        Command::Ledger(LedgerArgs { action }) => match action {
            LedgerAction::Init => cmd_ledger_init(&settings),
            LedgerAction::Append(args) => cmd_ledger_append(&settings, args),
            LedgerAction::Verify(args) => cmd_ledger_verify(&settings, args),
            LedgerAction::Show(args) => cmd_ledger_show(&settings, args),
        },
        Command::Hello(HelloArgs { action }) => match action {
            HelloAction::Emit(args) => cmd_hello_emit(&settings, args),
            HelloAction::Diff(args) => cmd_hello_diff(args),
            HelloAction::Merge(args) => cmd_hello_merge(&settings, args),
            HelloAction::Fetch(args) => cmd_hello_fetch(&settings, args),
        },
    }
}

fn cmd_ledger_init(settings: &Settings) -> anyhow::Result<Status> {
    let store = LedgerStore::new(settings.ledger_path());
    match store.seed()? {
        SeedOutcome::Created => println!(
            "{} Seeded ledger at {}",
            "✓".green().bold(),
            store.path().display().to_string().bold()
        ),
        SeedOutcome::AlreadyPresent => println!(
            "Ledger already present at {}",
            store.path().display().to_string().bold()
        ),
    }
    Ok(Status::Success)
}

fn cmd_ledger_append(settings: &Settings, args: AppendArgs) -> anyhow::Result<Status> {
    let store = LedgerStore::new(settings.ledger_path());
    let actor = settings.actor(args.by);
    let event = store.append(&args.note, &actor, &args.kind)?;
    println!("{} Appended {} event", "✓".green().bold(), event.kind.cyan());
    println!("  By: {}", event.by);
    println!("  At: {}", event.ts.as_deref().unwrap_or_default());
    println!(
        "  Prev: {}",
        event.prev_content_hash.as_deref().unwrap_or_default().yellow()
    );
    Ok(Status::Success)
}

fn cmd_ledger_verify(settings: &Settings, args: VerifyArgs) -> anyhow::Result<Status> {
    let path = settings.ledger_path();
    let provider: Box<dyn PriorRevisionProvider> = match args.against {
        Some(snapshot) => Box::new(SnapshotFile::new(snapshot)),
        None => Box::new(GitPriorRevision::new(
            args.rev
                .unwrap_or_else(|| settings.config.guard.prior_rev.clone()),
        )),
    };
    let policy = GuardPolicy {
        strict_single_append: args.strict || settings.config.guard.strict_single_append,
    };

    match verify_with(provider.as_ref(), &path, &policy) {
        Ok(outcome) => {
            println!("{}", outcome.signal().green().bold());
            for warning in outcome.warnings() {
                eprintln!("{} {warning}", "WARN[policy]:".yellow().bold());
            }
            Ok(Status::Success)
        }
        Err(err) => Err(guard_failure(err, provider.as_ref(), &path)),
    }
}

/// Integrity failures get their kind name in the message; a prefix mutation
/// also gets a line diff of the altered event.
fn guard_failure(
    err: GuardError,
    provider: &dyn PriorRevisionProvider,
    path: &Path,
) -> anyhow::Error {
    if err.class() != ErrorClass::Integrity {
        return err.into();
    }
    let details = match err {
        GuardError::PrefixMutation { index } => prefix_delta(provider, path, index),
        _ => Vec::new(),
    };
    Failure::new(err.class(), format!("{}: {err}", err.kind()))
        .with_details(details)
        .into()
}

fn prefix_delta(provider: &dyn PriorRevisionProvider, path: &Path, index: usize) -> Vec<String> {
    let head = match provider.prior(path) {
        Ok(Some(bytes)) => bytes,
        _ => return Vec::new(),
    };
    let Ok(current) = std::fs::read(path) else {
        return Vec::new();
    };
    let (Ok(head), Ok(current)) = (parse(&head, "head"), parse(&current, "current")) else {
        return Vec::new();
    };
    match (head.events.get(index), current.events.get(index)) {
        (Some(committed), Some(edited)) => diff_events(committed, edited)
            .changes()
            .map(ToString::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn cmd_ledger_show(settings: &Settings, args: ShowArgs) -> anyhow::Result<Status> {
    let store = LedgerStore::new(settings.ledger_path());
    let bytes = store.read_bytes()?;
    let ledger = parse(&bytes, &store.path().display().to_string())?;

    println!(
        "{} {} (version {}, {})",
        "Ledger".bold(),
        store.path().display(),
        ledger.version,
        ledger.policy
    );
    println!("  Tip hash: {}", ContentHasher::hash_bytes(&bytes).to_string().yellow());
    if ledger.is_empty() {
        println!("\nNo events.");
        return Ok(Status::Success);
    }

    let skip = args
        .limit
        .map_or(0, |limit| ledger.len().saturating_sub(limit));
    for (index, event) in ledger.events.iter().enumerate().skip(skip) {
        let prev = event
            .prev_content_hash
            .as_deref()
            .map_or("-", |p| p.get(..12).unwrap_or(p));
        println!(
            "{}  {}  {} [{}]",
            format!("#{index}").yellow().bold(),
            event.ts.as_deref().unwrap_or("-").dimmed(),
            event.by.cyan(),
            event.kind
        );
        println!("  {}", event.note);
        println!("  prev {}", prev.dimmed());
    }
    Ok(Status::Success)
}

fn cmd_hello_emit(settings: &Settings, args: EmitArgs) -> anyhow::Result<Status> {
    let request = HelloRequest {
        root: settings.root.clone(),
        instance_id: settings.instance_id(args.instance_id)?,
        commandments_path: args
            .commandments
            .unwrap_or_else(|| settings.config.commandments.clone()),
        anchors_path: args
            .anchors
            .unwrap_or_else(|| settings.ledger().to_string()),
        receipt_paths: Settings::list_or_config(args.receipts, &settings.config.receipts),
        capabilities: Settings::list_or_config(args.capabilities, &settings.config.capabilities),
    };
    let packet = build_packet(&request)?;

    match args.output {
        Some(path) if path != Path::new("-") => {
            write_packet(&packet, &path)?;
            println!(
                "{} Hello packet for {} written to {}",
                "✓".green().bold(),
                packet.instance_id.cyan(),
                path.display().to_string().bold()
            );
            println!("  Receipts: {}", packet.receipts.len());
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&encode_packet(&packet)?)?;
            stdout.flush()?;
        }
    }
    Ok(Status::Success)
}

fn cmd_hello_diff(args: PairArgs) -> anyhow::Result<Status> {
    let left = read_packet(&args.left)?;
    let right = read_packet(&args.right)?;
    let differences = compare(&left, &right);

    if differences.is_empty() {
        println!(
            "{} {} and {} match",
            "✓".green().bold(),
            left.instance_id.cyan(),
            right.instance_id.cyan()
        );
        return Ok(Status::Success);
    }
    println!(
        "{} {} and {} differ ({} difference(s))",
        "✗".red().bold(),
        left.instance_id.cyan(),
        right.instance_id.cyan(),
        differences.len()
    );
    for diff in &differences {
        println!("  {diff}");
    }
    Ok(Status::Mismatch)
}

fn cmd_hello_merge(settings: &Settings, args: MergeArgs) -> anyhow::Result<Status> {
    let left = read_packet(&args.pair.left)?;
    let right = read_packet(&args.pair.right)?;
    let summary = summarize(&left, &right);

    let glyph = if summary.matches {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{glyph} {}", summary.anchor_note);

    if let Some(path) = &args.output {
        summary.write(path)?;
        println!("  Summary: {}", path.display().to_string().bold());
    }

    if args.append {
        if summary.matches {
            let store = LedgerStore::new(settings.ledger_path());
            let event = store.append(
                &summary.anchor_note,
                &settings.actor(None),
                EVENT_KIND_SYNC_ANCHOR,
            )?;
            println!(
                "  Anchored in {} (prev {})",
                store.path().display(),
                event.prev_content_hash.as_deref().unwrap_or_default().yellow()
            );
        } else {
            eprintln!(
                "{} packets differ; anchor not appended",
                "WARN[policy]:".yellow().bold()
            );
        }
    }
    Ok(Status::Success)
}

fn cmd_hello_fetch(settings: &Settings, args: FetchArgs) -> anyhow::Result<Status> {
    let peer = read_packet(&args.peer)?;
    let report = fetch_receipts(&peer, &settings.root, &args.dest)?;

    for path in &report.copied {
        println!("  {} {}", "copied:".green(), path);
    }
    for path in &report.mismatched {
        eprintln!(
            "{} {path} differs from {}'s digest",
            "WARN[policy]:".yellow().bold(),
            peer.instance_id
        );
    }

    if !report.is_complete() {
        let total = peer.receipts.len();
        return Err(Failure::new(
            ErrorClass::Resource,
            format!(
                "{} of {total} receipts referenced by {} are missing locally",
                report.missing.len(),
                peer.instance_id
            ),
        )
        .with_details(
            report
                .missing
                .iter()
                .map(|p| format!("missing: {p}"))
                .collect(),
        )
        .into());
    }

    println!(
        "{} Fetched {} receipt(s) from {}",
        "✓".green().bold(),
        report.copied.len(),
        peer.instance_id.cyan()
    );
    Ok(Status::Success)
}
