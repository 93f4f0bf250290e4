mod format;
mod tracking;
mod tui;


use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cli::{Cli, Command, ProfileArgs, ReportArgs, TrackArgs};
use crate::paths::database_file_path;
use crate::store::Store;

use self::format::{
    format_position, format_profile_updated_display, format_updated_display, truncate,
};
use self::tracking::{
    HistoryState, HttpRemote, NOT_AUTHENTICATED, ProgressTracker, ResumeUpdate, SYNC_WAIT_TIMEOUT,
    StoredProfileAuth, SyncGate, parse_position_line,
};

pub fn run(cli: Cli) -> Result<()> {
    let store = open_store()?;
    let state = Arc::new(HistoryState::new(store.load_history()));

    match cli.command {
        Some(Command::Track(args)) => run_track(ProgressTracker::new(store, state), args)?,
        Some(Command::Report(args)) => run_report(ProgressTracker::new(store, state), args)?,
        Some(Command::List) => run_list(&store)?,
        Some(Command::Delete { title_id }) => {
            run_delete(ProgressTracker::new(store, state), &title_id)?
        }
        Some(Command::Sync { title_id }) => run_sync(&store, &title_id)?,
        Some(Command::Profile(args)) => run_profile(&store, args)?,
        Some(Command::Tui) | None => tui::run_tui(ProgressTracker::new(store, state))?,
    }

    Ok(())
}

fn run_track(mut tracker: ProgressTracker, args: TrackArgs) -> Result<()> {
    let base = ResumeUpdate::new(
        args.title_id,
        args.episode,
        0.0,
        args.episode_ref,
        args.label,
    );
    println!(
        "Tracking {} episode {} (one position per line on stdin, Ctrl-D to finish)",
        base.title_id, base.episode_number
    );

    let stdin = io::stdin();
    let mut last_position = None;
    let mut malformed_lines = 0usize;
    for line in stdin.lock().lines() {
        let line = line.context("failed to read position event")?;
        let Some(position) = parse_position_line(&line) else {
            if !line.trim().is_empty() {
                malformed_lines += 1;
            }
            continue;
        };
        last_position = Some(position);

        let update = base.with_position(position);
        if let Err(err) = tracker.report(&update) {
            warn!("failed to persist progress update: {err:#}");
        }
    }
    if malformed_lines > 0 {
        eprintln!("Warning: ignored {malformed_lines} malformed position line(s)");
    }

    let Some(position) = last_position else {
        println!("No position events received. Progress unchanged.");
        return Ok(());
    };

    // The session is over: record the final position regardless of where the
    // throttle window stands, then push it to the account on a best-effort
    // bounded wait.
    let update = base.with_position(position);
    tracker.save_final(&update)?;
    println!(
        "Recorded resume point: {} | episode {} at {}",
        update.title_id,
        update.episode_number,
        format_position(update.position_seconds)
    );

    let outcome = {
        let gate = SyncGate::new(StoredProfileAuth::new(tracker.store()), HttpRemote::from_env());
        gate.save_now_bounded(&update, SYNC_WAIT_TIMEOUT)
    };
    if outcome.success {
        println!("Synced resume point to account.");
    } else if let Some(error) = outcome.error {
        if error == NOT_AUTHENTICATED {
            debug!("skipping account sync: {error}");
        } else {
            eprintln!("Warning: account sync failed: {error}");
        }
    }

    Ok(())
}

fn run_report(mut tracker: ProgressTracker, args: ReportArgs) -> Result<()> {
    let update = ResumeUpdate::new(
        args.title_id,
        args.episode,
        args.position,
        args.episode_ref,
        args.label,
    );
    tracker.save_final(&update)?;
    println!(
        "Recorded resume point: {} | episode {} at {}",
        update.title_id,
        update.episode_number,
        format_position(update.position_seconds)
    );
    Ok(())
}

fn run_list(store: &Store) -> Result<()> {
    let items = store.load_history();
    if items.is_empty() {
        println!("No resume points yet. Run `aniresume track` or `aniresume report` first.");
        return Ok(());
    }

    println!(
        "{:<28} {:<6} {:<10} {:<18} {:<30}",
        "TITLE ID", "EP", "POSITION", "UPDATED", "EPISODE"
    );
    for item in items {
        println!(
            "{:<28} {:<6} {:<10} {:<18} {:<30}",
            truncate(&item.title_id, 28),
            item.episode_number,
            format_position(item.position_seconds),
            format_updated_display(item.updated_at),
            truncate(item.episode_label.as_deref().unwrap_or("-"), 30)
        );
    }
    Ok(())
}

fn run_delete(mut tracker: ProgressTracker, title_id: &str) -> Result<()> {
    if tracker.delete(title_id)? {
        println!("Deleted resume point for {title_id}");
    } else {
        println!("No resume point found for {title_id}");
    }
    Ok(())
}

fn run_sync(store: &Store, title_id: &str) -> Result<()> {
    let items = store.load_history();
    let Some(item) = items.iter().find(|entry| entry.title_id == title_id) else {
        println!("No resume point found for {title_id}");
        return Ok(());
    };

    let update = ResumeUpdate::new(
        item.title_id.clone(),
        item.episode_number,
        item.position_seconds,
        item.episode_ref.clone(),
        item.episode_label.clone(),
    );
    let gate = SyncGate::new(StoredProfileAuth::new(store), HttpRemote::from_env());
    let outcome = gate.save_now(&update);
    if outcome.success {
        println!(
            "Synced {} episode {} at {} to account.",
            update.title_id,
            update.episode_number,
            format_position(update.position_seconds)
        );
    } else {
        println!(
            "Sync failed: {}",
            outcome.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}

fn run_profile(store: &Store, args: ProfileArgs) -> Result<()> {
    if let Some(path) = args.import {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read profile file {}", path.display()))?;
        let profile: crate::store::UserProfile = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse profile file {}", path.display()))?;
        store.save_user_profile(&profile)?;
        println!("Imported profile for {}", profile.name);
        return Ok(());
    }

    if args.forget {
        store.clear_user_profile()?;
        println!("Removed locally cached profile.");
        return Ok(());
    }

    match store.load_user_profile() {
        Some(profile) => {
            println!("Signed in as: {}", profile.name);
            println!("  User ID: {}", profile.id);
            if let Some(email) = profile.email.as_deref() {
                println!("  Email: {email}");
            }
            println!(
                "  Last updated: {}",
                format_profile_updated_display(&profile.last_updated)
            );
        }
        None => {
            println!("No signed-in profile. Sign in from the companion app to enable sync.");
        }
    }
    Ok(())
}

fn open_store() -> Result<Store> {
    let db_path = database_file_path()?;
    let store = Store::open(&db_path)?;
    store.migrate()?;
    Ok(store)
}
