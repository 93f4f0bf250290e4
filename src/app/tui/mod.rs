mod actions;
mod render;
mod session;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;

use crate::store::ResumePoint;

use super::tracking::ProgressTracker;

use self::actions::{drain_history_updates, run_sync_selected, status_error, status_info};
use self::render::draw_tui;
use self::session::TuiSession;

#[derive(Debug, Clone)]
pub(super) struct PendingDelete {
    pub(super) title_id: String,
    pub(super) display: String,
}

pub(crate) fn run_tui(mut tracker: ProgressTracker) -> Result<()> {
    let mut session = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let updates = tracker.state().subscribe();
    let mut items = tracker.history();
    let profile = tracker.store().load_user_profile();
    let mut table_state = TableState::default();
    table_state.select((!items.is_empty()).then_some(0));
    let mut pending_delete = None::<PendingDelete>;
    let mut status = if items.is_empty() {
        status_info("No resume points yet. They appear here as playback is tracked.")
    } else {
        status_info("Ready.")
    };

    loop {
        drain_history_updates(&updates, &mut items, &mut table_state);
        terminal.draw(|frame| {
            draw_tui(
                frame,
                &items,
                &mut table_state,
                &status,
                pending_delete.as_ref(),
                profile.as_ref(),
            )
        })?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(dialog) = pending_delete.as_ref() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let deleting_id = dialog.title_id.clone();
                    let deleting_display = dialog.display.clone();
                    pending_delete = None;
                    match tracker.delete(&deleting_id) {
                        Ok(true) => {
                            status =
                                status_info(&format!("Deleted resume point: {deleting_display}"));
                        }
                        Ok(false) => {
                            status = status_error("Delete failed: entry no longer exists.");
                        }
                        Err(err) => status = status_error(&format!("Delete failed: {err}")),
                    }
                }
                KeyCode::Esc | KeyCode::Char('n') => {
                    pending_delete = None;
                    status = status_info("Delete canceled.");
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Up => {
                if let Some(selected) = table_state.selected() {
                    table_state.select(Some(selected.saturating_sub(1)));
                }
            }
            KeyCode::Down => {
                if let Some(selected) = table_state.selected()
                    && !items.is_empty()
                {
                    let next = (selected + 1).min(items.len().saturating_sub(1));
                    table_state.select(Some(next));
                }
            }
            KeyCode::Char('d') => {
                let Some(selected) = table_state.selected() else {
                    status = status_error("Delete failed: no entry selected.");
                    continue;
                };
                if selected >= items.len() {
                    status = status_error("Delete failed: invalid selection.");
                    continue;
                }
                let item = &items[selected];
                pending_delete = Some(PendingDelete {
                    title_id: item.title_id.clone(),
                    display: display_name(item),
                });
                status = status_info("Confirm delete: y/Enter to delete, n/Esc to cancel.");
            }
            KeyCode::Char('s') => {
                let Some(selected) = table_state.selected() else {
                    status = status_error("Sync failed: no entry selected.");
                    continue;
                };
                if selected >= items.len() {
                    status = status_error("Sync failed: invalid selection.");
                    continue;
                }
                status = status_info("Syncing to account...");
                terminal.draw(|frame| {
                    draw_tui(frame, &items, &mut table_state, &status, None, profile.as_ref())
                })?;
                status = run_sync_selected(&tracker, &items[selected]);
            }
            _ => {}
        }
    }

    terminal.show_cursor()?;
    session.leave()?;
    Ok(())
}

pub(super) fn display_name(item: &ResumePoint) -> String {
    match item.episode_label.as_deref() {
        Some(label) if !label.trim().is_empty() => format!("{} ({label})", item.title_id),
        _ => item.title_id.clone(),
    }
}
