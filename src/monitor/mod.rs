//! Interactive terminal monitor.

pub mod app;
pub mod ui;
pub mod worker;

use crate::poll::Poller;
use crate::profiles::ProfileStore;
use anyhow::{Context, Result};
use app::{Action, App};
use crossterm::event::{self, Event};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use worker::PollWorker;

type Term = ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>;

const INPUT_POLL: Duration = Duration::from_millis(250);

/// Runs the monitor until the user quits.
pub fn run(store: ProfileStore, poller: Poller) -> Result<()> {
    let state = store.load();
    let worker_store = ProfileStore::new(store.path());
    let worker = PollWorker::spawn(poller, worker_store)?;

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &store, &worker, App::new(state, Instant::now()));
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Term> {
    crossterm::terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)
        .context("Failed to enter alternate screen")?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Best-effort terminal restoration
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        );
        original_hook(panic_info);
    }));

    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    ratatui::Terminal::new(backend).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn event_loop(
    terminal: &mut Term,
    store: &ProfileStore,
    worker: &PollWorker,
    mut app: App,
) -> Result<()> {
    loop {
        let now = Instant::now();
        if app.poll_due(now) {
            worker.request();
            app.poll_started(now);
        }
        while let Some(outcome) = worker.try_recv() {
            app.apply_outcome(outcome);
        }

        terminal.draw(|frame| ui::draw(frame, &app))?;

        if !event::poll(INPUT_POLL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        match app.handle_key(key) {
            Action::None => {}
            Action::Quit => return Ok(()),
            Action::Refresh => {
                worker.request();
                app.poll_started(Instant::now());
            }
            Action::Activate(name) => match store.set_active(&name) {
                Ok(state) => {
                    info!(profile = %name, "switched profile");
                    app.profile_switched(state);
                    worker.request();
                    app.poll_started(Instant::now());
                }
                Err(e) => {
                    warn!(error = %e, "profile switch failed");
                    app.notice = Some(format!("{:#}", e));
                }
            },
        }
    }
}
