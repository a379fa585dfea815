//! Rendering of the monitor screen from [`App`] state.

use super::app::App;
use crate::display::{self, Severity};
use chrono::{Local, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Green => Color::Green,
        Severity::Yellow => Color::Yellow,
        Severity::Red => Color::Red,
    }
}

pub fn draw(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(frame.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(30)])
        .split(rows[1]);

    draw_title(frame, app, rows[0]);
    draw_profiles(frame, app, columns[0]);
    draw_usage(frame, app, columns[1]);
    draw_footer(frame, app, rows[2]);
}

fn draw_title(frame: &mut Frame, app: &App, area: Rect) {
    let title = match &app.last {
        Some(outcome) => display::title_for(&outcome.result),
        None => "CC …".to_string(),
    };
    let color = app
        .snapshot()
        .map(|s| severity_color(Severity::from_percent(s.worst_percent())))
        .unwrap_or(Color::Gray);

    let mut spans = vec![
        Span::styled(
            format!(" {} ", title),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {}", app.state.active_label()),
            Style::default().fg(Color::White),
        ),
    ];
    if app.polling {
        spans.push(Span::styled(
            "  refreshing…",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Claude Usage ")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(paragraph, area);
}

fn draw_profiles(frame: &mut Frame, app: &App, area: Rect) {
    let (active, _) = app.state.resolve_active();
    let items: Vec<ListItem> = app
        .state
        .profiles
        .iter()
        .map(|(name, profile)| {
            let marker = if *name == active { "● " } else { "  " };
            let style = if *name == active {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, style),
                Span::styled(profile.display_label(name).to_string(), style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Accounts ")
                .border_style(Style::default().fg(Color::Magenta)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_usage(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    if let Some(snapshot) = app.snapshot() {
        for view in display::window_views(snapshot, Utc::now()) {
            lines.push(Line::from(Span::styled(
                format!("── {} ──", view.heading),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                format!(" {}", view.bar_line()),
                Style::default().fg(severity_color(view.severity())),
            )));
            if let Some(detail) = &view.detail {
                lines.push(Line::from(Span::styled(
                    format!(" ⏱  {}", detail),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines.push(Line::from(""));
        }
        lines.push(Line::from(format!(
            " 📋 {}",
            display::plan_line(&snapshot.plan, &app.state.active_label())
        )));
    } else if let Some(error) = app.error() {
        lines.push(Line::from(Span::styled(
            format!(" ⚠️  {}", error),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        if let Some(hint) = error.hint() {
            lines.push(Line::from(format!(" {}", hint)));
        }
    } else {
        lines.push(Line::from(Span::styled(
            " Fetching usage…",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Usage ")
                .border_style(Style::default().fg(Color::Blue)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let refreshed = match &app.last {
        Some(outcome) => outcome
            .finished_at
            .with_timezone(&Local)
            .format("%I:%M:%S %p")
            .to_string(),
        None => "never".to_string(),
    };
    let next = display::format_countdown(app.until_next_poll(Instant::now()));

    let mut status = vec![Span::styled(
        format!(
            " 🕐 Last refresh: {}  (every {}s, next in {})",
            refreshed,
            app.state.poll_interval().as_secs(),
            next
        ),
        Style::default().fg(Color::White),
    )];
    if let Some(error) = app.error() {
        status.push(Span::styled(
            format!("  ❌ {}", error),
            Style::default().fg(Color::Red),
        ));
    }
    if let Some(notice) = &app.notice {
        status.push(Span::styled(
            format!("  {}", notice),
            Style::default().fg(Color::Yellow),
        ));
    }

    let keys = Line::from(vec![
        Span::styled(" ↑/↓ j/k", Style::default().fg(Color::White)),
        Span::styled(" select  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Enter", Style::default().fg(Color::White)),
        Span::styled(" switch  ", Style::default().fg(Color::DarkGray)),
        Span::styled("r", Style::default().fg(Color::White)),
        Span::styled(" refresh  ", Style::default().fg(Color::DarkGray)),
        Span::styled("q", Style::default().fg(Color::White)),
        Span::styled(" quit", Style::default().fg(Color::DarkGray)),
    ]);

    let paragraph = Paragraph::new(vec![Line::from(status), keys])
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(paragraph, area);
}
