mod repo_list;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::App;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    repo_list::render(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);
}

pub(crate) fn spinner(app: &App) -> &'static str {
    SPINNER[(app.ticks % SPINNER.len() as u64) as usize]
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let repos = app.session.repositories();
    let estimated = repos
        .iter()
        .filter(|r| app.session.counts(&r.id).is_some())
        .count();

    let mut spans = vec![Span::styled(
        format!("ghscope - {}", app.account),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    if !repos.is_empty() && estimated < repos.len() {
        spans.push(Span::styled(
            format!("  {} counting {}/{}", spinner(app), estimated, repos.len()),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(error) = &app.error {
        Line::from(vec![Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )])
    } else if let Some(notice) = &app.notice {
        Line::from(vec![Span::styled(
            notice.clone(),
            Style::default().fg(Color::Green),
        )])
    } else if app.loading {
        Line::from(vec![Span::styled(
            format!("{} Loading repositories...", spinner(app)),
            Style::default().fg(Color::Yellow),
        )])
    } else {
        Line::from(vec![Span::styled(
            "j/k/g/G: nav | Enter: details | R: reload details | r: reload list | o: open | y: copy url | q: quit",
            Style::default().fg(Color::Gray),
        )])
    };

    let status_bar = Paragraph::new(status).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status_bar, area);
}
