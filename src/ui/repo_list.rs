use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::App;
use crate::types::{Commit, PrState, PullRequest, RepoDetail, Repository};

const INDENT: &str = "    ";

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL);

    if let Some(error) = &app.list_error {
        let text = Text::from(vec![
            Line::from(Span::styled(
                format!("Error: {}", error),
                Style::default().fg(Color::Red),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press r to retry",
                Style::default().fg(Color::Gray),
            )),
        ]);
        let paragraph = Paragraph::new(text)
            .block(block.title("Repositories"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
        return;
    }

    let repos = app.session.repositories();
    if repos.is_empty() {
        let message = if app.loading {
            format!("{} Loading repositories...", super::spinner(app))
        } else {
            "No repositories found".to_string()
        };
        let empty = Paragraph::new(message)
            .block(block.title("Repositories"))
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let width = area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = repos
        .iter()
        .enumerate()
        .map(|(i, repo)| ListItem::new(Text::from(repo_lines(app, repo, i == app.selected, width))))
        .collect();

    let list = List::new(items)
        .block(block.title(format!("Repositories ({})", repos.len())))
        .highlight_style(Style::default().bg(Color::Black));

    let mut state = ListState::default();
    state.select(Some(app.selected));

    frame.render_stateful_widget(list, area, &mut state);
}

fn repo_lines<'a>(app: &'a App, repo: &'a Repository, selected: bool, width: usize) -> Vec<Line<'a>> {
    let expanded = app.session.is_expanded(&repo.id);
    let detail = app.session.detail(&repo.id);
    let counts = app.session.counts(&repo.id);

    let (loaded_commits, loaded_pulls) = match detail {
        RepoDetail::Loaded { commits, pulls } => (Some(commits.len()), Some(pulls.len())),
        _ => (None, None),
    };

    let name_style = if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let dim = Style::default().fg(Color::DarkGray);

    let mut lines = vec![Line::from(vec![
        Span::styled(if expanded { "▾ " } else { "▸ " }, dim),
        Span::styled(repo.name(), name_style),
        Span::styled(format!("  ★ {}", repo.stars), dim),
        Span::styled(
            format!("  {}", repo.language.as_deref().unwrap_or("—")),
            dim,
        ),
        Span::raw("  "),
        Span::styled(
            format!(
                "Commits: {}",
                count_badge(counts.and_then(|c| c.commits), loaded_commits)
            ),
            Style::default().fg(Color::White).bg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
            format!(
                "PRs: {}",
                count_badge(counts.and_then(|c| c.pulls), loaded_pulls)
            ),
            Style::default().fg(Color::White).bg(Color::DarkGray),
        ),
    ])];

    if let Some(description) = &repo.description {
        lines.push(Line::from(Span::styled(
            format!("  {}", truncate(description, width.saturating_sub(2))),
            Style::default().fg(Color::Gray),
        )));
    }

    if expanded {
        lines.extend(detail_lines(app, detail, width));
    }

    lines
}

fn detail_lines<'a>(app: &App, detail: &'a RepoDetail, width: usize) -> Vec<Line<'a>> {
    match detail {
        RepoDetail::NotRequested => vec![],
        RepoDetail::Loading => vec![Line::from(Span::styled(
            format!("{}{} Loading details...", INDENT, super::spinner(app)),
            Style::default().fg(Color::Yellow),
        ))],
        RepoDetail::Failed(message) => vec![Line::from(Span::styled(
            format!("{}Error: {}", INDENT, message),
            Style::default().fg(Color::Red),
        ))],
        RepoDetail::Loaded { commits, pulls } => {
            let heading = Style::default().add_modifier(Modifier::BOLD);
            let mut lines = vec![Line::from(Span::styled(
                format!("{}Recent commits", INDENT),
                heading,
            ))];
            if commits.is_empty() {
                lines.push(empty_line());
            }
            lines.extend(commits.iter().map(|c| commit_line(c, width)));

            lines.push(Line::from(Span::styled(
                format!("{}Recent pull requests", INDENT),
                heading,
            )));
            if pulls.is_empty() {
                lines.push(empty_line());
            }
            lines.extend(pulls.iter().map(|p| pull_line(p, width)));
            lines
        }
    }
}

fn empty_line() -> Line<'static> {
    Line::from(Span::styled(
        format!("{}  (none)", INDENT),
        Style::default().fg(Color::DarkGray),
    ))
}

fn commit_line(commit: &Commit, width: usize) -> Line<'static> {
    let date = commit
        .date
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "—".to_string());
    let meta = format!("  {} • {}", commit.author, date);
    let room = width.saturating_sub(INDENT.len() + 10 + meta.chars().count());

    Line::from(vec![
        Span::raw(format!("{}  ", INDENT)),
        Span::styled(commit.short_sha().to_string(), Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::raw(truncate(commit.summary(), room.max(10))),
        Span::styled(meta, Style::default().fg(Color::DarkGray)),
    ])
}

fn pull_line(pr: &PullRequest, width: usize) -> Line<'static> {
    let state_color = match (pr.merged, pr.state) {
        (true, _) => Color::Magenta,
        (false, PrState::Open) => Color::Green,
        (false, PrState::Closed) => Color::Red,
    };
    let mut meta = format!("  @{} • {}", pr.author, pr.state);
    if pr.merged {
        meta.push_str(" • merged");
    }
    let number = format!("#{}", pr.number);
    let room = width.saturating_sub(INDENT.len() + 3 + number.len() + meta.chars().count());

    Line::from(vec![
        Span::raw(format!("{}  ", INDENT)),
        Span::styled(number, Style::default().fg(state_color)),
        Span::raw(" "),
        Span::raw(truncate(&pr.title, room.max(10))),
        Span::styled(meta, Style::default().fg(Color::DarkGray)),
    ])
}

/// Badge text: the estimate if there is one, else the number of loaded
/// items, else a dash.
fn count_badge(estimate: Option<u64>, loaded: Option<usize>) -> String {
    match (estimate, loaded) {
        (Some(n), _) => n.to_string(),
        (None, Some(n)) => n.to_string(),
        (None, None) => "—".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
