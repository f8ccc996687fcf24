use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::board::TaskStatus;
use crate::task::TaskRecord;

use super::app::{AppState, StatusKind};
use super::model::BoardModel;

const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_BG_SELECTED: Color = Color::Rgb(52, 56, 60);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER: Color = Color::Rgb(92, 126, 166);
const COLOR_BORDER_FOCUS: Color = Color::Rgb(180, 156, 92);

const HELP_LINES: [(&str, &str); 8] = [
    ("h / l", "focus column"),
    ("j / k", "select card"),
    ("H / L", "move card to previous / next column"),
    ("K / J", "move card up / down"),
    ("r", "reload"),
    ("?", "toggle help"),
    ("q", "quit"),
    ("ctrl-c", "quit"),
];

pub fn render(frame: &mut Frame, app: &AppState) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    match app.model.as_ref() {
        Some(model) => render_columns(frame, model, chunks[0]),
        None => {
            let loading = Paragraph::new("loading board...").alignment(Alignment::Center);
            frame.render_widget(loading, chunks[0]);
        }
    }
    render_footer(frame, app, chunks[1]);

    if app.show_help {
        render_help(frame, area);
    }
}

fn render_columns(frame: &mut Frame, model: &BoardModel, area: Rect) {
    if model.columns.is_empty() {
        return;
    }
    let share = 100 / model.columns.len() as u16;
    let constraints: Vec<Constraint> = model
        .columns
        .iter()
        .map(|_| Constraint::Percentage(share))
        .collect();
    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (idx, (status, tasks)) in model.columns.iter().enumerate() {
        let focused = idx == model.focus;
        let selected = focused.then(|| model.rows[idx]);
        render_column(frame, *status, tasks, selected, focused, areas[idx]);
    }
}

fn render_column(
    frame: &mut Frame,
    status: TaskStatus,
    tasks: &[TaskRecord],
    selected: Option<usize>,
    focused: bool,
    area: Rect,
) {
    let width = area.width.saturating_sub(2) as usize;
    let mut lines: Vec<Line<'static>> = Vec::new();
    for (row, task) in tasks.iter().enumerate() {
        let is_selected = selected == Some(row);
        lines.extend(card_lines(task, is_selected, width));
    }
    if tasks.is_empty() {
        lines.push(Line::from(Span::styled(
            "(empty)",
            Style::default().fg(COLOR_MUTED),
        )));
    }

    // Keep the selected card on screen: each card takes two lines.
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = selected
        .map(|row| (row * 2 + 2).saturating_sub(visible))
        .unwrap_or(0);

    let border = if focused { COLOR_BORDER_FOCUS } else { COLOR_BORDER };
    let title = format!(" {} ({}) ", status.title(), tasks.len());
    let widget = Paragraph::new(lines)
        .scroll((scroll as u16, 0))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(border)),
        );
    frame.render_widget(widget, area);
}

fn card_lines(task: &TaskRecord, selected: bool, width: usize) -> Vec<Line<'static>> {
    let base = if selected {
        Style::default().bg(COLOR_BG_SELECTED).fg(COLOR_TEXT)
    } else {
        Style::default().fg(COLOR_TEXT)
    };
    let marker = if selected { "> " } else { "  " };
    let title = truncate_text(&task.title, width.saturating_sub(marker.len()));
    let title_line = Line::from(vec![
        Span::styled(marker.to_string(), base.fg(COLOR_ACCENT)),
        Span::styled(title, base.add_modifier(Modifier::BOLD)),
    ]);

    let mut meta = format!("  {}", task.id);
    if let Some(assignee) = task.assignee.as_deref() {
        meta.push_str(&format!(" @{assignee}"));
    }
    if let Some(due) = task.due_date {
        meta.push_str(&format!(" due {due}"));
    }
    if task.comments_count > 0 {
        meta.push_str(&format!(" [{}]", task.comments_count));
    }
    let meta_line = Line::from(Span::styled(
        truncate_text(&meta, width),
        base.fg(COLOR_MUTED),
    ));
    vec![title_line, meta_line]
}

fn render_footer(frame: &mut Frame, app: &AppState, area: Rect) {
    let hint = Span::styled(
        "h/l column  j/k card  H/L/J/K move  r reload  ? help  q quit",
        Style::default().fg(COLOR_INFO),
    );
    let line = match app.status_line() {
        Some((status, kind)) => {
            let style = match kind {
                StatusKind::Error => Style::default()
                    .fg(COLOR_ERROR)
                    .add_modifier(Modifier::BOLD),
                StatusKind::Info => Style::default().fg(COLOR_WARNING),
            };
            Line::from(vec![hint, Span::raw("  |  "), Span::styled(status, style)])
        }
        None => Line::from(hint),
    };
    let summary = match app.model.as_ref() {
        Some(model) => format!(
            "{} ({})  {} task(s)  as {}",
            model.workspace_name,
            model.workspace_id,
            model.task_count(),
            app.actor
        ),
        None => format!("as {}", app.actor),
    };
    let widget = Paragraph::new(vec![
        line,
        Line::from(Span::styled(summary, Style::default().fg(COLOR_ACCENT))),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(COLOR_BORDER)),
    );
    frame.render_widget(widget, area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let modal = centered_rect(48, HELP_LINES.len() as u16 + 2, area);
    frame.render_widget(Clear, modal);
    let lines: Vec<Line<'static>> = HELP_LINES
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{key:<10}"), Style::default().fg(COLOR_ACCENT)),
                Span::raw(action.to_string()),
            ])
        })
        .collect();
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Keys ")
            .border_style(Style::default().fg(COLOR_BORDER_FOCUS)),
    );
    frame.render_widget(widget, modal);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn truncate_text(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 3 {
        return value.chars().take(width).collect();
    }
    let mut out: String = value.chars().take(width - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_text_adds_ellipsis() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a long title", 8), "a lon...");
        assert_eq!(truncate_text("abc", 2), "ab");
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 20, 10);
        let rect = centered_rect(48, 12, area);
        assert!(rect.width <= 18 && rect.height <= 8);
        assert!(rect.x + rect.width <= area.width);
    }
}
