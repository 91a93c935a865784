use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{App, InputMode, ViewMode};
use crate::duration::format_minutes;
use crate::models::ProjectStatus;

fn status_style(status: ProjectStatus) -> Style {
    match status {
        ProjectStatus::Normal => Style::default().fg(Color::Green),
        ProjectStatus::Tense => Style::default().fg(Color::Yellow),
        ProjectStatus::Overdue => Style::default().fg(Color::Red),
    }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Table
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    let daily = app.snapshot.settings.standard_daily_min;

    match app.view_mode {
        ViewMode::Projects => {
            let rows: Vec<Row> = app
                .projects
                .iter()
                .map(|s| {
                    let expected = if s.is_completed {
                        format!("{} (done)", s.expected_completion_date)
                    } else if s.projection_exhausted {
                        format!("{} (?)", s.expected_completion_date)
                    } else {
                        s.expected_completion_date.to_string()
                    };
                    Row::new(vec![
                        Cell::from(s.project_id.clone()),
                        Cell::from(app.project_name(&s.project_id).to_string()),
                        Cell::from(s.task_count.to_string()),
                        Cell::from(format!("{}%", s.progress_percent)),
                        Cell::from(format_minutes(i64::from(s.remaining_min), daily)),
                        Cell::from(expected),
                        Cell::from(s.deadline.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
                        Cell::from(s.status.label()),
                    ])
                    .style(status_style(s.status))
                })
                .collect();

            let widths = [
                Constraint::Length(5),
                Constraint::Min(20),
                Constraint::Length(6),
                Constraint::Length(9),
                Constraint::Length(20),
                Constraint::Length(18),
                Constraint::Length(12),
                Constraint::Length(8),
            ];

            let table = Table::new(rows, widths)
                .header(Row::new(vec!["ID", "Project", "Tasks", "Progress", "Remaining", "Expected", "Deadline", "Status"])
                    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title("renotrack - Projects"))
                .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[0], &mut app.project_state);
        }
        ViewMode::Tasks => {
            let rows: Vec<Row> = app
                .rows
                .iter()
                .map(|r| {
                    let marker = if r.stats.child_count > 0 { "▸ " } else { "" };
                    let free = if r.is_free { " [free]" } else { "" };
                    let progress = if r.stats.is_completed {
                        "done".to_string()
                    } else {
                        format!("{}%", r.stats.progress_percent)
                    };
                    let style = if r.stats.is_completed {
                        Style::default().fg(Color::Gray)
                    } else {
                        status_style(r.status)
                    };
                    Row::new(vec![
                        Cell::from(r.id.clone()),
                        Cell::from(format!("{}{}{}{}", "  ".repeat(r.depth), marker, r.name, free)),
                        Cell::from(format_minutes(i64::from(r.stats.estimated_min), daily)),
                        Cell::from(format_minutes(i64::from(r.stats.actual_min), daily)),
                        Cell::from(progress),
                        Cell::from(r.deadline.map(|d| d.to_string()).unwrap_or_default()),
                        Cell::from(r.status.label()),
                    ])
                    .style(style)
                })
                .collect();

            let widths = [
                Constraint::Length(5),
                Constraint::Min(24),
                Constraint::Length(20),
                Constraint::Length(20),
                Constraint::Length(9),
                Constraint::Length(12),
                Constraint::Length(8),
            ];

            let title = format!(
                "renotrack - {}",
                app.open_project.as_deref().map(|id| app.project_name(id)).unwrap_or("")
            );
            let table = Table::new(rows, widths)
                .header(Row::new(vec!["ID", "Task", "Est", "Actual", "Progress", "Deadline", "Status"])
                    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title(title))
                .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[0], &mut app.task_state);
        }
    }

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Projects => "q: Quit | j/k: Move | Enter: Open | r: Reload",
            ViewMode::Tasks => "q: Quit | j/k: Move | l: Log minutes | Space: Complete | Esc: Back | r: Reload",
        },
        InputMode::LogMinutes => "Enter: Save | Esc: Cancel",
    };
    let help_line = match &app.message {
        Some(m) => format!("{}  ·  {}", help_text, m),
        None => help_text.to_string(),
    };

    let help = Paragraph::new(help_line)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[1]);

    if app.input_mode == InputMode::LogMinutes {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);
        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title("Log Minutes Worked"));
        f.render_widget(input, area);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
