use itertools::Itertools;
use liftlog::{
    clock::Clock,
    session::LoggedExercise,
    util::{format_clock, format_load},
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};

use crate::App;

/// Pure presenter for one exercise row of a finished session
pub fn present_row(exercise: &LoggedExercise) -> Row<'static> {
    let sets = &exercise.sets;
    let volume: f64 = sets.iter().map(|s| s.load * s.reps as f64).sum();
    let detail = sets
        .iter()
        .map(|s| format!("{}x{}", format_load(s.load), s.reps))
        .join("  ");

    let style = if sets.is_empty() {
        Style::default().add_modifier(Modifier::DIM)
    } else {
        Style::default()
    };

    Row::new(vec![
        Cell::from(exercise.name.clone()),
        Cell::from(sets.len().to_string()),
        Cell::from(detail),
        Cell::from(format_load(volume)),
    ])
    .style(style)
}

pub fn render_summary<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let Some(log) = app.session.log() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(0),    // exercises table
            Constraint::Length(1), // save status
            Constraint::Length(1), // legend
        ])
        .split(area);

    let title = Paragraph::new(format!(
        "{}   {}   {} sets   volume {}",
        log.title,
        format_clock(log.duration_secs),
        log.completed_sets(),
        format_load(log.total_volume)
    ))
    .block(Block::default().borders(Borders::ALL).title("Finished"))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    title.render(chunks[0], buf);

    let header = Row::new(vec![
        Cell::from("Exercise"),
        Cell::from("Sets"),
        Cell::from("Load x Reps"),
        Cell::from("Volume"),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = log.exercises.iter().map(present_row).collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Length(6),
            Constraint::Percentage(50),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL));
    Widget::render(table, chunks[1], buf);

    let status = match &app.saved {
        Some(Ok(())) => Span::styled("saved to history", Style::default().fg(Color::Green)),
        Some(Err(err)) => Span::styled(
            format!("not saved: {err}"),
            Style::default().fg(Color::Red),
        ),
        None => Span::raw(""),
    };
    Paragraph::new(status)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        "press any key to exit",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);
}
