pub mod summary;

use liftlog::{
    clock::Clock,
    session::SetField,
    util::{format_clock, format_load},
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
    Frame,
};

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

pub fn draw<C: Clock>(app: &App<C>, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl<C: Clock> Widget for &App<C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Summary => summary::render_summary(self, area, buf),
            AppState::Workout | AppState::Editing { .. } => render_workout(self, area, buf),
        }
    }
}

fn render_workout<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let session = &app.session;

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let done_style = Style::default().fg(Color::Green);
    let selected_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::REVERSED);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title and clock
            Constraint::Min(1),    // exercises
            Constraint::Length(1), // rest / edit prompt
            Constraint::Length(1), // legend
        ])
        .split(area);

    let header = Paragraph::new(vec![
        Line::from(Span::styled(session.plan().title.clone(), bold_style)),
        Line::from(Span::styled(
            format!(
                "{}   {}/{} sets   volume {}",
                format_clock(session.elapsed_secs()),
                session.completed_sets(),
                session.total_sets(),
                format_load(session.running_volume())
            ),
            dim_style,
        )),
    ])
    .alignment(Alignment::Center);
    header.render(chunks[0], buf);

    let selected = app.selected();
    let mut lines = Vec::new();
    for (ei, exercise) in session.exercises().iter().enumerate() {
        lines.push(Line::from(Span::styled(exercise.name.clone(), bold_style)));
        for (si, set) in exercise.sets.iter().enumerate() {
            let text = format!(
                "  [{}] {:>2}   {:>6} kg x {:<3}",
                if set.completed { "x" } else { " " },
                si + 1,
                format_load(set.load),
                set.reps
            );
            let style = if selected == Some((ei, si)) {
                selected_style
            } else if set.completed {
                done_style
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(text, style)));
        }
    }

    // keep the selected set on screen
    let visible = chunks[1].height as usize;
    let selected_line = selected
        .map(|(ei, si)| {
            session.exercises()[..ei]
                .iter()
                .map(|e| e.sets.len() + 1)
                .sum::<usize>()
                + si
                + 1
        })
        .unwrap_or(0);
    let scroll = (selected_line + 1).saturating_sub(visible);

    Paragraph::new(lines)
        .scroll((scroll as u16, 0))
        .render(chunks[1], buf);

    let status = match &app.state {
        AppState::Editing { field, buffer } => Span::styled(
            format!(
                "{}: {buffer}_",
                match field {
                    SetField::Load => "load (kg)",
                    SetField::Reps => "reps",
                }
            ),
            Style::default().fg(Color::Yellow).patch(bold_style),
        ),
        _ => match session.rest().filter(|r| r.active) {
            Some(rest) => Span::styled(
                format!(
                    "Resting {}",
                    format_clock(rest.remaining_secs.max(0) as u64)
                ),
                Style::default().fg(Color::Cyan).patch(bold_style),
            ),
            None => Span::raw(""),
        },
    };
    Paragraph::new(status)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let legend = match app.state {
        AppState::Editing { .. } => "(enter) save / (esc) cancel",
        _ if session.is_resting() => {
            "(space) toggle / (w)eight / (r)eps / (+/-) rest / (s)kip rest / (f)inish / (esc)ape"
        }
        _ => "(space) toggle / (w)eight / (r)eps / (f)inish / (esc)ape",
    };
    Paragraph::new(Span::styled(legend, italic_style))
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);
}
