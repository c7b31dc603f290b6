pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use typing_racer::{
    best_score::BestScoreStore,
    difficulty::Difficulty,
    game::{format_clock, NoticeKind},
    GameState,
};
use unicode_width::UnicodeWidthStr;

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold_style() -> Style {
    bold_style().add_modifier(Modifier::DIM)
}

fn italic_style() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Settings => render_settings(self, area, buf),
            AppState::Race => render_race(self, area, buf),
            AppState::Results => render_results(self, area, buf),
        }
    }
}

fn render_settings(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(Difficulty::ALL.len() as u16 + 2),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(Span::styled(
        "typing racer",
        bold_style().fg(Color::Cyan),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let tiers: Vec<Line> = Difficulty::ALL
        .iter()
        .map(|tier| {
            let best = BestScoreStore::get(app.seat.store(), *tier)
                .map_or_else(|| "-".to_string(), |wpm| format!("{wpm} wpm"));
            let text = format!(
                "{:<8} {:>3} words  {:>5}  best {}",
                tier.to_string(),
                tier.target_words(),
                format_clock(tier.time_limit_secs()),
                best
            );
            if *tier == app.selected {
                Line::from(Span::styled(format!("> {text}"), bold_style().fg(Color::Yellow)))
            } else {
                Line::from(Span::styled(format!("  {text}"), dim_bold_style()))
            }
        })
        .collect();

    Paragraph::new(tiers)
        .block(Block::default().borders(Borders::ALL).title("difficulty"))
        .render(chunks[1], buf);

    Paragraph::new(app.selected.description())
        .style(italic_style())
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        "(up/down) choose / (enter) start / (q)uit",
        italic_style(),
    ))
    .render(chunks[3], buf);
}

fn render_race(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(game) = app.game() else {
        return;
    };
    let metrics = game.metrics();
    let passage = game.passage();

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let passage_lines = ((passage.width() as f64 / max_chars_per_line as f64).ceil() as u16 + 1)
        .min(area.height.saturating_sub(8));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(2), // track
            Constraint::Length(passage_lines),
            Constraint::Length(1), // stats
            Constraint::Length(1), // notice
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let best = game
        .previous_best()
        .map_or_else(String::new, |wpm| format!("   best {wpm} wpm"));
    let clock_style = if game.time_remaining() <= 10 && game.state() == GameState::Running {
        bold_style().fg(Color::Red)
    } else {
        dim_bold_style()
    };
    Paragraph::new(Line::from(vec![
        Span::styled(format!("{}   ", game.difficulty()), bold_style()),
        Span::styled(format_clock(game.time_remaining()), clock_style),
        Span::styled(best, dim_bold_style()),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let track = charting::track_line(metrics.race_position, chunks[1].width as usize);
    Paragraph::new(Span::styled(track, bold_style().fg(Color::Cyan))).render(chunks[1], buf);

    Paragraph::new(Line::from(passage_spans(passage, game.input())))
        .wrap(Wrap { trim: false })
        .render(chunks[2], buf);

    let stats = if game.state() == GameState::Idle {
        "start typing to begin the race".to_string()
    } else {
        format!(
            "{} wpm   {}% acc   {} mistakes   {}/{} words",
            metrics.wpm_rounded(),
            metrics.accuracy_rounded(),
            metrics.mistakes,
            metrics.total_words.min(game.tracker().target_words()),
            game.tracker().target_words()
        )
    };
    Paragraph::new(Span::styled(stats, bold_style()))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    if let Some(notice) = game.notice() {
        let color = match notice.kind {
            NoticeKind::PasteRejected => Color::Red,
            _ => Color::Yellow,
        };
        Paragraph::new(Span::styled(notice.message.clone(), bold_style().fg(color)))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[4], buf);
    }

    Paragraph::new(Span::styled("(esc) settings / (ctrl+c) quit", italic_style()))
        .render(chunks[6], buf);
}

/// Typed chars coloured by correctness, the cursor underlined, the rest dimmed
fn passage_spans<'a>(passage: &'a str, input: &str) -> Vec<Span<'a>> {
    let green_bold_style = bold_style().fg(Color::Green);
    let red_bold_style = bold_style().fg(Color::Red);
    let underlined_dim_bold_style = dim_bold_style().add_modifier(Modifier::UNDERLINED);

    let typed = input.chars().count();
    let mut spans: Vec<Span> = passage
        .chars()
        .zip(input.chars())
        .map(|(expected, got)| {
            if expected == got {
                Span::styled(expected.to_string(), green_bold_style)
            } else {
                Span::styled(
                    match got {
                        ' ' => "·".to_owned(),
                        c => c.to_string(),
                    },
                    red_bold_style,
                )
            }
        })
        .collect();

    let mut rest = passage.char_indices().skip(typed);
    if let Some((_, cursor)) = rest.next() {
        spans.push(Span::styled(cursor.to_string(), underlined_dim_bold_style));
        if let Some((idx, _)) = rest.next() {
            spans.push(Span::styled(&passage[idx..], dim_bold_style()));
        }
    }
    spans
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(game) = app.game() else {
        return;
    };
    let Some(result) = game.result() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // headline stats
            Constraint::Length(1), // details
            Constraint::Length(1), // score / record
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let series = game.wpm_series();
    let (overall_duration, highest_wpm) =
        charting::compute_chart_params(series, result.time_limit);
    let tuples = series.coords();
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&tuples)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, overall_duration])
                .labels(vec![
                    Span::styled("1", bold_style()),
                    Span::styled(charting::format_label(overall_duration), bold_style()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold_style()),
                    Span::styled(charting::format_label(highest_wpm), bold_style()),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {} mistakes   {} words",
            result.wpm, result.accuracy, result.mistakes, result.total_words
        ),
        bold_style(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "{}   {}   {} left   {}% of the clock used",
            result.difficulty,
            result.reason,
            format_clock(result.time_left),
            result.time_used_percent
        ),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let mut score_line = vec![Span::styled(
        format!("score {}", result.score),
        bold_style().fg(Color::Yellow),
    )];
    if result.new_record {
        score_line.push(Span::styled("   NEW RECORD!", bold_style().fg(Color::Green)));
    } else if let Some(best) = result.previous_best {
        score_line.push(Span::styled(format!("   best {best} wpm"), dim_bold_style()));
    }
    Paragraph::new(Line::from(score_line))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(r)ace again / (esc) settings / (q)uit",
        italic_style(),
    ))
    .render(chunks[5], buf);
}
