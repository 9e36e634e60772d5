//! TUI views and rendering
//!
//! All rendering logic is contained here. The views module is responsible
//! for drawing the UI based on AppState, but never modifies state.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap};
use tracing::trace;

use super::state::{AppState, InteractionMode, LocationField, LoginForm, SaveField, SaveForm, TextInput};
use crate::wizard::{Stage, SuggestionState};

mod colors {
    use ratatui::style::Color;

    pub const HEADER: Color = Color::Rgb(0, 255, 255); // Cyan
    pub const KEYBIND: Color = Color::Rgb(0, 255, 255); // Cyan
    pub const ACTIVE: Color = Color::Rgb(0, 255, 127); // Spring green
    pub const LOADING: Color = Color::Rgb(255, 215, 0); // Gold
    pub const ERROR: Color = Color::Rgb(220, 20, 60); // Crimson
    pub const SELECTED_BG: Color = Color::Rgb(40, 40, 40);
    pub const DIM: Color = Color::DarkGray;
}

fn keybind_style() -> Style {
    Style::default().fg(colors::KEYBIND).add_modifier(Modifier::BOLD)
}

/// Main render function
pub fn render(state: &AppState, frame: &mut Frame) {
    trace!(stage = %state.stage(), "render: called");
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Stage content
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(state, frame, chunks[0]);

    match state.stage() {
        Stage::Location => render_location_stage(state, frame, chunks[1]),
        Stage::Filter => render_filter_stage(state, frame, chunks[1]),
        Stage::Results => render_results_stage(state, frame, chunks[1]),
    }

    render_footer(state, frame, chunks[2]);

    let area = frame.area();
    match &state.interaction_mode {
        InteractionMode::Help => render_help_overlay(frame, area),
        InteractionMode::Login(form) => render_login_overlay(form, state.loading.login, frame, area),
        InteractionMode::Save(form) => render_save_overlay(form, state.loading.save, frame, area),
        InteractionMode::SavedPlan => render_saved_plan_overlay(state, frame, area),
        _ => {}
    }
}

/// Header with stage tabs and session indicator
fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!("render_header: called");
    let mut spans = vec![
        Span::styled(" Pathfinder", Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD)),
        Span::raw(" │ "),
    ];

    for stage in Stage::ALL {
        let label = format!(" {} {} ", stage.index() + 1, stage.title());
        let style = if stage == state.stage() {
            Style::default()
                .fg(Color::Black)
                .bg(colors::HEADER)
                .add_modifier(Modifier::BOLD)
        } else if state.wizard.can_enter(stage) {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(colors::DIM)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }

    let session = match (&state.user_name, state.logged_in) {
        (Some(name), true) => Span::styled(format!("● {} ", name), Style::default().fg(colors::ACTIVE)),
        (None, true) => Span::styled("● logged in ", Style::default().fg(colors::ACTIVE)),
        _ => Span::styled("○ not logged in ", Style::default().fg(colors::DIM)),
    };
    let right = Line::from(session);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::HEADER));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(right.width() as u16)])
        .split(inner);
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);
    frame.render_widget(Paragraph::new(right), chunks[1]);
}

/// Spans for a text input; shows a cursor when focused
fn input_spans(input: &TextInput, masked: bool, focused: bool) -> Vec<Span<'static>> {
    let text = if masked { input.masked() } else { input.value().to_string() };
    if !focused {
        return vec![Span::raw(text)];
    }
    let split = text
        .char_indices()
        .nth(input.cursor())
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (before, after) = text.split_at(split);
    vec![
        Span::raw(before.to_string()),
        Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        Span::raw(after.to_string()),
    ]
}

fn render_location_stage(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!("render_location_stage: called");
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    for (field, chunk) in [(LocationField::Start, chunks[0]), (LocationField::End, chunks[1])] {
        let selected = state.location_field == field;
        let editing = state.interaction_mode == InteractionMode::EditLocation(field);
        let chosen = match field {
            LocationField::Start => state.wizard.start(),
            LocationField::End => state.wizard.end(),
        };

        let marker = if chosen.is_set() {
            Span::styled(" ✓", Style::default().fg(colors::ACTIVE))
        } else {
            Span::styled(" (not set)", Style::default().fg(colors::DIM))
        };
        let border = if editing {
            Style::default().fg(colors::ACTIVE)
        } else if selected {
            Style::default().fg(colors::HEADER)
        } else {
            Style::default().fg(colors::DIM)
        };

        let mut line = input_spans(state.input(field), false, editing);
        line.push(marker);
        let widget = Paragraph::new(Line::from(line)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", field.label()))
                .border_style(border),
        );
        frame.render_widget(widget, chunk);
    }

    let list_area = chunks[2];
    if state.loading.geocode {
        render_empty_message(frame, list_area, "Searching...");
        return;
    }

    if let InteractionMode::ChooseLocation(field) = state.interaction_mode {
        let rows: Vec<Row> = state
            .candidates
            .iter()
            .enumerate()
            .map(|(i, place)| {
                let style = if i == state.candidate_selection.selected_index {
                    Style::default().bg(colors::SELECTED_BG)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    place.name.clone(),
                    format!("{:.4}, {:.4}", place.coordinates.latitude, place.coordinates.longitude),
                ])
                .style(style)
            })
            .collect();

        let table = Table::new(rows, [Constraint::Min(30), Constraint::Length(20)])
            .header(Row::new(vec!["PLACE", "LAT, LNG"]).style(keybind_style()))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Choose {} ({}) ", field.label().to_lowercase(), state.candidates.len()))
                    .border_style(Style::default().fg(colors::HEADER)),
            );
        frame.render_widget(table, list_area);
    } else if !state.wizard.can_enter(Stage::Filter) {
        render_empty_message(frame, list_area, "Choose a start and an end location to continue.");
    } else {
        render_empty_message(frame, list_area, "Press Tab to choose what you want to do.");
    }
}

fn render_filter_stage(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!("render_filter_stage: called");
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let stops = state.wizard.stops();
    let stop_lines: Vec<Line> = stops
        .stops()
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            let active = i == stops.active();
            let label = if stop.is_empty() {
                "(any attribute)".to_string()
            } else {
                stop.attributes().join(", ")
            };
            let style = if active {
                Style::default().fg(colors::ACTIVE).add_modifier(Modifier::BOLD)
            } else if stop.is_empty() {
                Style::default().fg(colors::DIM)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(if active { "▸ " } else { "  " }, style),
                Span::styled(format!("Stop {}: ", i + 1), style),
                Span::styled(label, style),
            ])
        })
        .collect();

    let stops_widget = Paragraph::new(stop_lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Stops ({}) ", stops.len()))
            .border_style(Style::default().fg(colors::HEADER)),
    );
    frame.render_widget(stops_widget, chunks[0]);

    let attributes = state.wizard.available_attributes();
    let active_stop = stops.stop(stops.active());
    let rows: Vec<Row> = attributes
        .iter()
        .enumerate()
        .map(|(i, attribute)| {
            let checked = active_stop.is_some_and(|s| s.contains(&attribute.name));
            let style = if i == state.attribute_selection.selected_index {
                Style::default().bg(colors::SELECTED_BG)
            } else {
                Style::default()
            };
            Row::new(vec![
                if checked { "[x]".to_string() } else { "[ ]".to_string() },
                attribute.name.clone(),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(4), Constraint::Min(20)]).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Attributes for stop {} ", stops.active() + 1))
            .border_style(Style::default().fg(colors::HEADER)),
    );
    frame.render_widget(table, chunks[1]);

    if state.loading.attributes {
        render_empty_message(frame, chunks[1], "Loading attributes...");
    } else if attributes.is_empty() {
        render_empty_message(frame, chunks[1], "No attributes available.");
    }
}

fn render_results_stage(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!("render_results_stage: called");
    let venues = state.suggested_venues();
    let rows: Vec<Row> = venues
        .iter()
        .enumerate()
        .map(|(i, venue)| {
            let style = if i == state.results_selection.selected_index {
                Style::default().bg(colors::SELECTED_BG)
            } else {
                Style::default()
            };
            Row::new(vec![
                format!("{}", i + 1),
                venue.name.clone(),
                venue.attributes.join(", "),
                venue.rating.map(|r| format!("{:.1}", r)).unwrap_or_default(),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(3),  // #
        Constraint::Min(24),    // VENUE
        Constraint::Min(24),    // ATTRIBUTES
        Constraint::Length(7),  // RATING
    ];
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["#", "VENUE", "ATTRIBUTES", "RATING"]).style(keybind_style()))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(
                    " {} → {} ",
                    truncate_str(&state.wizard.start().name, 30),
                    truncate_str(&state.wizard.end().name, 30)
                ))
                .border_style(Style::default().fg(colors::HEADER)),
        );
    frame.render_widget(table, area);

    match &state.suggestions {
        SuggestionState::Disabled => render_empty_message(frame, area, "Pick at least one attribute for the first stop."),
        SuggestionState::Pending => render_empty_message(frame, area, "Finding venues..."),
        SuggestionState::NotFound => render_empty_message(frame, area, "No venues found. Try different attributes."),
        SuggestionState::Ready(_) => {}
    }
}

fn render_footer(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!(mode = ?state.interaction_mode, "render_footer: called");
    let block = Block::default().borders(Borders::ALL);

    if let Some(error) = &state.error_message {
        let footer = Paragraph::new(Span::styled(format!(" Error: {}", error), Style::default().fg(colors::ERROR)))
            .block(block);
        frame.render_widget(footer, area);
        return;
    }

    let keybinds: Vec<(&str, &str)> = match (&state.interaction_mode, state.stage()) {
        (InteractionMode::EditLocation(_), _) => vec![("[Enter]", "Search"), ("[Esc]", "Cancel")],
        (InteractionMode::ChooseLocation(_), _) => vec![("[j/k]", "Move"), ("[Enter]", "Choose"), ("[Esc]", "Cancel")],
        (_, Stage::Location) => vec![("[j/k]", "Field"), ("[e]", "Edit"), ("[c]", "Clear")],
        (_, Stage::Filter) => vec![
            ("[Space]", "Toggle"),
            ("[a]", "Add stop"),
            ("[x]", "Remove stop"),
            ("[h/l]", "Stop"),
        ],
        (_, Stage::Results) => vec![("[j/k]", "Move"), ("[s]", "Save plan")],
    };

    let mut left_spans = vec![Span::raw(" ")];
    for (key, action) in keybinds {
        left_spans.push(Span::styled(key, keybind_style()));
        left_spans.push(Span::raw(format!(" {} ", action)));
    }

    let mut right_spans = Vec::new();
    let loading = state.loading;
    for (busy, label) in [
        (loading.attributes, "attributes"),
        (loading.geocode, "searching"),
        (loading.login, "logging in"),
        (loading.save, "saving"),
    ] {
        if busy {
            right_spans.push(Span::styled(format!("⟳ {} ", label), Style::default().fg(colors::LOADING)));
        }
    }
    if let Some(status) = &state.status_message {
        right_spans.push(Span::styled(format!("{} ", status), Style::default().fg(colors::DIM)));
    }
    right_spans.extend([
        Span::styled("[Tab]", keybind_style()),
        Span::raw(" Next "),
        Span::styled("[L]", keybind_style()),
        Span::raw(if state.logged_in { " Logout " } else { " Login " }),
        Span::styled("[?]", keybind_style()),
        Span::raw(" Help "),
        Span::styled("[q]", keybind_style()),
        Span::raw(" Quit "),
    ]);
    let right_line = Line::from(right_spans);

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(right_line.width() as u16)])
        .split(inner);
    frame.render_widget(Paragraph::new(Line::from(left_spans)), chunks[0]);
    frame.render_widget(Paragraph::new(right_line), chunks[1]);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    trace!("render_help_overlay: called");
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let section = |title: &'static str| Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD)));
    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                .fg(colors::HEADER),
        )),
        Line::from(""),
        section("Global"),
        key_line("Tab", "Next stage (when allowed)"),
        key_line("Shift+Tab", "Previous stage"),
        key_line("1/2/3", "Jump to stage"),
        key_line("L", "Log in / log out"),
        key_line("?", "Toggle help"),
        key_line("q", "Quit"),
        Line::from(""),
        section("Location"),
        key_line("j/k", "Switch between start and end"),
        key_line("e/Enter", "Type a place and search"),
        key_line("c", "Clear the selected location"),
        Line::from(""),
        section("Attributes"),
        key_line("Space", "Toggle attribute on the active stop"),
        key_line("a", "Add a stop"),
        key_line("x", "Remove the active stop"),
        key_line("h/l", "Previous / next stop"),
        Line::from(""),
        section("Results"),
        key_line("s", "Save the plan"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help (? to close) ")
                .style(Style::default().bg(Color::Black)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(help, popup_area);
}

fn key_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{:<12}", key), Style::default().fg(colors::KEYBIND)),
        Span::raw(desc),
    ])
}

fn field_line(label: &'static str, spans: Vec<Span<'static>>, focused: bool) -> Line<'static> {
    let label_style = if focused {
        Style::default().fg(colors::ACTIVE).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(colors::DIM)
    };
    let mut line = vec![Span::styled(format!("  {:<10}", label), label_style)];
    line.extend(spans);
    Line::from(line)
}

fn form_footer(error: Option<&String>, busy: bool, hint: &'static str) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];
    if let Some(error) = error {
        lines.push(Line::from(Span::styled(format!("  {}", error), Style::default().fg(colors::ERROR))));
    } else if busy {
        lines.push(Line::from(Span::styled("  Working...", Style::default().fg(colors::LOADING))));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(hint, Style::default().fg(colors::DIM))));
    lines
}

fn render_login_overlay(form: &LoginForm, busy: bool, frame: &mut Frame, area: Rect) {
    trace!("render_login_overlay: called");
    let popup_area = centered_rect(50, 30, area);
    frame.render_widget(Clear, popup_area);

    let mut content = vec![
        Line::from(""),
        field_line("Email", input_spans(&form.email, false, !form.password_focused), !form.password_focused),
        field_line("Password", input_spans(&form.password, true, form.password_focused), form.password_focused),
    ];
    content.extend(form_footer(form.error.as_ref(), busy, "  Tab: switch  Enter: log in  Esc: cancel"));

    let dialog = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Log in ")
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(dialog, popup_area);
}

fn render_save_overlay(form: &SaveForm, busy: bool, frame: &mut Frame, area: Rect) {
    trace!("render_save_overlay: called");
    let popup_area = centered_rect(50, 35, area);
    frame.render_widget(Clear, popup_area);

    let mut content = vec![
        Line::from(""),
        field_line("Name", input_spans(&form.name, false, form.focus == SaveField::Name), form.focus == SaveField::Name),
        field_line("Date", input_spans(&form.date, false, form.focus == SaveField::Date), form.focus == SaveField::Date),
        field_line("Time", input_spans(&form.time, false, form.focus == SaveField::Time), form.focus == SaveField::Time),
        Line::from(Span::styled(
            "  Date is YYYY-MM-DD, time is HH:MM. Both optional.",
            Style::default().fg(colors::DIM),
        )),
    ];
    content.extend(form_footer(form.error.as_ref(), busy, "  Tab: next field  Enter: save  Esc: cancel"));

    let dialog = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Save plan ")
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(dialog, popup_area);
}

fn render_saved_plan_overlay(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!("render_saved_plan_overlay: called");
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let Some(plan) = &state.saved_plan else {
        render_empty_message(frame, popup_area, "Plan saved.");
        return;
    };

    let when = match (plan.start_date, plan.start_time) {
        (Some(d), Some(t)) => format!("{} at {}", d.format("%a %-d %b %Y"), t.format("%H:%M")),
        (Some(d), None) => d.format("%a %-d %b %Y").to_string(),
        (None, Some(t)) => format!("at {}", t.format("%H:%M")),
        (None, None) => "No date set".to_string(),
    };

    let mut content = vec![
        Line::from(Span::styled(
            plan.name.clone(),
            Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(when, Style::default().fg(colors::DIM))),
        Line::from(""),
        Line::from(vec![Span::styled("  Start  ", keybind_style()), Span::raw(plan.start.name.clone())]),
    ];
    for (i, venue) in plan.venues.iter().enumerate() {
        content.push(Line::from(vec![
            Span::styled(format!("  {:>5}  ", i + 1), keybind_style()),
            Span::raw(venue.name.clone()),
        ]));
    }
    content.push(Line::from(vec![Span::styled("  End    ", keybind_style()), Span::raw(plan.end.name.clone())]));

    if let Some(route) = &state.saved_route {
        content.push(Line::from(""));
        content.push(Line::from(format!(
            "  Walking: {:.1} km, about {} min",
            route.kilometres(),
            route.minutes()
        )));
    }
    content.push(Line::from(""));
    content.push(Line::from(Span::styled("  Esc: close", Style::default().fg(colors::DIM))));

    let dialog = Paragraph::new(content).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Plan #{} saved ", plan.id))
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(dialog, popup_area);
}

fn render_empty_message(frame: &mut Frame, area: Rect, message: &str) {
    trace!(%message, "render_empty_message: called");
    let inner = area.inner(Margin {
        horizontal: 2,
        vertical: 2,
    });

    let empty = Paragraph::new(message)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(empty, inner);
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Truncate a string for display, on a character boundary
fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
