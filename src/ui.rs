use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use crate::app::{App, DetailView, InputMode, SlotState, ThemeMode};
use crate::fetch::{DetailRecord, Slot};
use crate::highlight::{highlight, Emphasis};
use crate::model::{CachedAirport, FlightDetail, FlightLeg, GateDetail, SearchTarget, WeatherRecord};

struct Theme {
    accent: Color,
    warn: Color,
    danger: Color,
    dim: Color,
    highlight_fg: Color,
    highlight_bg: Color,
    header_bg: Color,
    panel_bg: Color,
    lifr: Color,
    ifr: Color,
    mvfr: Color,
}

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub fn ui(f: &mut Frame, app: &App) {
    let area = f.area();
    let search_height = if app.search_expanded || app.input_mode == InputMode::Search {
        3
    } else {
        0
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if app.nav_open { 4 } else { 3 }),
            Constraint::Length(search_height),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, chunks[0], app);
    if search_height > 0 {
        render_search(f, chunks[1], app);
    }

    match &app.detail {
        Some(detail) => render_detail(f, chunks[2], app, detail),
        None => render_home(f, chunks[2], app),
    }

    render_footer(f, chunks[3], app);

    if app.input_mode == InputMode::Search && search_height > 0 {
        render_dropdown(f, chunks[1], chunks[2], app);
    }
    if app.input_mode == InputMode::Help {
        render_help_menu(f, area, app);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let activity = if app.is_loading() {
        Span::styled(
            format!("LOADING {}", SPINNER[(app.tick / 4) as usize % SPINNER.len()]),
            Style::default().fg(theme.warn),
        )
    } else {
        Span::styled("READY", Style::default().fg(Color::Green))
    };
    let user = app.user_email.as_deref().unwrap_or("anonymous");

    let mut lines = vec![Line::from(vec![
        Span::styled(
            "CIRROSTRATS",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(format!("SRC {}", app.source_label)),
        Span::raw(" | "),
        Span::raw(format!("USER {user}")),
        Span::raw(" | "),
        Span::raw(format!("THEME {}", app.theme_mode.label())),
        Span::raw(" | "),
        activity,
    ])];
    if app.nav_open {
        lines.push(Line::from(vec![
            Span::styled("NAV ", Style::default().fg(theme.accent)),
            Span::styled("[/]Search ", Style::default().fg(theme.dim)),
            Span::styled("[b]Home ", Style::default().fg(theme.dim)),
            Span::styled("[t]Theme ", Style::default().fg(theme.dim)),
            Span::styled("[?]Help ", Style::default().fg(theme.dim)),
            Span::styled("[q]Quit", Style::default().fg(theme.dim)),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(theme.header_bg));
    f.render_widget(paragraph, area);
}

fn render_search(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let editing = app.input_mode == InputMode::Search;
    let mut spans = vec![Span::styled("> ", Style::default().fg(theme.accent))];
    if app.query.is_empty() && !editing {
        spans.push(Span::styled(
            "Search airport, flight or gate (press /)",
            Style::default().fg(theme.dim),
        ));
    } else {
        spans.push(Span::raw(app.query.clone()));
        if editing {
            let cursor = if app.tick % 10 < 5 { "_" } else { " " };
            spans.push(Span::styled(cursor, Style::default().fg(theme.accent)));
        }
    }

    let border = if editing { theme.accent } else { theme.dim };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title("SEARCH");
    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_dropdown(f: &mut Frame, anchor: Rect, body: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let rows = app.suggestions.len().max(1) as u16;
    let height = (rows + 2).min(body.height);
    if height < 3 {
        return;
    }
    let popup = Rect {
        x: anchor.x + 1,
        y: body.y,
        width: anchor.width.saturating_sub(2).min(72),
        height,
    };
    f.render_widget(Clear, popup);

    let lines: Vec<Line> = if app.suggestions.is_empty() {
        let text = if app.suggestions_loading {
            "searching..."
        } else {
            "no suggestions"
        };
        vec![Line::from(Span::styled(text, Style::default().fg(theme.dim)))]
    } else {
        app.suggestions
            .iter()
            .enumerate()
            .map(|(i, option)| {
                let kind = format!("{:<8}", option.kind_label());
                if app.suggestion_cursor == Some(i) {
                    Line::from(vec![
                        Span::styled(
                            kind,
                            Style::default()
                                .fg(theme.highlight_fg)
                                .bg(theme.highlight_bg),
                        ),
                        Span::styled(
                            option.label.clone(),
                            Style::default()
                                .fg(theme.highlight_fg)
                                .bg(theme.highlight_bg)
                                .add_modifier(Modifier::BOLD),
                        ),
                    ])
                } else {
                    Line::from(vec![
                        Span::styled(kind, Style::default().fg(theme.dim)),
                        Span::raw(option.label.clone()),
                    ])
                }
            })
            .collect()
    };

    let title = if app.suggestions_loading {
        "SUGGESTIONS ..."
    } else {
        "SUGGESTIONS"
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, popup);
}

fn render_home(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Airport weather, NAS status, flights and gates",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  /        start typing an airport (JFK), flight (UA4433) or gate (C101)"),
        Line::from("  up/down  pick a suggestion"),
        Line::from("  enter    open it"),
        Line::from(""),
        Line::from(Span::styled(
            "Weather emphasis: LIFR  IFR  MVFR  hazards  altimeter  runways",
            Style::default().fg(theme.dim),
        )),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("HOME");
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_detail(f: &mut Frame, area: Rect, app: &App, detail: &DetailView) {
    let theme = theme(app.theme_mode);
    let title = format!(
        "{} {}",
        detail.target.kind_label().to_ascii_uppercase(),
        detail.target.label
    );

    if detail.record_loading {
        render_skeleton(f, area, app, &title, 6);
        return;
    }

    match (&detail.record, &detail.target.target) {
        (Some(Ok(DetailRecord::Flight(flight))), _) => {
            render_flight(f, area, app, detail, flight)
        }
        (Some(Ok(DetailRecord::Gate(gate))), _) => render_gate(f, area, app, detail, gate),
        (Some(Ok(DetailRecord::Airport(airport))), _) => {
            render_airport(f, area, app, detail, Some(airport))
        }
        (Some(Err(_)), SearchTarget::Airport { .. }) => render_airport(f, area, app, detail, None),
        (Some(Err(err)), _) => {
            let text = if err == "not found" {
                format!("{} was not found", detail.target.value())
            } else {
                format!("could not load {}: {err}", detail.target.value())
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(title);
            let paragraph = Paragraph::new(Line::from(Span::styled(
                text,
                Style::default().fg(theme.danger),
            )))
            .block(block)
            .style(Style::default().bg(theme.panel_bg));
            f.render_widget(paragraph, area);
        }
        (None, _) => render_skeleton(f, area, app, &title, 6),
    }
}

fn render_airport(
    f: &mut Frame,
    area: Rect,
    app: &App,
    detail: &DetailView,
    airport: Option<&CachedAirport>,
) {
    let theme = theme(app.theme_mode);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(4)])
        .split(area);

    let code = airport
        .and_then(|a| a.code.clone())
        .or_else(|| detail.slot(Slot::Airport).and_then(|s| s.airport.code.clone()));
    let name = airport.and_then(|a| a.name.clone());
    let icao = detail
        .slot(Slot::Airport)
        .and_then(|s| s.airport.icao.clone());
    let line = Line::from(vec![
        Span::styled(
            fmt_text(code.as_deref()),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(fmt_text(name.as_deref())),
        Span::raw("  "),
        Span::styled(
            format!("ICAO {}", fmt_text(icao.as_deref())),
            Style::default().fg(theme.dim),
        ),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("AIRPORT");
    f.render_widget(
        Paragraph::new(line)
            .block(block)
            .style(Style::default().bg(theme.panel_bg)),
        chunks[0],
    );

    render_slot(f, chunks[1], app, detail.slot(Slot::Airport));
}

fn render_flight(
    f: &mut Frame,
    area: Rect,
    app: &App,
    detail: &DetailView,
    flight: &FlightDetail,
) {
    let theme = theme(app.theme_mode);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6)])
        .split(area);

    let summary = vec![
        Line::from(vec![
            Span::styled(
                fmt_text(flight.flight_id.as_deref().or(Some(&detail.target.label))),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  REG "),
            Span::raw(fmt_text(flight.registration.as_deref())),
            Span::raw("  ALT "),
            Span::raw(fmt_text(flight.filed_altitude.as_deref())),
        ]),
        Line::from(vec![
            Span::styled("ROUTE ", Style::default().fg(theme.dim)),
            Span::raw(fmt_text(flight.route.as_deref())),
        ]),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("FLIGHT");
    f.render_widget(
        Paragraph::new(summary)
            .block(block)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(theme.panel_bg)),
        chunks[0],
    );

    let legs = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    render_leg(f, legs[0], app, detail, Slot::Departure, flight.departure.as_ref());
    render_leg(f, legs[1], app, detail, Slot::Arrival, flight.arrival.as_ref());
}

fn render_leg(
    f: &mut Frame,
    area: Rect,
    app: &App,
    detail: &DetailView,
    slot: Slot,
    leg: Option<&FlightLeg>,
) {
    let theme = theme(app.theme_mode);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(4)])
        .split(area);

    let title = format!(
        "{} {}",
        slot.label().to_ascii_uppercase(),
        fmt_text(leg.and_then(|l| l.code.as_deref()))
    );
    let lines = match leg {
        Some(leg) => vec![
            kv_line("GATE", leg.gate.as_deref(), &theme),
            kv_line("SCHEDULED", leg.scheduled.as_deref(), &theme),
            kv_line("ESTIMATED", leg.estimated.as_deref(), &theme),
        ],
        None => vec![Line::from(Span::styled(
            "no data",
            Style::default().fg(theme.dim),
        ))],
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title);
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .style(Style::default().bg(theme.panel_bg)),
        chunks[0],
    );

    render_slot(f, chunks[1], app, detail.slot(slot));
}

fn render_gate(f: &mut Frame, area: Rect, app: &App, detail: &DetailView, gate: &GateDetail) {
    let theme = theme(app.theme_mode);
    let table_height = (gate.flights.len() as u16 + 3).clamp(4, 12);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(table_height), Constraint::Min(4)])
        .split(area);

    let header = Row::new(vec![
        Cell::from("FLIGHT"),
        Cell::from("SCHEDULED"),
        Cell::from("DEST"),
    ])
    .style(
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD),
    );
    let rows: Vec<Row> = gate
        .flights
        .iter()
        .map(|flight| {
            Row::new(vec![
                Cell::from(fmt_text(flight.flight_id.as_deref())),
                Cell::from(fmt_text(flight.scheduled.as_deref())),
                Cell::from(fmt_text(flight.destination.as_deref())),
            ])
        })
        .collect();
    let title = format!(
        "GATE {} {}",
        fmt_text(gate.airport.as_deref()),
        gate.gate.as_deref().unwrap_or(&detail.target.label)
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title);
    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(26),
            Constraint::Min(6),
        ],
    )
    .header(header)
    .block(block)
    .style(Style::default().bg(theme.panel_bg));
    f.render_widget(table, chunks[0]);

    render_slot(f, chunks[1], app, detail.slot(Slot::Airport));
}

fn render_slot(f: &mut Frame, area: Rect, app: &App, state: Option<&SlotState>) {
    let theme = theme(app.theme_mode);
    let Some(state) = state else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title("WEATHER");
        f.render_widget(
            Paragraph::new(Span::styled(
                "no airport to report on",
                Style::default().fg(theme.dim),
            ))
            .block(block)
            .style(Style::default().bg(theme.panel_bg)),
            area,
        );
        return;
    };

    let nas_rows = state
        .nas
        .as_ref()
        .and_then(|nas| nas.as_ref().ok())
        .map(|nas| nas.programs.values().map(|fields| fields.len()).sum::<usize>())
        .unwrap_or(1)
        .max(1) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(nas_rows + 3)])
        .split(area);

    render_weather(f, chunks[0], app, state);
    render_nas(f, chunks[1], app, state);
}

fn render_weather(f: &mut Frame, area: Rect, app: &App, state: &SlotState) {
    let theme = theme(app.theme_mode);
    let source = state
        .weather
        .as_ref()
        .map(|w| w.source.label().to_ascii_uppercase())
        .unwrap_or_else(|| "--".to_string());
    let title = if state.weather_loading {
        format!("WEATHER {source} (updating)")
    } else {
        format!("WEATHER {source}")
    };

    if state.weather.is_none() && state.weather_loading {
        render_skeleton(f, area, app, &title, 3);
        return;
    }

    let lines = match &state.weather {
        Some(selected) => weather_lines(&selected.record, &theme),
        None => vec![Line::from(Span::styled(
            "no weather available",
            Style::default().fg(theme.dim),
        ))],
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title);
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .style(Style::default().bg(theme.panel_bg)),
        area,
    );
}

fn weather_lines<'a>(record: &'a WeatherRecord, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    for (label, text) in record.rows() {
        let mut spans = vec![Span::styled(
            format!("{label:<7}"),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )];
        match text {
            Some(text) => spans.extend(highlight(text).into_iter().map(|fragment| {
                Span::styled(fragment.text, emphasis_style(fragment.emphasis, theme))
            })),
            None => spans.push(Span::styled("--", Style::default().fg(theme.dim))),
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn emphasis_style(emphasis: Option<Emphasis>, theme: &Theme) -> Style {
    match emphasis {
        None => Style::default(),
        Some(Emphasis::Lifr) => Style::default()
            .fg(theme.lifr)
            .add_modifier(Modifier::BOLD),
        Some(Emphasis::Ifr) => Style::default().fg(theme.ifr).add_modifier(Modifier::BOLD),
        Some(Emphasis::Mvfr) => Style::default().fg(theme.mvfr),
        Some(Emphasis::Hazard) => Style::default()
            .fg(theme.warn)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        Some(Emphasis::Altimeter) => Style::default().fg(theme.accent),
        Some(Emphasis::Runway) => Style::default().add_modifier(Modifier::BOLD),
    }
}

fn render_nas(f: &mut Frame, area: Rect, app: &App, state: &SlotState) {
    let theme = theme(app.theme_mode);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("NAS STATUS");

    if state.nas_loading {
        render_skeleton(f, area, app, "NAS STATUS", 1);
        return;
    }

    let message = match &state.nas {
        None => Some(("no NAS data".to_string(), theme.dim)),
        Some(Err(err)) => Some((format!("unavailable: {err}"), theme.dim)),
        Some(Ok(nas)) if nas.is_empty() => Some(("no active delays".to_string(), Color::Green)),
        Some(Ok(_)) => None,
    };
    if let Some((text, color)) = message {
        f.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(color)))
                .block(block)
                .style(Style::default().bg(theme.panel_bg)),
            area,
        );
        return;
    }

    let mut rows = Vec::new();
    if let Some(Ok(nas)) = &state.nas {
        for (program, fields) in &nas.programs {
            for (i, (key, value)) in fields.iter().enumerate() {
                let program_cell = if i == 0 {
                    Cell::from(program.clone()).style(
                        Style::default()
                            .fg(theme.warn)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Cell::from("")
                };
                rows.push(Row::new(vec![
                    program_cell,
                    Cell::from(key.clone()).style(Style::default().fg(theme.dim)),
                    Cell::from(value.clone()),
                ]));
            }
        }
    }
    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
    )
    .block(block)
    .style(Style::default().bg(theme.panel_bg));
    f.render_widget(table, area);
}

fn render_skeleton(f: &mut Frame, area: Rect, app: &App, title: &str, rows: usize) {
    let theme = theme(app.theme_mode);
    let width = area.width.saturating_sub(4) as usize;
    let lines: Vec<Line> = (0..rows)
        .map(|row| {
            Line::from(Span::styled(
                skeleton_bar(width, app.tick + row as u64 * 3),
                Style::default().fg(theme.dim),
            ))
        })
        .collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title.to_string());
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .style(Style::default().bg(theme.panel_bg)),
        area,
    );
}

/// Placeholder bar with a bright band sweeping across it.
fn skeleton_bar(width: usize, tick: u64) -> String {
    if width == 0 {
        return String::new();
    }
    let band = (width / 6).max(1);
    let start = (tick as usize) % width;
    (0..width)
        .map(|i| {
            let offset = (i + width - start) % width;
            if offset < band {
                '▓'
            } else {
                '░'
            }
        })
        .collect()
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let help = match app.input_mode {
        InputMode::Search => "type to search  up/down pick  enter open  esc close  ctrl+u clear",
        InputMode::Help => "esc close help",
        InputMode::Normal => "q quit  / search  b home  n nav  t theme  ? help",
    };
    let mut spans = vec![Span::styled(help, Style::default().fg(theme.dim))];
    if let Some(status) = app.status_text() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            status.to_string(),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_help_menu(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let popup = centered_rect(60, 18, area);
    f.render_widget(Clear, popup);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default().fg(theme.dim).add_modifier(Modifier::BOLD),
        ))
    };
    let lines = vec![
        section("Search"),
        Line::from("  /          Open search box"),
        Line::from("  ↑/↓        Pick a suggestion"),
        Line::from("  Enter      Open selection or typed code"),
        Line::from("  Esc        Close search"),
        Line::from(""),
        section("Display"),
        Line::from("  b          Back to home"),
        Line::from("  n          Toggle nav bar"),
        Line::from("  t          Cycle theme (saved to config)"),
        Line::from(""),
        section("Quit"),
        Line::from("  q          Quit"),
        Line::from("  ? / h      Toggle help"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc to close",
            Style::default().fg(theme.dim),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("HELP");
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, popup);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height.saturating_sub(2)).max(3);
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(height),
            Constraint::Min(1),
        ])
        .split(area);
    let vertical = popup_layout[1];
    let width = (vertical.width * percent_x / 100).max(20);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(width),
            Constraint::Min(1),
        ])
        .split(vertical);
    horizontal[1]
}

fn kv_line<'a>(key: &'a str, value: Option<&'a str>, theme: &Theme) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{key:<10}"), Style::default().fg(theme.dim)),
        Span::raw(fmt_text(value)),
    ])
}

fn fmt_text(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => "--".to_string(),
    }
}

fn theme(mode: ThemeMode) -> Theme {
    match mode {
        ThemeMode::Default => Theme {
            accent: Color::Yellow,
            warn: Color::Yellow,
            danger: Color::Red,
            dim: Color::DarkGray,
            highlight_fg: Color::Black,
            highlight_bg: Color::Rgb(200, 200, 200),
            header_bg: Color::Rgb(24, 24, 28),
            panel_bg: Color::Rgb(18, 18, 22),
            lifr: Color::Magenta,
            ifr: Color::Red,
            mvfr: Color::LightBlue,
        },
        ThemeMode::ColorBlind => Theme {
            accent: Color::Cyan,
            warn: Color::LightCyan,
            danger: Color::LightRed,
            dim: Color::DarkGray,
            highlight_fg: Color::Black,
            highlight_bg: Color::LightCyan,
            header_bg: Color::Rgb(20, 26, 30),
            panel_bg: Color::Rgb(14, 20, 24),
            lifr: Color::Rgb(230, 159, 0),
            ifr: Color::Rgb(213, 94, 0),
            mvfr: Color::Rgb(86, 180, 233),
        },
        ThemeMode::Amber => Theme {
            accent: Color::Rgb(255, 191, 0),
            warn: Color::Rgb(255, 220, 120),
            danger: Color::LightRed,
            dim: Color::Rgb(140, 110, 40),
            highlight_fg: Color::Black,
            highlight_bg: Color::Rgb(255, 220, 120),
            header_bg: Color::Rgb(32, 24, 14),
            panel_bg: Color::Rgb(24, 18, 10),
            lifr: Color::LightMagenta,
            ifr: Color::LightRed,
            mvfr: Color::LightBlue,
        },
        ThemeMode::Monochrome => Theme {
            accent: Color::White,
            warn: Color::White,
            danger: Color::White,
            dim: Color::Gray,
            highlight_fg: Color::Black,
            highlight_bg: Color::White,
            header_bg: Color::Black,
            panel_bg: Color::Black,
            lifr: Color::White,
            ifr: Color::White,
            mvfr: Color::Gray,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{airport_slots, DetailEvent, DetailMessage};
    use crate::fixtures::FixtureBackend;
    use crate::api::Backend;
    use crate::model::SearchOption;
    use chrono::Utc;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::path::PathBuf;
    use std::time::Duration;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn text_helpers() {
        assert_eq!(fmt_text(None), "--");
        assert_eq!(fmt_text(Some("   ")), "--");
        assert_eq!(fmt_text(Some(" C101 ")), "C101");
        assert_eq!(skeleton_bar(0, 3), "");
        let bar = skeleton_bar(12, 5);
        assert_eq!(bar.chars().count(), 12);
        assert_eq!(bar.chars().filter(|c| *c == '▓').count(), 2);
        assert_ne!(skeleton_bar(12, 5), skeleton_bar(12, 6));
    }

    #[test]
    fn weather_rows_are_highlighted() {
        let record = WeatherRecord {
            datis: None,
            metar: Some("KEWR 171751Z 1 1/2SM -TSRA OVC004 A2990".to_string()),
            taf: Some("KEWR 1718/1824 P6SM FEW250".to_string()),
        };
        let theme = theme(ThemeMode::Default);
        let lines = weather_lines(&record, &theme);
        assert_eq!(lines.len(), 3);
        let text: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.starts_with("METAR"));
        assert!(text.ends_with("A2990"));
        assert!(lines[1]
            .spans
            .iter()
            .any(|s| s.content == "OVC004" && s.style.fg == Some(theme.lifr)));
        assert_eq!(lines[0].spans[1].content, "--");
    }

    #[test]
    fn flight_detail_renders_both_legs() {
        let backend = FixtureBackend::default();
        let flight = backend.flight_detail("GJS4433").unwrap();
        let target = SearchOption {
            label: "UA4433 (GJS4433)".to_string(),
            st_id: None,
            target: SearchTarget::Flight {
                flight_number: "GJS4433".to_string(),
                flight_id: Some("GJS4433".to_string()),
            },
        };
        let mut app = App::new(
            ThemeMode::Default,
            PathBuf::from("cirrostrats.toml"),
            Duration::ZERO,
            None,
            "fixtures".to_string(),
        );
        app.query = "GJS4433".to_string();
        let pool = crate::fetch::load_pool(&backend);
        app.apply_suggestions(crate::fetch::SuggestionMessage::Pool(pool));
        let submitted = app.submit(Utc::now()).unwrap();
        let record = DetailRecord::Flight(flight);
        let slots = airport_slots(&target, Some(&record));
        app.apply_detail(DetailMessage {
            generation: submitted.request.generation,
            event: DetailEvent::Record {
                record: Ok(record),
                slots,
            },
        });

        let mut terminal = Terminal::new(TestBackend::new(140, 48)).unwrap();
        terminal.draw(|f| ui(f, &app)).unwrap();
        let screen = screen_text(&terminal);
        assert!(screen.contains("DEPARTURE EWR"));
        assert!(screen.contains("ARRIVAL ORD"));
        assert!(screen.contains("C101"));
        assert!(screen.contains("METAR"));
        assert!(screen.contains("TAF"));
        assert!(screen.contains("D-ATIS"));
    }
}
