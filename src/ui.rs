//! TUI rendering for Nimbus
//!
//! One page per saved city (current conditions plus forecast table), a city
//! input prompt and the settings screen, all drawn with `ratatui`.

use crate::app::{App, ViewMode};
use crate::format::capitalize_first_word;
use crate::models::{speed_suffix, temp_suffix, CurrentWeather, Forecast};
use ratatui::{prelude::*, widgets::*};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Renders one frame of the TUI based on current application state.
///
/// # Arguments
///
/// * `f` - The ratatui frame to draw into (from `terminal.draw()`).
/// * `app` - Current application state (cities, cached records, view mode).
pub fn render(f: &mut Frame, app: &App) {
    match app.view_mode {
        ViewMode::Weather => render_weather_view(f, app),
        ViewMode::AddCity => {
            render_weather_view(f, app);
            render_add_city_prompt(f, app);
        }
        ViewMode::Settings => render_settings_view(f, app),
    }
}

/// Weather view: city tabs, current conditions, forecast table, status bar.
fn render_weather_view(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(12),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.size());

    // City tabs, the terminal take on swiping between pages
    let titles: Vec<Line> = if app.cities.is_empty() {
        vec![Line::from(" no saved cities ")]
    } else {
        app.cities.iter().map(|c| Line::from(format!(" {} ", c))).collect()
    };
    let tabs = Tabs::new(titles)
        .select(app.selected_index)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .bg(Color::Rgb(30, 30, 60))
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .title(" Nimbus ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
    f.render_widget(tabs, chunks[0]);

    match &app.current {
        Some(current) => render_current(f, current, chunks[1]),
        None => {
            let hint = Paragraph::new(vec![
                Line::from(""),
                Line::from("No weather data yet."),
                Line::from("Press 'a' to add a city or 'c' for your current location."),
            ])
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(hint, chunks[1]);
        }
    }

    render_forecast(f, app.forecast.as_ref(), chunks[2]);
    render_status_bar(f, app, chunks[3]);
}

fn render_current(f: &mut Frame, w: &CurrentWeather, area: Rect) {
    let t = temp_suffix(w.is_metric);
    let s = speed_suffix(w.is_metric);
    let kind = w.kind.as_deref().unwrap_or("Unknown");
    let label = Style::default().add_modifier(Modifier::BOLD);

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{} ", number(w.temp, 0, t)),
                Style::default()
                    .fg(condition_color(kind))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(kind, Style::default().fg(condition_color(kind))),
            Span::raw("  │  "),
            Span::raw(capitalize_first_word(w.description.as_deref().unwrap_or(""))),
        ]),
        Line::from(vec![
            Span::styled("Feels like:  ", label),
            Span::raw(number(w.feels_like, 0, t)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Humidity:    ", label),
            Span::raw(number(w.humidity, 0, "%")),
            Span::raw("  │  "),
            Span::styled("Clouds: ", label),
            Span::raw(number(w.clouds, 0, "%")),
        ]),
        Line::from(vec![
            Span::styled("Wind:        ", label),
            Span::raw(number(w.wind_speed, 1, s)),
            Span::raw(format!(" {}", compass(w.wind_direction))),
        ]),
        Line::from(vec![
            Span::styled("Pressure:    ", label),
            Span::raw(number(w.sea_pressure, 0, " hPa")),
            Span::raw("  │  "),
            Span::styled("Ground: ", label),
            Span::raw(number(w.ground_pressure, 0, " hPa")),
        ]),
        Line::from(vec![
            Span::styled("Visibility:  ", label),
            Span::raw(match w.visibility {
                Some(m) => format!("{:.1} km", m / 1000.0),
                None => "--".to_string(),
            }),
        ]),
        Line::from(vec![
            Span::styled("Sun:         ", label),
            Span::styled(
                format!(
                    "↑ {}  ↓ {}",
                    w.sunrise.as_deref().unwrap_or("--"),
                    w.sunset.as_deref().unwrap_or("--")
                ),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw(format!("  (UTC{})", w.timezone.as_deref().unwrap_or("?"))),
        ]),
    ];

    let p = Paragraph::new(lines).block(
        Block::default()
            .title(format!(" {} ", w.city))
            .borders(Borders::ALL)
            .padding(Padding::new(2, 2, 0, 0)),
    );
    f.render_widget(p, area);
}

fn render_forecast(f: &mut Frame, forecast: Option<&Forecast>, area: Rect) {
    let block = Block::default()
        .title(" Forecast ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let Some(forecast) = forecast.filter(|fc| !fc.is_empty()) else {
        f.render_widget(
            Paragraph::new("No forecast cached.")
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    };

    let t = temp_suffix(forecast.is_metric);
    let s = speed_suffix(forecast.is_metric);
    let rows: Vec<Row> = forecast
        .steps()
        .map(|step| {
            let kind = step.kind.clone().unwrap_or_default();
            Row::new(vec![
                Cell::from(step.date),
                Cell::from(step.time),
                Cell::from(number(step.temp, 0, t)),
                Cell::from(kind.clone()).style(Style::default().fg(condition_color(&kind))),
                Cell::from(capitalize_first_word(step.description.as_deref().unwrap_or(""))),
                Cell::from(number(step.clouds, 0, "%")),
                Cell::from(number(step.wind_speed, 1, s)),
                Cell::from(
                    step.rain_probability
                        .map(|p| format!("{}%", p))
                        .unwrap_or_else(|| "--".to_string()),
                ),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(7),
        Constraint::Length(13),
        Constraint::Min(16),
        Constraint::Length(7),
        Constraint::Length(10),
        Constraint::Length(6),
    ];
    let header = Row::new(vec![
        "Date", "Time", "Temp", "Type", "Description", "Clouds", "Wind", "Rain",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    if app.is_loading() {
        spans.push(Span::styled(
            format!(" {} ", SPINNER[app.tick_count % SPINNER.len()]),
            Style::default().fg(Color::Cyan),
        ));
    }
    if app.offline {
        spans.push(Span::styled(
            " OFFLINE ",
            Style::default().fg(Color::Black).bg(Color::Red),
        ));
    }
    match &app.status {
        Some(msg) => spans.push(Span::styled(
            format!(" {} ", msg),
            Style::default().fg(Color::Yellow),
        )),
        None => spans.push(Span::styled(
            " ←/→ city  r refresh  a add  c here  d delete  s settings  q quit",
            Style::default().fg(Color::DarkGray),
        )),
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_add_city_prompt(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 3, f.size());
    let prompt = Paragraph::new(Line::from(vec![
        Span::raw(app.input.as_str()),
        Span::styled("█", Style::default().fg(Color::Cyan)),
    ]))
    .block(
        Block::default()
            .title(" Add city (Enter to search, Esc to cancel) ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(Clear, area);
    f.render_widget(prompt, area);
}

/// Settings view: units, language and forecast length.
fn render_settings_view(f: &mut Frame, app: &App) {
    let area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(2),
            Constraint::Length(1),
        ])
        .split(area);

    let title = Paragraph::new(" Settings ")
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let s = &app.settings;
    let sel = app.settings_selected_index;
    let rows: [(usize, &str, String); 3] = [
        (0, "Measurement units   ", s.units.as_str().to_string()),
        (1, "Language            ", s.lang_label().to_string()),
        (2, "Forecast timestamps ", s.number_of_timestamps.to_string()),
    ];
    let items: Vec<Line> = rows
        .iter()
        .map(|(idx, label, value)| {
            let style = if *idx == sel {
                Style::default()
                    .fg(Color::Cyan)
                    .bg(Color::Rgb(30, 30, 60))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("  {} ", label), style),
                Span::styled(value.as_str(), style),
            ])
        })
        .collect();

    let block = Block::default()
        .title(" Preferences ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);
    let inner = block.inner(chunks[1]);
    f.render_widget(block, chunks[1]);
    f.render_widget(Paragraph::new(items), inner);

    let help = Paragraph::new(" ↑/↓ select   Enter/Space change   x reset   q back")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(help, chunks[2]);

    if let Some(ref msg) = app.status {
        let p = Paragraph::new(msg.as_str())
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(p, chunks[3]);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(r.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Min(0),
        ])
        .split(vertical[1])[1]
}

fn number(value: Option<f64>, decimals: usize, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.*}{}", decimals, v, suffix),
        None => "--".to_string(),
    }
}

/// Eight-point compass label for a wind direction in degrees.
fn compass(deg: Option<f64>) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    match deg {
        Some(d) if d.is_finite() => POINTS[((d.rem_euclid(360.0) + 22.5) / 45.0) as usize % 8],
        _ => "",
    }
}

/// Accent color for a provider condition group ("Rain", "Clouds", ...).
fn condition_color(kind: &str) -> Color {
    match kind {
        "Clear" => Color::Yellow,
        "Clouds" => Color::Gray,
        "Rain" | "Drizzle" => Color::Blue,
        "Thunderstorm" => Color::Magenta,
        "Snow" => Color::White,
        _ => Color::Cyan,
    }
}
