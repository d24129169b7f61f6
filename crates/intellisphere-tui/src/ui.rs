//! Rendering routines for the IntelliSphere TUI.

use crate::app::{App, Focus};
use chrono::{DateTime, Local};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState, Wrap,
};

const PRIMARY: Color = Color::Rgb(236, 91, 43);
const SECONDARY: Color = Color::Rgb(238, 121, 72);
const TEXT: Color = Color::Rgb(238, 238, 238);
const TEXT_MUTED: Color = Color::Rgb(128, 128, 128);
const BORDER: Color = Color::Rgb(60, 60, 60);
const BORDER_ACTIVE: Color = Color::Rgb(238, 121, 72);
const YELLOW: Color = Color::Rgb(229, 192, 123);
const RED: Color = Color::Rgb(255, 110, 110);

const SLASH_PALETTE_HEIGHT: u16 = 10;
const HEADER_HEIGHT: u16 = 6;
const SIDEBAR_WIDTH: u16 = 32;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HERO_ART: [&str; 2] = [
    " █ █▄ █ ▀█▀ █▀▀ █   █   █ █▀▀ █▀█ █ █ █▀▀ █▀█ █▀▀",
    " █ █ ▀█  █  ██▄ █▄▄ █▄▄ █ ▄▄█ █▀▀ █▀█ ██▄ █▀▄ ██▄",
];

/// Draw the entire TUI frame.
pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT), // header bar
            Constraint::Min(0),                // sidebar + chat
            Constraint::Length(3),             // input
            Constraint::Length(1),             // status bar
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(root[1]);

    draw_header(frame, app, root[0]);
    draw_sessions(frame, app, body[0]);
    draw_chat(frame, app, body[1]);
    if app.show_slash_commands {
        draw_slash_palette(frame, body[1]);
    }
    draw_input(frame, app, root[2]);
    draw_status_bar(frame, app, root[3]);
}

/// Draw the header with the banner, login status, domain and session.
fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let label_style = Style::default().fg(TEXT_MUTED);
    let value_style = Style::default().fg(TEXT);
    let art_style = Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD);

    let mut lines: Vec<Line<'_>> = Vec::new();
    for (i, art_line) in HERO_ART.iter().enumerate() {
        if i == HERO_ART.len() - 1 {
            lines.push(Line::from(vec![
                Span::styled(*art_line, art_style),
                Span::styled(format!("  v{VERSION}"), Style::default().fg(TEXT_MUTED)),
            ]));
        } else {
            lines.push(Line::from(Span::styled(*art_line, art_style)));
        }
    }

    let greeting = app
        .greeting
        .clone()
        .unwrap_or_else(|| "Not logged in. Run `intellisphere login` first.".to_string());
    let session = app.active_label().unwrap_or_else(|| "none".to_string());
    lines.push(Line::from(vec![
        Span::styled("  domain ", label_style),
        Span::styled(app.domain_title(), Style::default().fg(SECONDARY)),
        Span::styled("  session ", label_style),
        Span::styled(session, value_style),
        Span::styled(format!("  {greeting}"), label_style),
    ]));

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Draw the session list sidebar, with the row menu when open.
fn draw_sessions(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let focused = app.focus == Focus::Sessions;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused { BORDER_ACTIVE } else { BORDER }))
        .title(Span::styled(
            " Sessions ",
            Style::default().fg(if focused { SECONDARY } else { TEXT_MUTED }),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = render_session_lines(app);
    // Keep the highlighted row visible; each row takes two lines.
    let row_offset = (app.selected_row as u16 * 2)
        .saturating_sub(inner.height.saturating_sub(2));
    frame.render_widget(Paragraph::new(lines).scroll((row_offset, 0)), inner);

    if app.menu_open {
        draw_row_menu(frame, inner);
    }
}

fn render_session_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if app.sessions.is_empty() {
        lines.push(Line::from(Span::styled(
            " No sessions yet. Use /new to create one.",
            Style::default().fg(TEXT_MUTED),
        )));
        return lines;
    }

    let focused = app.focus == Focus::Sessions;
    for (idx, row) in app.sessions.rows().iter().enumerate() {
        let is_selected = focused && idx == app.selected_row;
        let marker = if is_selected { ">" } else { " " };
        let style = match (row.active, is_selected) {
            (true, _) => Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
            (false, true) => Style::default().fg(SECONDARY),
            (false, false) => Style::default().fg(TEXT),
        };
        let active_tag = if row.active { " ●" } else { "" };

        lines.push(Line::from(vec![
            Span::styled(format!(" {marker} "), style),
            Span::styled(row.label.clone(), style),
            Span::styled(active_tag, style),
        ]));
        lines.push(Line::from(Span::styled(
            format!("   {}", created_label(row.created_at)),
            Style::default().fg(TEXT_MUTED),
        )));
    }
    lines
}

/// Creation time in local time, or the raw value when out of range.
fn created_label(created_at: i64) -> String {
    DateTime::from_timestamp_millis(created_at)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| created_at.to_string())
}

fn draw_row_menu(frame: &mut Frame<'_>, area: Rect) {
    let height = 4.min(area.height);
    let menu_area = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(height),
        width: area.width.saturating_sub(2),
        height,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(PRIMARY))
        .style(Style::default().bg(Color::Rgb(20, 20, 20)));
    let lines = vec![
        Line::from(vec![
            Span::styled(" d ", Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)),
            Span::styled("Delete", Style::default().fg(RED)),
        ]),
        Line::from(Span::styled(
            " Esc to close",
            Style::default().fg(TEXT_MUTED).add_modifier(Modifier::ITALIC),
        )),
    ];
    frame.render_widget(Clear, menu_area);
    frame.render_widget(Paragraph::new(lines).block(block), menu_area);
}

/// Draw the chat transcript with border and scrollbar.
fn draw_chat(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    app.sync_scroll();
    let lines = app.render_lines();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Chat ", Style::default().fg(TEXT_MUTED)));

    let inner = block.inner(area);
    let content_width = inner.width.saturating_sub(1); // -1 for scrollbar
    let content_height = inner.height as usize;

    let total_lines = Paragraph::new(lines.clone())
        .wrap(Wrap { trim: false })
        .line_count(content_width)
        .max(1);

    let max_scroll = total_lines.saturating_sub(content_height) as u16;
    app.update_scroll_bounds(max_scroll);
    let scroll = app.scroll;

    let chat_inner = Rect {
        width: inner.width.saturating_sub(1),
        ..inner
    };

    let chat = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(block, area);
    frame.render_widget(chat, chat_inner);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::default()
            .content_length(total_lines)
            .position(scroll as usize)
            .viewport_content_length(content_height);
        let scrollbar_area = Rect {
            x: inner.x + inner.width.saturating_sub(1),
            y: inner.y,
            width: 1,
            height: inner.height,
        };
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .style(Style::default().fg(BORDER))
                .thumb_style(Style::default().fg(TEXT_MUTED)),
            scrollbar_area,
            &mut scrollbar_state,
        );
    }
}

/// Draw the input box with border and cursor.
fn draw_input(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let is_active = app.focus == Focus::Input;
    let border_color = if is_active { BORDER_ACTIVE } else { BORDER };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(
            " Ask ",
            Style::default().fg(if is_active { SECONDARY } else { TEXT_MUTED }),
        ));

    let inner = block.inner(area);

    let prompt_style = Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD);
    let input_text = if app.input.is_empty() {
        Line::from(vec![
            Span::styled(" ", prompt_style),
            Span::styled(
                format!("Ask about {}...", app.domain_title()),
                Style::default().fg(TEXT_MUTED),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled(" ", prompt_style),
            Span::styled(app.input.as_str(), Style::default().fg(TEXT)),
        ])
    };

    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(input_text), inner);

    if is_active {
        let width = app.input.chars().count() as u16;
        frame.set_cursor_position((inner.x + 1 + width, inner.y));
    }
}

/// Draw the status bar at the bottom.
fn draw_status_bar(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let status_color = match app.status.as_str() {
        "idle" => TEXT_MUTED,
        "loading" | "waiting for reply" => PRIMARY,
        _ => YELLOW,
    };

    let key = Style::default().fg(TEXT_MUTED);
    let hint = Style::default().fg(BORDER);
    let shortcuts = vec![
        Span::styled(" Ctrl+C", key),
        Span::styled(" quit", hint),
        Span::styled("  Ctrl+N", key),
        Span::styled(" new", hint),
        Span::styled("  Tab", key),
        Span::styled(" sessions", hint),
        Span::styled("  /", key),
        Span::styled(" commands", hint),
        Span::styled("  PgUp/PgDn", key),
        Span::styled(" scroll", hint),
    ];

    let right_text = format!(" {} ", app.status);
    let right_len = right_text.chars().count() as u16;
    let left_area = Rect {
        width: area.width.saturating_sub(right_len),
        ..area
    };
    let right_area = Rect {
        x: area.x + area.width.saturating_sub(right_len),
        width: right_len.min(area.width),
        ..area
    };

    frame.render_widget(Paragraph::new(Line::from(shortcuts)), left_area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            right_text,
            Style::default().fg(status_color),
        ))),
        right_area,
    );
}

fn draw_slash_palette(frame: &mut Frame<'_>, area: Rect) {
    let cmd_style = Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(TEXT_MUTED);
    let hint_style = Style::default()
        .fg(TEXT_MUTED)
        .add_modifier(Modifier::ITALIC);

    let lines = vec![
        Line::from(vec![]),
        Line::from(vec![
            Span::styled("  /new", cmd_style),
            Span::styled("          Start a new session", desc_style),
        ]),
        Line::from(vec![
            Span::styled("  /sessions", cmd_style),
            Span::styled("     Browse sessions", desc_style),
        ]),
        Line::from(vec![
            Span::styled("  /select <n>", cmd_style),
            Span::styled("   Open Session n", desc_style),
        ]),
        Line::from(vec![
            Span::styled("  /delete <n>", cmd_style),
            Span::styled("   Delete Session n", desc_style),
        ]),
        Line::from(vec![]),
        Line::from(Span::styled("  Esc to close", hint_style)),
    ];

    let height = SLASH_PALETTE_HEIGHT
        .min(area.height)
        .min(lines.len() as u16 + 2);

    let palette_area = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(height),
        width: area.width.saturating_sub(2).min(44),
        height,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(PRIMARY))
        .title(Span::styled(
            " Commands ",
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(Color::Rgb(20, 20, 20)));

    frame.render_widget(Clear, palette_area);
    frame.render_widget(Paragraph::new(lines).block(block), palette_area);
}
