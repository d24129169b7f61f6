//! Markdown to styled terminal lines for bot replies.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const CODE: Color = Color::Rgb(120, 190, 255);
const HEADING: Color = Color::Rgb(236, 91, 43);
const QUOTE: Color = Color::Rgb(128, 128, 128);

/// Convert a markdown string into lines, each prefixed with `indent`.
///
/// Block structure (headings, lists, code blocks, quotes) maps to separate
/// lines; inline emphasis maps to modifiers on the base style.
pub fn to_lines(source: &str, base: Style, indent: &str) -> Vec<Line<'static>> {
    let mut writer = Writer::new(base, indent);
    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH);
    for event in parser {
        writer.handle(event);
    }
    writer.finish()
}

struct Writer {
    base: Style,
    indent: String,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
}

impl Writer {
    fn new(base: Style, indent: &str) -> Self {
        Self {
            base,
            indent: indent.to_string(),
            lines: Vec::new(),
            current: Vec::new(),
            styles: vec![base],
            lists: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, patch: Style) {
        let style = self.style().patch(patch);
        self.styles.push(style);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    for line in text.lines() {
                        self.current
                            .push(Span::styled(format!("  {line}"), self.style()));
                        self.flush();
                    }
                } else {
                    self.current.push(Span::styled(text.into_string(), self.style()));
                }
            }
            Event::Code(code) => {
                let style = self.style().fg(CODE);
                self.current.push(Span::styled(code.into_string(), style));
            }
            Event::SoftBreak => self.current.push(Span::styled(" ", self.style())),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.current
                    .push(Span::styled("────────", self.base.fg(QUOTE)));
                self.flush();
                self.blank();
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.current.push(Span::styled(html.into_string(), self.style()));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { .. } => {
                self.flush();
                self.push_style(Style::default().fg(HEADING).add_modifier(Modifier::BOLD));
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { .. } => {
                self.push_style(Style::default().add_modifier(Modifier::UNDERLINED))
            }
            Tag::CodeBlock { .. } => {
                self.flush();
                self.in_code_block = true;
                self.push_style(Style::default().fg(CODE));
            }
            Tag::BlockQuote { .. } => {
                self.flush();
                self.quote_depth += 1;
                self.push_style(Style::default().fg(QUOTE));
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let bullet = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let label = format!("{number}. ");
                        *number += 1;
                        label
                    }
                    _ => "• ".to_string(),
                };
                self.current
                    .push(Span::styled(format!("{}{bullet}", "  ".repeat(depth)), self.base));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(level) => {
                self.pop_style();
                self.flush();
                if matches!(level, HeadingLevel::H1 | HeadingLevel::H2) {
                    self.blank();
                }
            }
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.pop_style()
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.pop_style();
                self.flush();
                self.blank();
            }
            TagEnd::BlockQuote { .. } => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
            }
            TagEnd::List { .. } => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            _ => {}
        }
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let mut spans = Vec::with_capacity(self.current.len() + 2);
        if !self.indent.is_empty() {
            spans.push(Span::raw(self.indent.clone()));
        }
        if self.quote_depth > 0 {
            spans.push(Span::styled("│ ".repeat(self.quote_depth), self.base.fg(QUOTE)));
        }
        spans.append(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}
