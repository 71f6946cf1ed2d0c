use chrono::{DateTime, Utc};
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph},
};

use crate::app::{App, Row};
use crate::keymap::Focus;
use crate::theme::Theme;
use crate::viewer::embed_url;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// Coarse "how long ago" for a visit timestamp.
pub fn ago(watched_at_ms: i64, now: DateTime<Utc>) -> String {
  let Some(then) = DateTime::<Utc>::from_timestamp_millis(watched_at_ms) else { return String::new() };
  let secs = (now - then).num_seconds().max(0);
  match secs {
    0..60 => "just now".to_string(),
    60..3_600 => format!("{}m ago", secs / 60),
    3_600..86_400 => format!("{}h ago", secs / 3_600),
    _ => format!("{}d ago", secs / 86_400),
  }
}

fn format_position(secs: f64) -> String {
  let total = secs.max(0.0) as u64;
  format!("{}:{:02}", total / 60, total % 60)
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  let [sidebar_area, detail_area] =
    Layout::horizontal([Constraint::Percentage(42), Constraint::Percentage(58)]).areas(main_area);

  render_header(frame, app, header_area);
  render_sidebar(frame, app, sidebar_area);
  render_now_playing(frame, app, detail_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(vec![
    Span::styled(" ▶ lectern ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(app.nav.position_label(), Style::default().fg(theme.muted)),
  ]);
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_sidebar(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let border_color = if app.focus == Focus::List { theme.accent } else { theme.border };
  let block = Block::bordered()
    .title(format!(" Topics [{}] ", app.disclosure.mode().label()))
    .title_style(Style::default().fg(border_color).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color));

  if app.filtered.is_empty() {
    let text = vec![
      Line::from(""),
      Line::from(Span::styled(format!("No videos found for \"{}\"", app.input.trim()), Style::default().fg(theme.muted))),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).block(block), area);
    return;
  }

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("› ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let current = app.nav.current().to_string();
  let progress = app.nav.progress();

  let items: Vec<ListItem> = app
    .rows()
    .into_iter()
    .map(|row| match row {
      Row::Group(key) => {
        let group = &app.filtered.groups[key];
        let stats = progress.group_progress(&group.items);
        let chevron = if app.disclosure.is_open(key) { "▾" } else { "▸" };
        let is_active = group.contains(&current);

        let mut meta = Vec::new();
        if stats.completed > 0 {
          meta.push(format!("{}/{} ✓ {}%", stats.completed, stats.total, stats.percentage));
        }
        if stats.in_progress() > 0 {
          meta.push(format!("{} in progress", stats.in_progress()));
        }
        let right = meta.join("  ");
        let title_max = inner_w.saturating_sub(right.chars().count() + 4);
        let title = truncate_str(&group.topic_name, title_max);
        let gap = inner_w.saturating_sub(title.chars().count() + 2 + right.chars().count());

        let title_style = if is_active { Style::default().fg(theme.accent) } else { Style::default().fg(theme.fg) };
        ListItem::new(Line::from(vec![
          Span::styled(format!("{} ", chevron), Style::default().fg(theme.muted)),
          Span::styled(title, title_style.add_modifier(Modifier::BOLD)),
          Span::raw(" ".repeat(gap)),
          Span::styled(right, Style::default().fg(theme.success)),
        ]))
      }
      Row::Item { index, id, .. } => {
        let is_active = id == current;
        let (badge, badge_color, meta) = if progress.is_completed(&id) {
          ("✓", theme.success, "Completed")
        } else if progress.is_watched(&id) {
          ("●", theme.status, "Watched")
        } else {
          ("○", theme.muted, "")
        };
        let marker = if is_active { "▶" } else { " " };
        let label = app.item_label(index, &id);
        let fg = if is_active { theme.accent } else { theme.fg };
        ListItem::new(Line::from(vec![
          Span::styled(format!("  {} ", marker), Style::default().fg(theme.accent)),
          Span::styled(format!("{} ", badge), Style::default().fg(badge_color)),
          Span::styled(label, Style::default().fg(fg)),
          Span::styled(format!("  {}", meta), Style::default().fg(theme.muted)),
        ]))
        .bg(theme.stripe_bg)
      }
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_symbol("› ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_now_playing(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let title = Line::from(vec![Span::styled(
    if app.viewer.current() == Some(app.nav.current()) { " Now Playing " } else { " Selected " },
    Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
  )]);
  let block = Block::bordered()
    .title(title)
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let selection = app.nav.selection();
  let id = selection.current_item_id.as_str();
  let progress = app.nav.progress();

  let mut lines = vec![Line::from("")];
  match app.catalog.group_of(id) {
    Some(key) => {
      let topic = &app.catalog.groups[key].topic_name;
      let part = app.nav.index().part_number(id).unwrap_or(1);
      lines.push(Line::from(Span::styled(
        truncate_str(topic, inner_w),
        Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
      )));
      lines.push(Line::from(Span::styled(format!("Part {}", part), Style::default().fg(theme.muted))));
    }
    None => {
      lines.push(Line::from(Span::styled("Not in catalog", Style::default().fg(theme.error))));
    }
  }
  lines.push(Line::from(""));

  let label = |name: &'static str, value: String| {
    Line::from(vec![
      Span::styled(format!("{:<10}", name), Style::default().fg(theme.muted)),
      Span::styled(value, Style::default().fg(theme.fg)),
    ])
  };

  let status = if progress.is_completed(id) {
    "Completed"
  } else if progress.is_watched(id) {
    "Watched"
  } else {
    "Not watched"
  };
  lines.push(label("Status", status.to_string()));
  if let Some(watched_at) = progress.record(id).and_then(|r| r.watched_at) {
    lines.push(label("Visited", ago(watched_at, Utc::now())));
  }
  if let Some(pos) = progress.last_position(id) {
    lines.push(label("Position", format_position(pos)));
  }
  lines.push(label("Autoplay", if selection.autoplay { "on" } else { "off" }.to_string()));
  if let Some(status) = app.viewer.last_status() {
    let pct = status.percent.map(|p| format!(" ({:.0}%)", p)).unwrap_or_default();
    let paused = if app.viewer.paused { " ⏸" } else { "" };
    lines.push(label("Player", format!("{}{}{}", format_position(status.position), pct, paused)));
  }
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    truncate_str(&embed_url(id, selection.autoplay), inner_w),
    Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
  )));

  frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(err) = app.nav.progress().pending_error() {
    (format!(" ⚠  Progress not saved: {}", err), Style::default().fg(theme.error))
  } else if app.viewer.is_playing() {
    (" ♪ Playing".to_string(), Style::default().fg(theme.status))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let border_color = if app.focus == Focus::Search { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Search topics and videos ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if inner_w == 0 {
    frame.render_widget(input_block, area);
    return;
  }

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if app.focus == Focus::Search {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = match app.focus {
    Focus::Search => vec![("Enter", "Browse"), ("Esc", "Clear"), ("^t", "Theme")],
    Focus::List => {
      let mut k = vec![
        ("j/k", "Prev/Next"),
        ("Tab", "Cursor"),
        ("Enter", "Open"),
        ("Space", "Fold"),
        ("/", "Search"),
        ("c", "Done"),
        ("m", "Mode"),
        ("o", "Browser"),
      ];
      if app.viewer.is_playing() {
        k.push(("^s", "Stop"));
      }
      k.push(("q", "Quit"));
      k
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw(" "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
