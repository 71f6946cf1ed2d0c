use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub success: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 2] = [
  Theme {
    name: "Dark",
    bg: Color::Rgb(22, 22, 26),
    fg: Color::Rgb(222, 222, 228),
    accent: Color::Rgb(124, 156, 255),
    muted: Color::Rgb(120, 120, 134),
    border: Color::Rgb(58, 58, 68),
    highlight_fg: Color::Rgb(240, 240, 246),
    highlight_bg: Color::Rgb(44, 52, 84),
    stripe_bg: Color::Rgb(27, 27, 32),
    status: Color::Rgb(240, 196, 96),
    error: Color::Rgb(240, 104, 104),
    success: Color::Rgb(96, 204, 140),
    key_fg: Color::Rgb(22, 22, 26),
    key_bg: Color::Rgb(124, 156, 255),
  },
  Theme {
    name: "Light",
    bg: Color::Rgb(250, 250, 252),
    fg: Color::Rgb(34, 34, 40),
    accent: Color::Rgb(48, 88, 214),
    muted: Color::Rgb(128, 128, 140),
    border: Color::Rgb(208, 208, 216),
    highlight_fg: Color::Rgb(20, 20, 24),
    highlight_bg: Color::Rgb(220, 228, 252),
    stripe_bg: Color::Rgb(243, 243, 247),
    status: Color::Rgb(176, 120, 0),
    error: Color::Rgb(200, 40, 40),
    success: Color::Rgb(24, 140, 72),
    key_fg: Color::Rgb(250, 250, 252),
    key_bg: Color::Rgb(48, 88, 214),
  },
];

/// Index of the theme called `name`, falling back to the first.
pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(n))).unwrap_or(0)
}
