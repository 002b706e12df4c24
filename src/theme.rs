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
  pub key_fg: Color,
  pub key_bg: Color,
  /// Keyword occurrences inside comment text.
  pub mark_fg: Color,
  pub mark_bg: Color,
  /// Badge on AI-only matches.
  pub context: Color,
}

pub const THEMES: [Theme; 2] = [
  Theme {
    name: "Night",
    bg: Color::Rgb(24, 24, 32),
    fg: Color::Rgb(220, 220, 230),
    accent: Color::Rgb(255, 92, 92),
    muted: Color::Rgb(120, 120, 140),
    border: Color::Rgb(64, 64, 80),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(60, 40, 56),
    stripe_bg: Color::Rgb(30, 30, 40),
    status: Color::Rgb(130, 200, 255),
    error: Color::Rgb(255, 120, 100),
    key_fg: Color::Rgb(24, 24, 32),
    key_bg: Color::Rgb(160, 160, 180),
    mark_fg: Color::Rgb(24, 24, 32),
    mark_bg: Color::Rgb(250, 210, 90),
    context: Color::Rgb(180, 140, 255),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 248, 242),
    fg: Color::Rgb(40, 40, 48),
    accent: Color::Rgb(200, 40, 40),
    muted: Color::Rgb(130, 128, 120),
    border: Color::Rgb(200, 196, 186),
    highlight_fg: Color::Rgb(20, 20, 24),
    highlight_bg: Color::Rgb(236, 222, 210),
    stripe_bg: Color::Rgb(243, 240, 232),
    status: Color::Rgb(30, 110, 180),
    error: Color::Rgb(190, 50, 30),
    key_fg: Color::Rgb(250, 248, 242),
    key_bg: Color::Rgb(90, 88, 84),
    mark_fg: Color::Rgb(20, 20, 24),
    mark_bg: Color::Rgb(255, 224, 120),
    context: Color::Rgb(120, 70, 200),
  },
];

pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name == n)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn theme_names_are_unique() {
    let mut names: Vec<&str> = THEMES.iter().map(|t| t.name).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), THEMES.len());
  }

  #[test]
  fn unknown_theme_falls_back_to_first() {
    assert_eq!(theme_index(Some("Paper")), 1);
    assert_eq!(theme_index(Some("Neon")), 0);
    assert_eq!(theme_index(None), 0);
  }
}
