use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    /// Synergy above zero, winning matchups
    pub positive: Style,
    /// Anti-synergy, losing matchups
    pub negative: Style,
}

impl Theme {
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            positive: Style::new().green(),
            negative: Style::new().red(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            positive: Style::new(),
            negative: Style::new(),
        }
    }

    /// Style for a signed score; zero stays unstyled
    pub fn signed(&self, value: f64) -> Style {
        if value > 0.0 {
            self.positive.clone()
        } else if value < 0.0 {
            self.negative.clone()
        } else {
            Style::new()
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_theme_leaves_text_alone() {
        let plain = Theme::plain();
        assert_eq!("0.163".style(plain.signed(0.163)).to_string(), "0.163");
        assert_eq!("x".style(plain.header.clone()).to_string(), "x");
    }
}
