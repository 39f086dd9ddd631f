use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Sepia,
    Midnight,
}

/// Colors a theme resolves to when rendering.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub panel: Color,
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub folder: Color,
    pub tag: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Dark, Theme::Light, Theme::Sepia, Theme::Midnight];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Sepia => "sepia",
            Theme::Midnight => "midnight",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                bg: Color::Rgb(18, 18, 28),
                panel: Color::Rgb(12, 12, 18),
                fg: Color::Gray,
                muted: Color::DarkGray,
                accent: Color::Magenta,
                folder: Color::Cyan,
                tag: Color::Rgb(0, 255, 136),
                selected_fg: Color::Black,
                selected_bg: Color::Cyan,
            },
            Theme::Light => Palette {
                bg: Color::Rgb(250, 250, 247),
                panel: Color::Rgb(236, 236, 232),
                fg: Color::Rgb(40, 40, 40),
                muted: Color::Rgb(130, 130, 130),
                accent: Color::Rgb(37, 99, 235),
                folder: Color::Rgb(2, 132, 199),
                tag: Color::Rgb(22, 163, 74),
                selected_fg: Color::White,
                selected_bg: Color::Rgb(37, 99, 235),
            },
            Theme::Sepia => Palette {
                bg: Color::Rgb(244, 236, 216),
                panel: Color::Rgb(232, 220, 192),
                fg: Color::Rgb(91, 70, 54),
                muted: Color::Rgb(150, 125, 100),
                accent: Color::Rgb(176, 96, 48),
                folder: Color::Rgb(140, 90, 40),
                tag: Color::Rgb(110, 120, 50),
                selected_fg: Color::Rgb(244, 236, 216),
                selected_bg: Color::Rgb(176, 96, 48),
            },
            Theme::Midnight => Palette {
                bg: Color::Rgb(8, 10, 24),
                panel: Color::Rgb(4, 5, 14),
                fg: Color::Rgb(190, 200, 230),
                muted: Color::Rgb(90, 100, 140),
                accent: Color::Rgb(129, 140, 248),
                folder: Color::Rgb(96, 165, 250),
                tag: Color::Rgb(244, 114, 182),
                selected_fg: Color::Rgb(8, 10, 24),
                selected_bg: Color::Rgb(129, 140, 248),
            },
        }
    }
}
