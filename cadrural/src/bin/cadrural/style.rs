use clap::builder::{
    Styles,
    styling::{AnsiColor, Style},
};
use colored::{Color, ColoredString, Colorize, control::ShouldColorize};
use once_cell::sync::Lazy;

/// A colour as both `colored` and clap's help renderer understand it.
#[derive(Clone, Copy)]
pub struct Tone {
    pub term: Color,
    pub ansi: AnsiColor,
}

impl Tone {
    const fn new(term: Color, ansi: AnsiColor) -> Self {
        Self { term, ansi }
    }

    fn style(self) -> Style {
        Style::new().fg_color(Some(self.ansi.into()))
    }
}

/// Colours by role.
pub struct Palette {
    pub ok: Tone,
    pub fail: Tone,
    pub caution: Tone,
    pub note: Tone,
    pub heading: Tone,
    pub title: Tone,
    pub command: Tone,
    pub placeholder: Tone,
    pub env_key: Tone,
    pub env_text: Tone,
}

pub static PALETTE: Lazy<Palette> = Lazy::new(|| Palette {
    ok: Tone::new(Color::Green, AnsiColor::Green),
    fail: Tone::new(Color::Red, AnsiColor::Red),
    caution: Tone::new(Color::Yellow, AnsiColor::Yellow),
    note: Tone::new(Color::Blue, AnsiColor::Blue),
    heading: Tone::new(Color::Cyan, AnsiColor::Cyan),
    title: Tone::new(Color::BrightGreen, AnsiColor::BrightGreen),
    command: Tone::new(Color::Yellow, AnsiColor::Yellow),
    placeholder: Tone::new(Color::BrightBlack, AnsiColor::BrightBlack),
    env_key: Tone::new(Color::BrightCyan, AnsiColor::BrightCyan),
    env_text: Tone::new(Color::White, AnsiColor::White),
});

pub const ARROW: &str = "→";

/// Kinds of one-line status messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    Success,
    Error,
    Warning,
    Info,
}

impl Notice {
    pub fn icon(self) -> &'static str {
        match self {
            Notice::Success => "✓",
            Notice::Error => "✗",
            Notice::Warning => "⚠",
            Notice::Info => "ℹ",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            Notice::Success => PALETTE.ok,
            Notice::Error => PALETTE.fail,
            Notice::Warning => PALETTE.caution,
            Notice::Info => PALETTE.note,
        }
    }

    /// Errors and warnings go to stderr.
    pub fn to_stderr(self) -> bool {
        matches!(self, Notice::Error | Notice::Warning)
    }
}

pub fn colors_enabled() -> bool {
    ShouldColorize::from_env().should_colorize()
}

/// Colours `text` when `enabled`, leaving it untouched otherwise.
pub fn paint(text: &str, tone: Tone, bold: bool, enabled: bool) -> String {
    if !enabled {
        return text.to_string();
    }
    let colored: ColoredString = text.color(tone.term);
    if bold { colored.bold().to_string() } else { colored.to_string() }
}

pub fn help_styles() -> Styles {
    let palette = &*PALETTE;
    Styles::styled()
        .usage(palette.title.style().bold())
        .header(palette.heading.style().bold())
        .literal(palette.command.style())
        .placeholder(palette.placeholder.style())
        .valid(palette.ok.style())
        .invalid(palette.caution.style())
        .error(palette.fail.style().bold())
}
