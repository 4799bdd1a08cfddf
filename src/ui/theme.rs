//! Colors for CLI output. Stdout and stderr decide separately, so
//! `codeschool lms load 2>load.log` keeps the log file free of escapes
//! while the terminal still gets color. Both honor `CLICOLOR`.

use owo_colors::Style;
use std::sync::OnceLock;

static STDOUT: OnceLock<Palette> = OnceLock::new();
static STDERR: OnceLock<Palette> = OnceLock::new();

/// One style per kind of line the CLI prints.
#[derive(Debug, Clone, Copy, Default)]
pub struct Palette {
    /// Command banners and section titles
    pub banner: Style,
    /// Labels in `label: value` status lines and timings
    pub label: Style,
    pub ok: Style,
    pub failure: Style,
    pub caution: Style,
    /// The chat bot's answer
    pub reply: Style,
}

impl Palette {
    pub fn new(colored: bool) -> Self {
        if !colored {
            return Self::default();
        }
        Self {
            banner: Style::new().bright_blue().bold(),
            label: Style::new().bright_black(),
            ok: Style::new().green(),
            failure: Style::new().bright_red().bold(),
            caution: Style::new().yellow(),
            reply: Style::new().cyan().italic(),
        }
    }
}

pub fn stdout_palette() -> &'static Palette {
    STDOUT.get_or_init(|| Palette::new(console::colors_enabled()))
}

pub fn stderr_palette() -> &'static Palette {
    STDERR.get_or_init(|| Palette::new(console::colors_enabled_stderr()))
}
