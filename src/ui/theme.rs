use ratatui::style::Color;

// Near-black surfaces with a red accent. Code blocks get their own green so they read as
// separate from prose at a glance.
//
// Add roles here instead of sprinkling literal colors through the UI.
pub const BAR_BG: Color = Color::Rgb(24, 10, 12);

pub const FG: Color = Color::Rgb(229, 231, 235);
pub const MUTED: Color = Color::Rgb(156, 163, 175);
pub const DIM: Color = Color::Rgb(107, 114, 128);
pub const BORDER: Color = Color::Rgb(75, 85, 99);

pub const ACCENT: Color = Color::Rgb(239, 68, 68);
pub const ACCENT_BG: Color = Color::Rgb(60, 16, 18);

pub const CODE_FG: Color = Color::Rgb(74, 222, 128);
pub const CODE_FRAME: Color = Color::Rgb(100, 116, 139);

pub const ERROR: Color = Color::Rgb(248, 113, 113);
