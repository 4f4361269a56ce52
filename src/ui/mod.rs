mod display;
mod spinner;
mod theme;

pub use display::TerminalDisplay;
pub use spinner::Spinner;
pub use theme::Style;
