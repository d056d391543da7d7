// src/ui/mod.rs - Local display abstraction
pub mod i18n;
pub mod lcd;

pub use i18n::{Language, Text};
pub use lcd::{CharacterLcd, ConsoleDriver, DisplayDriver};

/// What the menu and orchestrator draw on. Implementations clip to their
/// own geometry; callers never need to know the screen size.
pub trait Display: Send {
    fn clear(&mut self);

    /// Title on the first row, then a scrolling window of items with the
    /// selected one marked.
    fn render_menu(&mut self, title: &str, items: &[String], selected: usize);

    /// Up to four lines. The first is centered as a heading.
    fn render_status(&mut self, lines: &[String]);

    /// Title, a bar for `percent` (0..=100) and up to two `label: value` rows.
    fn render_progress(&mut self, title: &str, percent: f64, details: &[(String, String)]);
}
