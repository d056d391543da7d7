// src/control/menu.rs - Menu navigation state machine
use std::time::Duration;

use super::buttons::Button;
use crate::service::DeviceStatus;
use crate::statistics::Statistics;
use crate::ui::{Display, Language, Text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    MainMenu,
    Polling,
    Statistics,
    LanguageSelect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub screen: Screen,
    pub selected: usize,
    pub history: Vec<Screen>,
}

impl Default for MenuState {
    fn default() -> Self {
        Self { screen: Screen::MainMenu, selected: 0, history: Vec::new() }
    }
}

/// What the control loop should do after a button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    None,
    Redraw,
    StartPolling,
    StopPolling,
    LanguageChanged(Language),
}

const MAIN_POLLING: usize = 0;
const MAIN_STATISTICS: usize = 1;
const MAIN_LANGUAGE: usize = 2;
const MAIN_ITEMS: [Text; 3] = [Text::PollingMode, Text::Statistics, Text::ChangeLanguage];

#[derive(Debug, Clone, Default)]
pub struct Menu {
    state: MenuState,
    language: Language,
}

impl Menu {
    pub fn new(language: Language) -> Self {
        Self { state: MenuState::default(), language }
    }

    pub fn state(&self) -> &MenuState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        self.state.screen
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn main_items(&self) -> Vec<String> {
        MAIN_ITEMS.iter().map(|key| self.language.text(*key).to_string()).collect()
    }

    /// Language names, the active one prefixed with `> `.
    pub fn language_items(&self) -> Vec<String> {
        Language::ALL
            .iter()
            .map(|lang| {
                if *lang == self.language {
                    format!("> {}", lang.name())
                } else {
                    lang.name().to_string()
                }
            })
            .collect()
    }

    pub fn handle(&mut self, button: Button) -> MenuAction {
        match button {
            Button::Up => self.step(-1),
            Button::Down => self.step(1),
            Button::Select => self.select(),
            Button::Back => self.back(),
        }
    }

    /// Jump straight into polling, as if it had been picked from the main menu.
    pub fn enter_polling(&mut self) {
        if self.state.screen != Screen::Polling {
            self.state.history.push(self.state.screen);
            self.state.screen = Screen::Polling;
        }
    }

    fn item_count(&self) -> usize {
        match self.state.screen {
            Screen::MainMenu => MAIN_ITEMS.len(),
            Screen::LanguageSelect => Language::ALL.len(),
            Screen::Polling | Screen::Statistics => 0,
        }
    }

    fn step(&mut self, delta: isize) -> MenuAction {
        let len = self.item_count();
        if len == 0 {
            return MenuAction::None;
        }
        self.state.selected = (self.state.selected as isize + delta).rem_euclid(len as isize) as usize;
        MenuAction::Redraw
    }

    fn push(&mut self, screen: Screen) {
        self.state.history.push(self.state.screen);
        self.state.screen = screen;
    }

    fn select(&mut self) -> MenuAction {
        match self.state.screen {
            Screen::MainMenu => match self.state.selected {
                MAIN_POLLING => {
                    self.push(Screen::Polling);
                    MenuAction::StartPolling
                }
                MAIN_STATISTICS => {
                    self.push(Screen::Statistics);
                    MenuAction::Redraw
                }
                MAIN_LANGUAGE => {
                    self.push(Screen::LanguageSelect);
                    self.state.selected = 0;
                    MenuAction::Redraw
                }
                _ => MenuAction::None,
            },
            Screen::LanguageSelect => match Language::ALL.get(self.state.selected) {
                Some(lang) => {
                    self.language = *lang;
                    tracing::info!("Language set to {}", lang);
                    self.back();
                    MenuAction::LanguageChanged(*lang)
                }
                None => MenuAction::None,
            },
            Screen::Polling | Screen::Statistics => MenuAction::None,
        }
    }

    fn back(&mut self) -> MenuAction {
        let leaving_polling = self.state.screen == Screen::Polling;
        match self.state.history.pop() {
            Some(previous) => {
                self.state.screen = previous;
                self.state.selected = 0;
            }
            None if leaving_polling => {
                self.state.screen = Screen::MainMenu;
                self.state.selected = 0;
            }
            None => return MenuAction::None,
        }
        if leaving_polling { MenuAction::StopPolling } else { MenuAction::Redraw }
    }

    /// Draw the current menu screen. The polling screen is drawn by
    /// [`Menu::render_polling`] since it needs live status.
    pub fn render(&self, display: &mut dyn Display, stats: &Statistics) {
        let lang = self.language;
        match self.state.screen {
            Screen::MainMenu => display.render_menu(lang.text(Text::MainMenu), &self.main_items(), self.state.selected),
            Screen::LanguageSelect => {
                display.render_menu(lang.text(Text::ChangeLanguage), &self.language_items(), self.state.selected)
            }
            Screen::Statistics => self.render_statistics(display, stats),
            Screen::Polling => self.render_polling(display, DeviceStatus::Idle, None),
        }
    }

    fn render_statistics(&self, display: &mut dyn Display, stats: &Statistics) {
        let lang = self.language;
        let s = stats.summary();
        display.render_status(&[
            lang.text(Text::Statistics).to_string(),
            format!("{}: {}", lang.text(Text::TotalJobs), s.total_jobs),
            format!("OK:{} Err:{} {:.0}%", s.successful_jobs, s.failed_jobs, s.success_rate),
            format!(
                "{:.1}{} {}{}{}m",
                s.total_material_grams,
                lang.text(Text::Grams),
                s.print_time_hours,
                lang.text(Text::Hours),
                s.print_time_minutes
            ),
        ]);
    }

    pub fn render_polling(&self, display: &mut dyn Display, status: DeviceStatus, since_last_check: Option<Duration>) {
        let lang = self.language;
        let status_text = match status {
            DeviceStatus::Idle => Text::StatusIdle,
            DeviceStatus::Printing => Text::StatusPrinting,
            DeviceStatus::Error => Text::StatusError,
        };
        let last = since_last_check
            .map(|d| format!("Last: {}s ago", d.as_secs()))
            .unwrap_or_default();
        display.render_status(&[
            lang.text(Text::PollingMode).to_string(),
            lang.text(status_text).to_string(),
            last,
            lang.text(Text::PressBack).to_string(),
        ]);
    }
}
