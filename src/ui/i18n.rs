// src/ui/i18n.rs - UI strings, English and transliterated Ukrainian
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Ua,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Ua];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ua => "ua",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ua => "Ukrainska",
        }
    }

    pub fn text(self, key: Text) -> &'static str {
        match self {
            Language::En => english(key),
            Language::Ua => ukrainian(key),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ua" | "uk" => Ok(Language::Ua),
            other => Err(format!("unsupported language '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    MainMenu,
    PollingMode,
    Statistics,
    ChangeLanguage,
    PressBack,
    StatusIdle,
    StatusPrinting,
    StatusError,
    Printing,
    Layer,
    TimeLeft,
    Material,
    Job,
    TotalJobs,
    Successful,
    Failed,
    PrintTime,
    Uptime,
    Minutes,
    Hours,
    Grams,
    Initializing,
    SystemReady,
    SystemStopped,
    Error,
}

fn english(key: Text) -> &'static str {
    match key {
        Text::MainMenu => "Main Menu",
        Text::PollingMode => "Polling Mode",
        Text::Statistics => "Statistics",
        Text::ChangeLanguage => "Change Language",
        Text::PressBack => "Press Back to exit",
        Text::StatusIdle => "Idle",
        Text::StatusPrinting => "Printing",
        Text::StatusError => "Error",
        Text::Printing => "Printing",
        Text::Layer => "Layer",
        Text::TimeLeft => "Time left",
        Text::Material => "Material",
        Text::Job => "Job",
        Text::TotalJobs => "Total jobs",
        Text::Successful => "Successful",
        Text::Failed => "Failed",
        Text::PrintTime => "Time",
        Text::Uptime => "Uptime",
        Text::Minutes => "min",
        Text::Hours => "h",
        Text::Grams => "g",
        Text::Initializing => "Initializing",
        Text::SystemReady => "System Ready",
        Text::SystemStopped => "System Stopped",
        Text::Error => "Error",
    }
}

fn ukrainian(key: Text) -> &'static str {
    match key {
        Text::MainMenu => "Holovne Menyu",
        Text::PollingMode => "Rezhym Polinhu",
        Text::Statistics => "Statystyka",
        Text::ChangeLanguage => "Zmina Movy",
        Text::PressBack => "Natysnit Nazad",
        Text::StatusIdle => "Ochikuye",
        Text::StatusPrinting => "Drukuye",
        Text::StatusError => "Pomylka",
        Text::Printing => "Druk",
        Text::Layer => "Shar",
        Text::TimeLeft => "Zalyshylos",
        Text::Material => "Material",
        Text::Job => "Zavdannya",
        Text::TotalJobs => "Vsoho zavdan",
        Text::Successful => "Uspishno",
        Text::Failed => "Pomylok",
        Text::PrintTime => "Chas",
        Text::Uptime => "Chas roboty",
        Text::Minutes => "khv",
        Text::Hours => "hod",
        Text::Grams => "h",
        Text::Initializing => "Initsializatsiya",
        Text::SystemReady => "Systema hotova",
        Text::SystemStopped => "Systema zupynena",
        Text::Error => "Pomylka",
    }
}
