// src/control/mod.rs - Cooperative device loop: menu mode and polling mode
pub mod buttons;
pub mod menu;
pub mod rate_limiter;

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::Config;
use crate::print_job::{JobOutcome, Orchestrator};
use crate::service::{DeviceStatus, Job};
use crate::ui::{Display, Language, Text};
use buttons::{Button, ButtonInput};
use menu::{Menu, MenuAction, Screen};
use rate_limiter::RateLimiter;

/// Owns every piece of device state. One instance per process, driven from
/// a single task.
pub struct ControlLoop {
    orchestrator: Orchestrator,
    menu: Menu,
    display: Box<dyn Display>,
    buttons: Box<dyn ButtonInput>,
    queue_gate: RateLimiter,
    last_queue_check: Option<Instant>,
    polling: bool,
    printer_id: u64,
    menu_tick: Duration,
    polling_tick: Duration,
    splash_hold: Duration,
}

impl ControlLoop {
    pub fn new(
        orchestrator: Orchestrator,
        display: Box<dyn Display>,
        buttons: Box<dyn ButtonInput>,
        config: &Config,
    ) -> Self {
        let language = config.ui.language.parse::<Language>().unwrap_or_else(|e| {
            tracing::warn!("{}, falling back to English", e);
            Language::En
        });
        Self {
            orchestrator,
            menu: Menu::new(language),
            display,
            buttons,
            queue_gate: RateLimiter::new(config.timing.queue_poll_interval()),
            last_queue_check: None,
            polling: false,
            printer_id: config.server.printer_id,
            menu_tick: config.timing.menu_tick(),
            polling_tick: config.timing.polling_tick(),
            splash_hold: Duration::from_millis(config.ui.message_hold_ms),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn enter_polling(&mut self) {
        self.menu.enter_polling();
        self.polling = true;
        tracing::info!("Polling mode started");
    }

    /// Initial idle heartbeat, splash screen, then the current menu screen.
    pub async fn startup(&mut self) {
        self.orchestrator.send_heartbeat_now().await;

        let lang = self.menu.language();
        self.display.render_status(&[
            "Krusty Node".to_string(),
            lang.text(Text::SystemReady).to_string(),
            format!("ID: {}", self.printer_id),
        ]);
        tracing::info!("System ready, printer {}", self.printer_id);
        tokio::time::sleep(self.splash_hold).await;
        self.render();
    }

    /// Final idle heartbeat and the stop screen.
    pub async fn shutdown(&mut self) {
        self.orchestrator.abort_current();
        self.orchestrator.send_heartbeat_now().await;
        self.display.render_status(&[self.menu.language().text(Text::SystemStopped).to_string()]);
        self.orchestrator.statistics().log_summary();
        tracing::info!("Control loop stopped");
    }

    /// Run until `shutdown` resolves.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.startup().await;
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                _ = self.tick() => {}
            }
        }
        self.shutdown().await;
    }

    /// One pass of whichever mode is active. Returns the outcome when a job
    /// was processed.
    pub async fn tick(&mut self) -> Option<JobOutcome> {
        if self.polling {
            self.polling_tick().await
        } else {
            self.poll_buttons();
            tokio::time::sleep(self.menu_tick).await;
            None
        }
    }

    async fn polling_tick(&mut self) -> Option<JobOutcome> {
        let since = self.last_queue_check.map(|t| t.elapsed());
        self.menu.render_polling(self.display.as_mut(), self.orchestrator.status(), since);

        self.orchestrator.send_heartbeat().await;

        if let Some(job) = self.check_queue().await {
            let outcome = self.orchestrator.process_job(&job, self.display.as_mut(), self.menu.language()).await;
            tracing::info!("Job {} outcome: {:?}", job.id, outcome);
            return Some(outcome);
        }

        tokio::time::sleep(self.polling_tick).await;
        self.poll_buttons();
        None
    }

    /// First queued job, if the queue interval has elapsed and nothing is running.
    async fn check_queue(&mut self) -> Option<Job> {
        if self.orchestrator.status() != DeviceStatus::Idle || self.orchestrator.is_busy() {
            return None;
        }
        if !self.queue_gate.check_and_mark() {
            return None;
        }
        self.last_queue_check = Some(Instant::now());
        match self.orchestrator.service().fetch_queue().await {
            Ok(jobs) => jobs.into_iter().next(),
            Err(e) => {
                tracing::debug!("Queue check failed: {}", e);
                None
            }
        }
    }

    fn poll_buttons(&mut self) {
        if let Some(button) = self.buttons.read_pressed_button() {
            self.handle_button(button);
        }
    }

    pub fn handle_button(&mut self, button: Button) {
        tracing::debug!("Button {:?} on {:?}", button, self.menu.screen());
        match self.menu.handle(button) {
            MenuAction::StartPolling => {
                self.polling = true;
                tracing::info!("Polling mode started");
            }
            MenuAction::StopPolling => {
                self.polling = false;
                tracing::info!("Polling mode stopped");
                self.render();
            }
            MenuAction::Redraw | MenuAction::LanguageChanged(_) => self.render(),
            MenuAction::None => {}
        }
    }

    fn render(&mut self) {
        if self.menu.screen() == Screen::Polling {
            let since = self.last_queue_check.map(|t| t.elapsed());
            self.menu.render_polling(self.display.as_mut(), self.orchestrator.status(), since);
        } else {
            self.menu.render(self.display.as_mut(), self.orchestrator.statistics());
        }
    }
}
