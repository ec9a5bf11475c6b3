pub mod formatting;
pub mod theme;
pub mod tray;

use crate::refresh::{self, StatsRefresher};
use crate::state::{AppEvent, AppState};
use eframe::egui;
use egui::{vec2, RichText};
use formatting::{fmt_grouped, fmt_relative_time};
use std::sync::atomic::Ordering;
use std::sync::mpsc::{Receiver as EventReceiver, Sender as EventSender};
use std::sync::Arc;
use std::time::Duration;

pub const WIDGET_WINDOW_SIZE: (f32, f32) = (200.0, 180.0);
pub const SETTINGS_WINDOW_SIZE: (f32, f32) = (300.0, 260.0);

/// Which of the two views the shell is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Widget,
    Settings,
}

pub struct UserPulseApp {
    state: Arc<AppState>,
    refresher: Arc<StatsRefresher>,
    event_rx: EventReceiver<AppEvent>,
    view: View,
    url_input: String,
    key_input: String,
    settings_error: Option<String>,
    connecting: bool,
    prev_focused: bool,

    // Tray icon (must stay alive or the icon disappears)
    _tray_icon: Option<tray_icon::TrayIcon>,
}

impl UserPulseApp {
    pub fn new(
        state: Arc<AppState>,
        refresher: Arc<StatsRefresher>,
        event_tx: EventSender<AppEvent>,
        event_rx: EventReceiver<AppEvent>,
        egui_ctx: egui::Context,
        start_in_settings: bool,
    ) -> Self {
        // Create tray icon here (inside the event loop) so it stays alive
        let tray_icon = tray::setup_tray();
        println!("[tray] icon created: {}", tray_icon.is_some());

        // Reflect any hydrated snapshot into the tray before the first fetch
        if let Some(tray) = &tray_icon {
            let stats = state.last_stats.lock().ok().and_then(|g| g.clone());
            tray::apply_title(tray, &refresh::tray_title(stats.as_ref()));
        }

        // Background thread for tray menu events so quit is handled even
        // if the UI thread stalls.
        {
            let menu_tx = event_tx.clone();
            let ctx = egui_ctx.clone();
            std::thread::spawn(move || {
                while let Ok(event) = tray_icon::menu::MenuEvent::receiver().recv() {
                    let id = event.id.0.as_str();
                    println!("[tray-thread] menu event: {}", id);
                    match id {
                        tray::MENU_ID_QUIT => {
                            std::process::exit(0);
                        }
                        tray::MENU_ID_REFRESH => {
                            let _ = menu_tx.send(AppEvent::TrayRefresh);
                            ctx.request_repaint();
                        }
                        tray::MENU_ID_SETTINGS => {
                            let _ = menu_tx.send(AppEvent::TraySettings);
                            ctx.request_repaint();
                        }
                        _ => {}
                    }
                }
            });
        }

        Self {
            state,
            refresher,
            event_rx,
            view: if start_in_settings {
                View::Settings
            } else {
                View::Widget
            },
            url_input: String::new(),
            key_input: String::new(),
            settings_error: None,
            connecting: false,
            prev_focused: true,
            _tray_icon: tray_icon,
        }
    }

    fn show_window(&self, ctx: &egui::Context) {
        ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
        ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
    }

    fn open_widget(&mut self, ctx: &egui::Context) {
        self.view = View::Widget;
        let (w, h) = WIDGET_WINDOW_SIZE;
        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(vec2(w, h)));
    }

    fn open_settings(&mut self, ctx: &egui::Context) {
        self.view = View::Settings;
        let (w, h) = SETTINGS_WINDOW_SIZE;
        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(vec2(w, h)));
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                AppEvent::StatsUpdated(stats) => {
                    if let Some(tray) = &self._tray_icon {
                        tray::apply_title(tray, &refresh::tray_title(Some(&stats)));
                    }
                }
                AppEvent::CredentialsAccepted => {
                    self.connecting = false;
                    self.settings_error = None;
                    self.key_input.clear();
                    self.open_widget(ctx);
                }
                AppEvent::CredentialsRejected(message) => {
                    self.connecting = false;
                    self.settings_error = Some(message);
                }
                AppEvent::RefreshFinished => {}
                AppEvent::TrayRefresh => self.refresher.spawn_refresh(),
                AppEvent::TraySettings => {
                    self.open_settings(ctx);
                    self.show_window(ctx);
                }
            }
        }
    }

    fn drain_tray_clicks(&mut self, ctx: &egui::Context) {
        use tray_icon::{MouseButton, MouseButtonState, TrayIconEvent};
        while let Ok(event) = TrayIconEvent::receiver().try_recv() {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                self.show_window(ctx);
            }
        }
    }

    fn widget_view(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let refreshing = self.state.refreshing.load(Ordering::SeqCst);
                if ui
                    .add_enabled(!refreshing, egui::Button::new("\u{21BB}").frame(false))
                    .on_hover_text("Refresh Data")
                    .clicked()
                {
                    self.refresher.spawn_refresh();
                }
                if ui
                    .add(egui::Button::new("\u{2699}").frame(false))
                    .on_hover_text("Settings")
                    .clicked()
                {
                    self.open_settings(ctx);
                }
            });
        });

        let stats = self.state.last_stats.lock().ok().and_then(|g| g.clone());
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("Total Users").color(theme::TEXT_MUTED).size(12.0));
            let total = stats
                .as_ref()
                .map(|s| fmt_grouped(s.total_users))
                .unwrap_or_else(|| "--".into());
            ui.label(
                RichText::new(total)
                    .color(theme::TEXT_COLOR)
                    .size(30.0)
                    .strong(),
            );
            ui.add_space(6.0);
            ui.label(RichText::new("Today").color(theme::TEXT_MUTED).size(12.0));
            match stats.as_ref() {
                Some(s) if s.daily_signups > 0 => {
                    ui.label(
                        RichText::new(format!("\u{2B06} +{}", fmt_grouped(s.daily_signups)))
                            .color(theme::SIGNUP_GREEN)
                            .size(16.0),
                    );
                }
                _ => {
                    ui.label(RichText::new("--").color(theme::TEXT_MUTED).size(16.0));
                }
            }
            if let Some(s) = stats.as_ref() {
                ui.add_space(4.0);
                ui.label(
                    RichText::new(format!("Updated {}", fmt_relative_time(&s.last_updated)))
                        .color(theme::TEXT_MUTED)
                        .size(10.0),
                );
            }
        });
    }

    fn settings_view(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.label(
            RichText::new("Supabase Configuration")
                .color(theme::TEXT_COLOR)
                .size(16.0)
                .strong(),
        );
        ui.add_space(8.0);

        if let Some(err) = self.settings_error.clone() {
            egui::Frame::none()
                .fill(theme::ERROR_BG)
                .stroke(egui::Stroke::new(1.0, theme::ERROR_BORDER))
                .rounding(egui::Rounding::same(4.0))
                .inner_margin(egui::Margin::symmetric(8.0, 6.0))
                .show(ui, |ui| {
                    ui.label(RichText::new(err).color(theme::TEXT_COLOR).size(12.0));
                });
            ui.add_space(8.0);
        }

        ui.label(RichText::new("Supabase Project URL").color(theme::TEXT_MUTED).size(12.0));
        ui.add(
            egui::TextEdit::singleline(&mut self.url_input)
                .hint_text("https://your-project.supabase.co")
                .desired_width(f32::INFINITY),
        );
        ui.add_space(6.0);
        ui.label(RichText::new("Supabase API Key").color(theme::TEXT_MUTED).size(12.0));
        ui.add(
            egui::TextEdit::singleline(&mut self.key_input)
                .password(true)
                .hint_text("Service role key (not anon key)")
                .desired_width(f32::INFINITY),
        );
        ui.label(
            RichText::new("Use the Service Role key for proper database access.")
                .color(theme::TEXT_MUTED)
                .size(10.0),
        );
        ui.add_space(10.0);

        let has_snapshot = self
            .state
            .last_stats
            .lock()
            .map(|g| g.is_some())
            .unwrap_or(false);
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let can_submit = !self.connecting
                && !self.url_input.trim().is_empty()
                && !self.key_input.trim().is_empty();
            let label = if self.connecting {
                "Connecting..."
            } else {
                "Connect"
            };
            if ui
                .add_enabled(can_submit, egui::Button::new(label).fill(theme::BTN_BG))
                .clicked()
            {
                self.connecting = true;
                self.settings_error = None;
                self.refresher.spawn_submit_credentials(
                    self.url_input.trim().to_string(),
                    self.key_input.trim().to_string(),
                );
            }
            if has_snapshot && !self.connecting && ui.button("Back").clicked() {
                self.settings_error = None;
                self.open_widget(ctx);
            }
        });
    }
}

impl eframe::App for UserPulseApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        // Transparent window; the panel frame paints the rounded card.
        [0.0, 0.0, 0.0, 0.0]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_tray_clicks(ctx);
        self.drain_events(ctx);

        // Hide when the widget loses focus, tray click brings it back.
        // The settings view stays up so a half-filled form is not lost.
        let focused = ctx.input(|i| i.viewport().focused.unwrap_or(true));
        if self.prev_focused && !focused && self.view == View::Widget {
            ctx.send_viewport_cmd(egui::ViewportCommand::Visible(false));
        }
        self.prev_focused = focused;

        let fill = match self.view {
            View::Widget => theme::WIDGET_BG,
            View::Settings => theme::SETTINGS_BG,
        };
        egui::CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(fill)
                    .rounding(egui::Rounding::same(12.0))
                    .inner_margin(egui::Margin::same(12.0)),
            )
            .show(ctx, |ui| {
                let response =
                    ui.interact(ui.max_rect(), egui::Id::new("drag-region"), egui::Sense::drag());
                if response.drag_started() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
                }
                match self.view {
                    View::Widget => self.widget_view(ctx, ui),
                    View::Settings => self.settings_view(ctx, ui),
                }
            });

        // Keep polling tray and worker events while idle or hidden
        ctx.request_repaint_after(Duration::from_millis(200));
    }
}
