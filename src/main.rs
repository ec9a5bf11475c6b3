#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod credentials;
mod refresh;
mod single_instance;
mod state;
mod stats_store;
mod supabase;
mod ui;

use eframe::egui;
use egui::{vec2, ViewportBuilder};
use state::{AppEvent, AppState};
use std::sync::{Arc, Mutex};
use supabase::StatsBackend;

fn main() {
    env_logger::init();

    let _single_instance_guard = match single_instance::acquire("UserPulse.App.Singleton") {
        Some(g) => g,
        None => {
            eprintln!("[userpulse] another instance is already running; exiting");
            return;
        }
    };

    let credentials_path = match credentials::credentials_path() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("[userpulse] {}", e);
            return;
        }
    };
    let stats_path = match stats_store::stats_path() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("[userpulse] {}", e);
            return;
        }
    };

    let app_state = Arc::new(AppState::new());
    let (event_tx, event_rx) = std::sync::mpsc::channel::<AppEvent>();

    // Hydrate the widget from the last persisted snapshot before any fetch
    if let Some(stats) = stats_store::load(&stats_path) {
        if let Ok(mut guard) = app_state.last_stats.lock() {
            *guard = Some(stats);
        }
    }

    // The session rehydrates itself from stored credentials, silently
    // staying unauthenticated if there are none or they are unusable.
    let session = supabase::SupabaseSession::new(credentials_path);
    let authenticated = session.is_authenticated();
    println!("[userpulse] session authenticated: {}", authenticated);

    let refresher = Arc::new(refresh::StatsRefresher::new(
        Arc::new(Mutex::new(session)),
        app_state.clone(),
        stats_path,
        event_tx.clone(),
    ));

    // First fetch at startup; the hourly schedule starts once it succeeds
    if authenticated {
        let refresher = refresher.clone();
        std::thread::spawn(move || {
            if refresher.refresh().is_some() {
                refresher.start_schedule();
            }
        });
    }

    let (w, h) = if authenticated {
        ui::WIDGET_WINDOW_SIZE
    } else {
        ui::SETTINGS_WINDOW_SIZE
    };
    // Configured sessions start hidden in the tray; a fresh install
    // opens straight into the settings view.
    let vp = ViewportBuilder::default()
        .with_title("UserPulse")
        .with_inner_size(vec2(w, h))
        .with_visible(!authenticated)
        .with_taskbar(false)
        .with_transparent(true)
        .with_decorations(false)
        .with_always_on_top()
        .with_resizable(false);

    let native_options = eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    };

    println!("[userpulse] starting eframe...");

    eframe::run_native(
        "UserPulse",
        native_options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(ui::UserPulseApp::new(
                app_state,
                refresher,
                event_tx,
                event_rx,
                cc.egui_ctx.clone(),
                !authenticated,
            )))
        }),
    )
    .expect("Failed to start eframe");
}
