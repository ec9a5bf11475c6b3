use super::theme;
use eframe::egui::Color32;

pub const MENU_ID_REFRESH: &str = "refresh";
pub const MENU_ID_SETTINGS: &str = "settings";
pub const MENU_ID_QUIT: &str = "quit";

pub fn setup_tray() -> Option<tray_icon::TrayIcon> {
    use tray_icon::menu::{Menu, MenuItem, PredefinedMenuItem};
    use tray_icon::TrayIconBuilder;

    let menu = Menu::new();
    let refresh = MenuItem::with_id(MENU_ID_REFRESH, "Refresh Data", true, None);
    let settings = MenuItem::with_id(MENU_ID_SETTINGS, "Settings", true, None);
    let quit = MenuItem::with_id(MENU_ID_QUIT, "Quit", true, None);

    let _ = menu.append(&refresh);
    let _ = menu.append(&settings);
    let _ = menu.append(&PredefinedMenuItem::separator());
    let _ = menu.append(&quit);

    let icon = match make_tray_icon(theme::TRAY_ICON_COLOR) {
        Some(i) => i,
        None => return None,
    };

    match TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip("UserPulse")
        .with_icon(icon)
        .build()
    {
        Ok(tray) => {
            println!("[tray] built successfully");
            Some(tray)
        }
        Err(e) => {
            eprintln!("[tray] build error: {}", e);
            None
        }
    }
}

fn make_tray_icon(color: Color32) -> Option<tray_icon::Icon> {
    let mut icon_data = vec![0u8; 16 * 16 * 4];
    for pixel in icon_data.chunks_exact_mut(4) {
        pixel[0] = color.r();
        pixel[1] = color.g();
        pixel[2] = color.b();
        pixel[3] = 0xFF;
    }
    match tray_icon::Icon::from_rgba(icon_data, 16, 16) {
        Ok(i) => Some(i),
        Err(e) => {
            eprintln!("[tray] icon error: {}", e);
            None
        }
    }
}

/// Reflect the latest snapshot into the tray. The title renders next to
/// the icon on macOS; elsewhere the stats ride along in the tooltip.
pub fn apply_title(tray: &tray_icon::TrayIcon, title: &str) {
    #[cfg(target_os = "macos")]
    {
        if title.is_empty() {
            tray.set_title(None::<&str>);
        } else {
            tray.set_title(Some(title));
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        let tooltip = if title.is_empty() {
            "UserPulse".to_string()
        } else {
            format!("UserPulse: {}", title)
        };
        let _ = tray.set_tooltip(Some(tooltip));
    }
}
