use eframe::egui::Color32;

// Colors matching the widget's original CSS theme
pub const TEXT_COLOR: Color32 = Color32::from_rgb(0xe6, 0xe6, 0xe6);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(0x9c, 0xa3, 0xaf);
pub const WIDGET_BG: Color32 = Color32::from_rgb(0x2a, 0x2a, 0x2a);
pub const SETTINGS_BG: Color32 = Color32::from_rgb(0x1f, 0x29, 0x37);
pub const BTN_BG: Color32 = Color32::from_rgb(0x25, 0x63, 0xeb);
pub const ERROR_BG: Color32 = Color32::from_rgb(0x7f, 0x1d, 0x1d);
pub const ERROR_BORDER: Color32 = Color32::from_rgb(0xb9, 0x1c, 0x1c);
pub const SIGNUP_GREEN: Color32 = Color32::from_rgb(0x22, 0xc5, 0x5e);
pub const TRAY_ICON_COLOR: Color32 = Color32::from_rgb(0x5a, 0x8e, 0xc0);
