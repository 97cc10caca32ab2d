//! Widget accent colour: taken from the host page when it declares one,
//! otherwise from the settings, and changeable from the colour picker.

use crate::page::PageContentProvider;

/// Accent used when neither the page nor the settings provide one
pub const DEFAULT_THEME_COLOR: &str = "#4169e1";

/// Swatches offered by the colour picker
pub const THEME_PALETTE: [&str; 6] = ["#4169e1", "#e74c3c", "#27ae60", "#f39c12", "#8e44ad", "#333333"];

fn is_painted(color: &str) -> bool {
    !color.is_empty() && color != "transparent" && color != "rgba(0, 0, 0, 0)"
}

/// The page's brand colour: its `--primary-color` custom property, or the
/// header background when that is actually painted.
pub fn detect_brand_color(page: &dyn PageContentProvider) -> Option<String> {
    if let Some(primary) = page.primary_color_var() {
        let primary = primary.trim();
        if !primary.is_empty() {
            return Some(primary.to_string());
        }
    }
    page.header_background()
        .map(|background| background.trim().to_string())
        .filter(|background| is_painted(background))
}
