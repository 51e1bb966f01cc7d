//! Display template mini-language.
//!
//! A template is any string containing the placeholders `{monitor}`,
//! `{workspace}` and `{name}`.  Monitor and workspace numbers are rendered
//! 1-based; an absent name renders as the empty string.  After substitution
//! the result is trimmed and a single trailing `:` is dropped, so
//! `"M{monitor}:W{workspace} {name}"` degrades to `"M2:W1"` when the
//! workspace has no name.
//!
//! ```
//! use wsindicator::template::render;
//! assert_eq!(render("{workspace}", 1, 3, None), "3");
//! assert_eq!(render("M{monitor}:W{workspace} {name}", 2, 1, Some("Work")), "M2:W1 Work");
//! ```

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "{workspace}";

/// Substitute the placeholders.
///
/// `monitor` and `workspace` are already 1-based display numbers.
pub fn render(template: &str, monitor: u64, workspace: usize, name: Option<&str>) -> String {
    let text = template
        .replace("{monitor}", &monitor.to_string())
        .replace("{workspace}", &workspace.to_string())
        .replace("{name}", name.unwrap_or(""));
    let text = text.trim();
    let text = text.strip_suffix(':').unwrap_or(text);
    text.trim_end().to_string()
}

/// Build the effective template from the CLI switches.
///
/// An explicitly configured template always wins.  Otherwise the
/// `show_monitor` / `show_name` switches extend the default.
pub fn compose(template: Option<&str>, show_monitor: bool, show_name: bool) -> String {
    if let Some(t) = template {
        return t.to_string();
    }
    let mut t = if show_monitor {
        "M{monitor}:W{workspace}".to_string()
    } else {
        DEFAULT_TEMPLATE.to_string()
    };
    if show_name {
        t.push_str(" {name}");
    }
    t
}
