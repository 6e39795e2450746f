use unicode_width::UnicodeWidthStr;

/// `m:ss` for a duration in seconds
pub fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Lenient numeric parse for typed set values: blank and garbage become 0
pub fn coerce_number(input: &str) -> f64 {
    match input.trim() {
        "" => 0.0,
        s => s
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
    }
}

/// Render a load without a trailing `.0` for whole numbers
pub fn format_load(load: f64) -> String {
    if load.fract() == 0.0 {
        format!("{load:.0}")
    } else {
        format!("{load:.1}")
    }
}

/// Pad `text` with spaces to `width` terminal columns
pub fn pad_to_width(text: &str, width: usize) -> String {
    let used = text.width();
    format!("{text}{}", " ".repeat(width.saturating_sub(used)))
}
