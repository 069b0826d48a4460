//! Display formatting for aggregate figures.

/// Minutes as "H hours M minutes". Missing and zero both render as zero.
pub fn format_minutes(minutes: Option<u32>) -> String {
    let minutes = minutes.unwrap_or(0);
    format!("{} hours {} minutes", minutes / 60, minutes % 60)
}
