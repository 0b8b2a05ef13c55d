//! Human-readable durations.

/// Formats as `MM:SS.cc`. Minutes keep counting past 59.
pub fn format_clock(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let centis = (ms % 1000) / 10;
    format!("{minutes:02}:{seconds:02}.{centis:02}")
}

/// Formats as seconds with two decimals, rounded half-up to centiseconds.
pub fn format_seconds(ms: u64) -> String {
    let centis = ms.saturating_add(5) / 10;
    format!("{}.{:02}s", centis / 100, centis % 100)
}
