use std::time::Instant;

/// Prints elapsed wall-clock time since `start` as HH:MM:SS.
pub fn print_hms(start: &Instant) {
    let secs = start.elapsed().as_secs();
    println!(
        "Elapsed: {:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    );
}
