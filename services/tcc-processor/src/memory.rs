//! Process memory readings for job logs.

/// Current process RSS (Resident Set Size) in bytes, if the platform reports it.
pub fn process_rss_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

/// Human-readable byte count, e.g. `"512.0 MB"`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Log line describing current RSS, or a note that it is unavailable.
pub fn rss_summary(label: &str) -> String {
    match process_rss_bytes() {
        Some(bytes) => format!("Memory usage {}: {} RSS", label, format_bytes(bytes)),
        None => format!("Memory usage {}: unavailable", label),
    }
}
