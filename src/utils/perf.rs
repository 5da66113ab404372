//! Performance measurement for the experiment binaries.
//!
//! Memory figures come from `/proc/self/status` and are only available on Linux.

use std::time::{Duration, Instant};

/// Runs `f` and returns its result together with the elapsed wall-clock time.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// Reads the peak resident set size (`VmHWM`) of this process, in kilobytes.
///
/// Returns `None` if the value cannot be read.
#[cfg(target_os = "linux")]
pub fn peak_rss_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_status_kb(&status, "VmHWM:")
}

#[cfg(not(target_os = "linux"))]
pub fn peak_rss_kb() -> Option<u64> {
    use std::sync::Once;
    static WARN_ONCE: Once = Once::new();
    WARN_ONCE.call_once(|| {
        log::warn!("Peak RSS measurement is only supported on Linux.");
    });
    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_status_kb(status: &str, key: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix(key))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_kb() {
        let status = "Name:\tspectrum\nVmPeak:\t  20480 kB\nVmHWM:\t    4096 kB\n";
        assert_eq!(parse_status_kb(status, "VmHWM:"), Some(4096));
        assert_eq!(parse_status_kb(status, "VmPeak:"), Some(20480));
        assert_eq!(parse_status_kb(status, "VmSwap:"), None);
    }

    #[test]
    fn test_timed_returns_result() {
        let (value, elapsed) = timed(|| 6 * 7);
        assert_eq!(value, 42);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_peak_rss_is_readable_on_linux() {
        assert!(peak_rss_kb().is_some_and(|kb| kb > 0));
    }
}
