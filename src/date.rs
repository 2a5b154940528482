//! Process-wide `Date` header renderer.
//!
//! Grounded on the design note in spec §9: "Date renderer singleton driven by
//! a ticker: implement as a process-wide atomic cell updated by a dedicated
//! task every second; readers copy the current rendered bytes." The atomic
//! cell is `arc_swap::ArcSwap` (pulled in from `AppFlowy-Cloud`'s dependency
//! set, which already leans on `arc-swap` for exactly this kind of
//! lock-free, rarely-written/often-read shared state).

use arc_swap::ArcSwap;
use bytes::Bytes;
use once_lock_compat::OnceCell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

mod once_lock_compat {
    // `std::sync::OnceLock` landed after this crate's MSRV target; a tiny
    // polyfill keeps `DateRenderer::global()` usable without bumping it.
    use std::sync::Once;
    use std::cell::UnsafeCell;

    pub struct OnceCell<T> {
        once: Once,
        value: UnsafeCell<Option<T>>,
    }

    unsafe impl<T: Sync> Sync for OnceCell<T> {}

    impl<T> OnceCell<T> {
        pub const fn new() -> Self {
            Self {
                once: Once::new(),
                value: UnsafeCell::new(None),
            }
        }

        pub fn get_or_init(&self, f: impl FnOnce() -> T) -> &T {
            self.once.call_once(|| {
                // Safety: `call_once` guarantees exclusive access here.
                unsafe { *self.value.get() = Some(f()) };
            });
            // Safety: initialized above, never mutated again.
            unsafe { (*self.value.get()).as_ref().unwrap() }
        }
    }
}

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Formats a Unix timestamp as an RFC 7231 `IMF-fixdate`, e.g.
/// `Sun, 06 Nov 1994 08:49:37 GMT`.
fn render_http_date(unix_secs: i64) -> String {
    let (year, month, day, hour, minute, second, weekday) = civil_from_unix(unix_secs);
    format!(
        "{}, {:02} {} {:04} {:02}:{:02}:{:02} GMT",
        WEEKDAYS[weekday], day, MONTHS[(month - 1) as usize], year, hour, minute, second
    )
}

/// Civil calendar conversion (Howard Hinnant's `civil_from_days` algorithm),
/// avoiding a chrono dependency for a single-purpose formatter.
fn civil_from_unix(unix_secs: i64) -> (i64, u32, u32, u32, u32, u32, usize) {
    let days = unix_secs.div_euclid(86_400);
    let secs_of_day = unix_secs.rem_euclid(86_400);
    let hour = (secs_of_day / 3600) as u32;
    let minute = ((secs_of_day % 3600) / 60) as u32;
    let second = (secs_of_day % 60) as u32;
    let weekday = ((days % 7 + 11) % 7) as usize; // 1970-01-01 was a Thursday (index 4)

    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = if month <= 2 { y + 1 } else { y };

    (year, month, day, hour, minute, second, weekday)
}

/// Shared, lock-free `Date` header renderer. A single background tick task
/// (spawned once via `DateRenderer::spawn_ticker`) updates the cached bytes
/// every second; readers just clone the `Bytes` handle out of the `ArcSwap`.
pub struct DateRenderer {
    current: ArcSwap<Bytes>,
}

impl DateRenderer {
    fn new() -> Self {
        let now = now_unix();
        Self {
            current: ArcSwap::from_pointee(Bytes::from(render_http_date(now))),
        }
    }

    pub fn global() -> &'static DateRenderer {
        static INSTANCE: OnceCell<DateRenderer> = OnceCell::new();
        INSTANCE.get_or_init(DateRenderer::new)
    }

    /// Pre-rendered `Date` header value, refreshed at most once a second.
    pub fn current(&self) -> Bytes {
        (**self.current.load()).clone()
    }

    fn tick(&self) {
        let rendered = render_http_date(now_unix());
        self.current.store(std::sync::Arc::new(Bytes::from(rendered)));
    }

    /// Spawns the per-second refresh task on the current tokio runtime. Safe
    /// to call more than once; only the first call schedules a task, later
    /// calls are no-ops so every connection can call it on setup without
    /// coordination.
    pub fn spawn_ticker() {
        static SPAWNED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);
        if SPAWNED.swap(true, std::sync::atomic::Ordering::SeqCst) {
            return;
        }
        tokio::spawn(async {
            let renderer = DateRenderer::global();
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                renderer.tick();
            }
        });
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_instant() {
        // 1994-11-06T08:49:37Z, the example date from RFC 7231 §7.1.1.1.
        assert_eq!(render_http_date(784_111_777), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn renders_epoch() {
        assert_eq!(render_http_date(0), "Thu, 01 Jan 1970 00:00:00 GMT");
    }
}
