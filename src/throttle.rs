use std::thread;
use std::time::Duration;

/// Fixed-delay scheduler used as a courtesy rate limit toward the source site.
/// Not adaptive and not a correctness mechanism; both pauses can be set to zero,
/// which skips sleeping entirely (tests run with 0/0).
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    chapter_pause: Duration,
    batch_pause: Duration,
}

impl Throttle {
    pub fn new(chapter_delay_ms: u64, batch_delay_ms: u64) -> Self {
        Self {
            chapter_pause: Duration::from_millis(chapter_delay_ms),
            batch_pause: Duration::from_millis(batch_delay_ms),
        }
    }

    pub fn after_chapter(&self) {
        pause(self.chapter_pause);
    }

    pub fn after_batch(&self) {
        pause(self.batch_pause);
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
