use tokio::time::Instant;

/// `(time, total)` captured together; replaced wholesale, never patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatSnapshot {
    pub time: Instant,
    pub total: u64,
}

/// The two most recent snapshots. Throughput is measured across them.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotWindow {
    pub previous: StatSnapshot,
    pub latest: StatSnapshot,
}

impl SnapshotWindow {
    pub fn new(initial: StatSnapshot) -> Self {
        Self {
            previous: initial,
            latest: initial,
        }
    }

    pub fn advance(&mut self, next: StatSnapshot) {
        self.previous = self.latest;
        self.latest = next;
    }
}

/// Requests per second between two snapshots, rounded to a whole number.
///
/// Zero when no time has passed.
pub fn throughput(earlier: &StatSnapshot, later: &StatSnapshot) -> f64 {
    let elapsed = later.time.saturating_duration_since(earlier.time).as_secs_f64();
    if elapsed > 0.0 {
        let delta = later.total.saturating_sub(earlier.total) as f64;
        (delta / elapsed).round()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn rate_over_five_seconds() {
        let t0 = Instant::now();
        let earlier = StatSnapshot { time: t0, total: 100 };
        let later = StatSnapshot {
            time: t0 + Duration::from_secs(5),
            total: 150,
        };
        assert_eq!(throughput(&earlier, &later), 10.0);
    }

    #[test]
    fn rate_is_rounded() {
        let t0 = Instant::now();
        let earlier = StatSnapshot { time: t0, total: 0 };
        let later = StatSnapshot {
            time: t0 + Duration::from_secs(3),
            total: 10,
        };
        assert_eq!(throughput(&earlier, &later), 3.0);
    }

    #[test]
    fn backwards_or_equal_time_is_zero() {
        let t0 = Instant::now();
        let later = StatSnapshot {
            time: t0 + Duration::from_secs(1),
            total: 10,
        };
        let earlier = StatSnapshot { time: t0, total: 0 };
        assert_eq!(throughput(&later, &earlier), 0.0);
        assert_eq!(throughput(&earlier, &earlier), 0.0);
    }

    #[test]
    fn window_keeps_previous_on_advance() {
        let t0 = Instant::now();
        let mut window = SnapshotWindow::new(StatSnapshot { time: t0, total: 0 });
        let next = StatSnapshot {
            time: t0 + Duration::from_secs(1),
            total: 7,
        };
        window.advance(next);
        assert_eq!(window.previous.total, 0);
        assert_eq!(window.latest, next);
    }
}
