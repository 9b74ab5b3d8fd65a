use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Fixed-window request limiter keyed by host name.
///
/// One instance is owned by [`crate::fetcher::HttpClient`]; nothing about it
/// is process-global. The number of tracked hosts is bounded by
/// `max_tracked_keys`: when a new host would exceed it, expired windows are
/// dropped first and then the oldest window is evicted.
pub struct HostRateLimiter {
    store: DashMap<String, WindowData>,
    max_requests: u32,
    window: Duration,
    max_tracked_keys: usize,
}

#[derive(Debug, Clone)]
struct WindowData {
    count: u32,
    window_start: DateTime<Utc>,
}

impl HostRateLimiter {
    pub fn new(max_requests: u32, window: std::time::Duration, max_tracked_keys: usize) -> Self {
        Self {
            store: DashMap::new(),
            max_requests,
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::seconds(60)),
            max_tracked_keys: max_tracked_keys.max(1),
        }
    }

    /// Record a request for `host`, returning `false` when the host has used
    /// up its budget for the current window.
    pub fn check(&self, host: &str) -> bool {
        self.check_at(host, Utc::now())
    }

    fn check_at(&self, host: &str, now: DateTime<Utc>) -> bool {
        let host = host.to_ascii_lowercase();
        if !self.store.contains_key(&host) && self.store.len() >= self.max_tracked_keys {
            self.evict(now);
        }

        let mut entry = self.store.entry(host).or_insert_with(|| WindowData {
            count: 0,
            window_start: now,
        });
        let data = entry.value_mut();

        if now.signed_duration_since(data.window_start) >= self.window {
            data.count = 0;
            data.window_start = now;
        }

        data.count += 1;
        data.count <= self.max_requests
    }

    fn evict(&self, now: DateTime<Utc>) {
        let window = self.window;
        self.store
            .retain(|_, data| now.signed_duration_since(data.window_start) < window);

        while self.store.len() >= self.max_tracked_keys {
            let oldest = self
                .store
                .iter()
                .min_by_key(|entry| entry.value().window_start)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.store.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Forget every tracked host.
    pub fn reset(&self) {
        self.store.clear();
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }
}
