use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Issues numeric millisecond-timestamp session identifiers.
///
/// Two requests in the same millisecond get `last + 1`, so identifiers are
/// strictly increasing within one process. Separate processes may still
/// produce the same identifier.
#[derive(Debug, Default)]
pub struct SessionIdGenerator {
    last: Mutex<u64>,
}

impl SessionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        self.next_at(now_millis()).to_string()
    }

    fn next_at(&self, now: u64) -> u64 {
        let mut last = self.last.lock();
        let id = now.max(*last + 1);
        *last = id;
        id
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_same_millisecond_is_bumped() {
        let generator = SessionIdGenerator::new();
        assert_eq!(generator.next_at(1_700_000_000_000), 1_700_000_000_000);
        assert_eq!(generator.next_at(1_700_000_000_000), 1_700_000_000_001);
        assert_eq!(generator.next_at(1_699_999_999_999), 1_700_000_000_002);
        assert_eq!(generator.next_at(1_700_000_000_500), 1_700_000_000_500);
    }

    #[test]
    fn test_ids_are_numeric_timestamps() {
        let before = now_millis();
        let id: u64 = SessionIdGenerator::new().next_id().parse().unwrap();
        assert!(id >= before);
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let generator = Arc::new(SessionIdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || {
                    (0..250).map(|_| generator.next_id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
