use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Custom epoch: 2024-01-01T00:00:00Z in milliseconds.
const EPOCH_MS: i64 = 1_704_067_200_000;

const NODE_BITS: u8 = 10;
const SEQ_BITS: u8 = 12;
const MAX_NODE: i64 = (1 << NODE_BITS) - 1;
const SEQ_MASK: i64 = (1 << SEQ_BITS) - 1;

#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("snowflake node id {0} out of range 0..=1023")]
    NodeOutOfRange(i64),
}

struct Clock {
    last_ms: i64,
    sequence: i64,
}

/// Snowflake-style ID generator: 41-bit millisecond timestamp, 10-bit node
/// id, 12-bit per-millisecond sequence. Constructed once at startup and
/// shared behind an `Arc` in `AppState`; safe for concurrent callers.
pub struct Snowflake {
    node: i64,
    clock: Mutex<Clock>,
}

impl Snowflake {
    pub fn new(node: i64) -> Result<Self, IdError> {
        if !(0..=MAX_NODE).contains(&node) {
            return Err(IdError::NodeOutOfRange(node));
        }
        Ok(Self {
            node,
            clock: Mutex::new(Clock {
                last_ms: 0,
                sequence: 0,
            }),
        })
    }

    /// Generates the next ID. Monotonically non-decreasing; spins to the
    /// next millisecond when a single millisecond's sequence is exhausted.
    pub fn generate(&self) -> i64 {
        let mut clock = self.clock.lock().expect("snowflake clock poisoned");

        // A backwards wall-clock step must not reissue old timestamps, so
        // the generator keeps counting against the last observed one.
        let mut now = Self::millis_since_epoch().max(clock.last_ms);

        if now == clock.last_ms {
            clock.sequence = (clock.sequence + 1) & SEQ_MASK;
            if clock.sequence == 0 {
                while now <= clock.last_ms {
                    std::hint::spin_loop();
                    now = Self::millis_since_epoch();
                }
            }
        } else {
            clock.sequence = 0;
        }
        clock.last_ms = now;

        (now << (NODE_BITS + SEQ_BITS)) | (self.node << SEQ_BITS) | clock.sequence
    }

    fn millis_since_epoch() -> i64 {
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as i64;
        unix_ms - EPOCH_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn rejects_node_out_of_range() {
        assert!(Snowflake::new(-1).is_err());
        assert!(Snowflake::new(1024).is_err());
        assert!(Snowflake::new(0).is_ok());
        assert!(Snowflake::new(1023).is_ok());
    }

    #[test]
    fn ids_are_monotonically_non_decreasing() {
        let gen = Snowflake::new(1).expect("node in range");
        let mut prev = gen.generate();
        for _ in 0..10_000 {
            let next = gen.generate();
            assert!(next > prev, "expected {next} > {prev}");
            prev = next;
        }
    }

    #[test]
    fn encodes_node_id() {
        let gen = Snowflake::new(42).expect("node in range");
        let id = gen.generate();
        assert_eq!((id >> SEQ_BITS) & MAX_NODE, 42);
    }

    #[test]
    fn concurrent_generation_yields_unique_ids() {
        let gen = Arc::new(Snowflake::new(7).expect("node in range"));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let gen = Arc::clone(&gen);
            handles.push(std::thread::spawn(move || {
                (0..2_000).map(|_| gen.generate()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("worker panicked") {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 8 * 2_000);
    }
}
