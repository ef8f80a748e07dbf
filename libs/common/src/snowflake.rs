use std::sync::Mutex;

/// Parley epoch: 2026-01-01T00:00:00Z in milliseconds since the Unix epoch.
const PARLEY_EPOCH_MS: i64 = 1_767_225_600_000;

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

struct Cursor {
    last_ms: i64,
    sequence: i64,
}

/// 64-bit time-ordered message id generator.
///
/// Layout (MSB → LSB):
/// - Bits 62–22: milliseconds since the Parley epoch
/// - Bits 21–12: node id
/// - Bits 11–0:  per-millisecond sequence
///
/// Ids are strictly increasing for a given generator. If the wall clock steps
/// backwards, or a millisecond's sequence is exhausted, the generator keeps
/// counting on a logical clock instead of waiting for real time to catch up.
pub struct SnowflakeGenerator {
    node_id: i64,
    cursor: Mutex<Cursor>,
}

impl SnowflakeGenerator {
    pub fn new(node_id: u16) -> Self {
        assert!(
            u32::from(node_id) < (1 << NODE_BITS),
            "node_id must fit in {NODE_BITS} bits"
        );
        Self {
            node_id: i64::from(node_id),
            cursor: Mutex::new(Cursor {
                last_ms: 0,
                sequence: 0,
            }),
        }
    }

    pub fn generate(&self) -> i64 {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut cursor = self
            .cursor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if now_ms > cursor.last_ms {
            cursor.last_ms = now_ms;
            cursor.sequence = 0;
        } else {
            cursor.sequence = (cursor.sequence + 1) & SEQUENCE_MASK;
            if cursor.sequence == 0 {
                cursor.last_ms += 1;
            }
        }

        let ts = (cursor.last_ms - PARLEY_EPOCH_MS).max(0);
        (ts << (NODE_BITS + SEQUENCE_BITS)) | (self.node_id << SEQUENCE_BITS) | cursor.sequence
    }
}

/// Milliseconds since the Unix epoch encoded in a snowflake id.
pub fn snowflake_timestamp_ms(id: i64) -> i64 {
    (id >> (NODE_BITS + SEQUENCE_BITS)) + PARLEY_EPOCH_MS
}
