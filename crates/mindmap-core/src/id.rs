//! Identity generation for nodes and edges.
//!
//! The secure source draws v4 UUIDs from the OS generator. Hosts without one
//! select [`IdGenerator::PseudoRandom`] once at start-up: it mixes wall-clock
//! time, a process counter and the address of a stack slot through splitmix64
//! and formats the 128 bits as a v4-shaped UUID string.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::{Builder, Uuid};

static COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdGenerator {
    #[default]
    Secure,
    PseudoRandom,
}

impl IdGenerator {
    pub fn generate(self) -> String {
        match self {
            IdGenerator::Secure => Uuid::new_v4().to_string(),
            IdGenerator::PseudoRandom => pseudo_random_id(),
        }
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn pseudo_random_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let slot = 0u8;
    let addr = &slot as *const u8 as u64;

    let mut state = nanos ^ count.rotate_left(32) ^ addr;
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&splitmix64(&mut state).to_le_bytes());
    bytes[8..].copy_from_slice(&splitmix64(&mut state).to_le_bytes());
    Builder::from_random_bytes(bytes).into_uuid().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generators_produce_unique_uuid_shaped_ids() {
        for generator in [IdGenerator::Secure, IdGenerator::PseudoRandom] {
            let ids: HashSet<String> = (0..500).map(|_| generator.generate()).collect();
            assert_eq!(ids.len(), 500);
            for id in &ids {
                let parsed = Uuid::parse_str(id).expect("uuid-shaped id");
                assert_eq!(parsed.get_version_num(), 4);
            }
        }
    }
}
