//! Identifier sources.
//!
//! The registry owns identifier *uniqueness*; an [`IdSource`] only proposes
//! candidates. Both sources below produce 24-character uppercase tokens, the
//! shape native project files use for object keys.

use uuid::Uuid;

use crate::types::ObjectId;

/// Length of every minted identifier, in characters.
pub const ID_LEN: usize = 24;

/// Proposes candidate identifiers for new objects.
///
/// `Send` so a registry can live behind a mutex shared across threads.
pub trait IdSource: Send {
    fn next_id(&mut self) -> ObjectId;
}

/// 96 random bits rendered as uppercase hex.
///
/// The bits come from a v4 UUID with its fixed version nibble and variant
/// bits dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self) -> ObjectId {
        ObjectId(format!("{:024X}", random_bits(Uuid::new_v4().as_u128())))
    }
}

/// Packs the random bits of a v4 UUID into the low 96 bits of the result.
///
/// Layout (MSB first): 48 random, 4 version, 12 random, 2 variant, 62 random.
fn random_bits(uuid: u128) -> u128 {
    let high = uuid >> 80;
    let mid = (uuid >> 64) & 0xFFF;
    let low = uuid & ((1u128 << 62) - 1);
    (high << 48) | (mid << 36) | (low >> 26)
}

/// Deterministic `prefix` + zero-padded counter, for reproducible graphs.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    /// Only the ASCII alphanumerics of `prefix` are kept, upper-cased and
    /// clipped so the counter keeps at least eight digits.
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(ID_LEN - 8)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Self { prefix, next: 1 }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("")
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> ObjectId {
        let width = ID_LEN - self.prefix.len();
        let id = format!("{}{:0width$X}", self.prefix, self.next, width = width);
        self.next += 1;
        ObjectId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_24_uppercase_hex() {
        let id = RandomIds.next_id();
        assert_eq!(id.as_str().len(), ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn random_ids_differ() {
        let mut ids = RandomIds;
        assert_ne!(ids.next_id(), ids.next_id());
    }

    #[test]
    fn sequential_ids_count_up() {
        let mut ids = SequentialIds::new("ab");
        assert_eq!(ids.next_id().as_str(), "AB0000000000000000000001");
        assert_eq!(ids.next_id().as_str(), "AB0000000000000000000002");
    }

    #[test]
    fn sequential_prefix_is_clipped() {
        let mut ids = SequentialIds::new("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        let id = ids.next_id();
        assert_eq!(id.as_str().len(), ID_LEN);
        assert!(id.as_str().ends_with("00000001"));
    }

    #[test]
    fn sequential_prefix_drops_non_ascii() {
        let mut ids = SequentialIds::new("aéééééééé");
        assert_eq!(ids.next_id().as_str(), "A00000000000000000000001");

        let mut ids = SequentialIds::new("é-x");
        let id = ids.next_id();
        assert_eq!(id.as_str().chars().count(), ID_LEN);
        assert!(id.as_str().starts_with('X'));
    }

    #[test]
    fn random_bits_skip_fixed_uuid_fields() {
        // Every random bit set, version and variant bits clear.
        let random_only = !((0xFu128 << 76) | (0b11u128 << 62));
        assert_eq!(random_bits(random_only), (1u128 << 96) - 1);
        // Version and variant bits alone contribute nothing.
        assert_eq!(random_bits((0x4u128 << 76) | (0b10u128 << 62)), 0);
    }
}
