//! Voucher code generation.
//!
//! Codes are 8 symbols from the 36-symbol alphabet, rendered `XXXX-XXXX`.
//! A candidate is only issuable after a uniqueness probe against the
//! voucher store; at 36^8 combinations a collision is negligible per call,
//! but the code space is shared across the system's whole lifetime, so
//! the probe is unconditional.
//!
//! The probe is check-then-act and can race with a concurrent issuance.
//! That race is closed one layer down: the store's insert rejects a
//! duplicate code, and issuance retries with a fresh candidate.

use netpass_store::VoucherStore;
use netpass_types::{constants, NetpassError, Result, VoucherCode};
use rand::Rng;

/// Stateless generator of collision-free voucher codes.
pub struct CodeGenerator;

impl CodeGenerator {
    /// One random candidate, formatted but not yet checked for uniqueness.
    #[must_use]
    pub fn random_code() -> VoucherCode {
        let alphabet = constants::CODE_ALPHABET.as_bytes();
        let mut rng = rand::thread_rng();
        let mut raw = String::with_capacity(constants::CODE_LENGTH + 1);
        for i in 0..constants::CODE_LENGTH {
            if i == constants::CODE_GROUP_LENGTH {
                raw.push('-');
            }
            raw.push(char::from(alphabet[rng.gen_range(0..alphabet.len())]));
        }
        VoucherCode::new(raw)
    }

    /// Generate-and-check until a collision-free code is found.
    ///
    /// Reads the store but persists nothing — the caller owns the insert.
    ///
    /// # Errors
    /// Returns `CodeSpaceExhausted` after `max_attempts` collisions, which
    /// in practice means the store is misbehaving.
    pub fn generate(store: &VoucherStore, max_attempts: usize) -> Result<VoucherCode> {
        for _ in 0..max_attempts {
            let code = Self::random_code();
            if !store.contains(&code) {
                return Ok(code);
            }
        }
        Err(NetpassError::CodeSpaceExhausted {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpass_types::{PlanId, Voucher};

    #[test]
    fn random_code_is_well_formed() {
        for _ in 0..100 {
            let code = CodeGenerator::random_code();
            assert!(code.is_well_formed(), "malformed code: {code}");
        }
    }

    #[test]
    fn generate_avoids_existing_codes() {
        let store = VoucherStore::new();
        let code = CodeGenerator::generate(&store, 32).unwrap();
        store.insert(Voucher::dummy(code.as_str(), PlanId::new())).unwrap();

        let next = CodeGenerator::generate(&store, 32).unwrap();
        assert_ne!(code, next);
        assert!(!store.contains(&next));
    }

    #[test]
    fn generated_codes_pairwise_distinct() {
        use std::collections::HashSet;

        let store = VoucherStore::new();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let code = CodeGenerator::generate(&store, 32).unwrap();
            store.insert(Voucher::dummy(code.as_str(), PlanId::new())).unwrap();
            assert!(seen.insert(code));
        }
    }
}
