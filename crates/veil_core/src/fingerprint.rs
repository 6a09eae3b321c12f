//! Cheap content fingerprints for the "nothing changed" fast path.
//!
//! The fingerprint must cost far less than a re-parse, so it is not a
//! cryptographic hash: small inputs are identified by their length plus a
//! short prefix, larger inputs by their length plus a sampled rolling hash.
//! Collisions are tolerated by contract - the worst case is a stale
//! decoration that the next edit corrects.

/// Inputs shorter than this are fingerprinted by prefix rather than hash.
const SMALL_INPUT_LIMIT: usize = 512;

/// How many leading bytes the prefix regime captures.
const PREFIX_BYTES: usize = 64;

/// Distance between sampled bytes in the rolling-hash regime.
const SAMPLE_STRIDE: usize = 16;

/// Upper bound on the number of sampled bytes.
const MAX_SAMPLES: usize = 512;

/// Compact summary of a buffer's content.
///
/// Two fingerprints comparing equal means the inputs are assumed identical;
/// the parse LRU and the incremental controller both key on this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    len: usize,
    kind: Kind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    /// Length plus the first `PREFIX_BYTES` bytes (zero padded).
    Prefix([u8; PREFIX_BYTES]),
    /// Length plus a 32-bit rolling hash over sampled bytes.
    Rolling(u32),
}

impl Fingerprint {
    /// Computes the fingerprint of `input`.
    #[must_use]
    pub fn of(input: &[u8]) -> Self {
        let kind = if input.len() < SMALL_INPUT_LIMIT {
            let mut prefix = [0u8; PREFIX_BYTES];
            let take = input.len().min(PREFIX_BYTES);
            prefix[..take].copy_from_slice(&input[..take]);
            Kind::Prefix(prefix)
        } else {
            let mut hash: u32 = 0;
            for i in (0..input.len()).step_by(SAMPLE_STRIDE).take(MAX_SAMPLES) {
                hash = hash.wrapping_mul(31).wrapping_add(u32::from(input[i]));
            }
            Kind::Rolling(hash)
        };

        Self {
            len: input.len(),
            kind,
        }
    }

    /// Returns the input length this fingerprint was computed over.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the fingerprinted input was empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}
