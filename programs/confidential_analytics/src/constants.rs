//! Seeds, identity values and payload widths shared across the program.

/// PDA seed for the singleton registry account.
pub const REGISTRY_SEED: &[u8] = b"registry";

/// PDA seed prefix for provider membership records.
pub const PROVIDER_SEED: &[u8] = b"provider";

/// PDA seed prefix for batch accounts.
pub const BATCH_SEED: &[u8] = b"batch";

/// Batch ids start at 1; 0 means "no batch opened yet".
pub const FIRST_BATCH_ID: u64 = 1;

/// Number of encrypted accumulators revealed per batch:
/// sum, max, min, suspicious count (in that order).
pub const AGGREGATE_COUNT: usize = 4;

/// Width of one revealed aggregate in the cleartext payload.
pub const AGGREGATE_WIDTH: usize = 8;

/// Exact length of a decryption callback payload.
pub const CLEARTEXT_LEN: usize = AGGREGATE_COUNT * AGGREGATE_WIDTH;

/// Length of an ed25519 signature carried as the oracle's proof.
pub const SIGNATURE_LEN: usize = 64;

/// Identity seed for the sum accumulator.
pub const SUM_IDENTITY: u64 = 0;

/// Identity seed for the max accumulator (minimum representable value).
pub const MAX_IDENTITY: u64 = u64::MIN;

/// Identity seed for the min accumulator (maximum representable value).
pub const MIN_IDENTITY: u64 = u64::MAX;

/// Identity seed for the suspicious-count accumulator.
pub const SUSPICIOUS_IDENTITY: u64 = 0;

/// Domain tag absorbed first into every aggregate commitment.
pub const COMMITMENT_TAG: &[u8; 16] = b"analytics/commit";

/// Domain tag for symbolic result handles.
pub const HANDLE_TAG: &[u8] = b"analytics/handle";

/// Domain tag for decryption request handles.
pub const REQUEST_TAG: &[u8] = b"analytics/decrypt";
