//! Poseidon commitment binding a batch's four accumulator handles to this
//! deployment.

use anchor_lang::prelude::*;
#[cfg(not(target_os = "solana"))]
use ark_bn254::Fr;
#[cfg(not(target_os = "solana"))]
use light_poseidon::{Poseidon, PoseidonBytesHasher};
#[cfg(target_os = "solana")]
use solana_poseidon::{hashv, Endianness, Parameters};

use crate::constants::{AGGREGATE_COUNT, COMMITMENT_TAG};
use crate::encrypted::Ciphertext;
use crate::error::AnalyticsError;

/// tag + 2 domain halves + 2 halves per aggregate; the syscall takes at most 12
pub const COMMITMENT_INPUTS: usize = 1 + 2 + 2 * AGGREGATE_COUNT;

/// Left-pads a 16-byte chunk into a 32-byte big-endian field element.
/// 128-bit values are always below the BN254 modulus.
fn field_word(chunk: &[u8]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[32 - chunk.len()..].copy_from_slice(chunk);
    word
}

fn push_halves(words: &mut Vec<[u8; 32]>, bytes: &[u8; 32]) {
    words.push(field_word(&bytes[..16]));
    words.push(field_word(&bytes[16..]));
}

/// Commitment over `{sum, max, min, suspiciousCount}` handles, in that order,
/// separated by the registry address so a commitment from one deployment never
/// verifies in another.
pub fn aggregate_commitment(
    domain: &Pubkey,
    aggregates: &[Ciphertext; AGGREGATE_COUNT],
) -> Result<[u8; 32]> {
    let mut words: Vec<[u8; 32]> = Vec::with_capacity(COMMITMENT_INPUTS);
    words.push(field_word(COMMITMENT_TAG));
    push_halves(&mut words, &domain.to_bytes());
    for aggregate in aggregates {
        push_halves(&mut words, &aggregate.0);
    }

    let inputs: Vec<&[u8]> = words.iter().map(|w| w.as_slice()).collect();
    poseidon_be(&inputs)
}

/// On-chain the hash goes through the `sol_poseidon` syscall.
#[cfg(target_os = "solana")]
fn poseidon_be(inputs: &[&[u8]]) -> Result<[u8; 32]> {
    hashv(Parameters::Bn254X5, Endianness::BigEndian, inputs)
        .map(|hash| hash.to_bytes())
        .map_err(|_| error!(AnalyticsError::CommitmentFailure))
}

/// Same circom BN254 parameters as the syscall.
#[cfg(not(target_os = "solana"))]
fn poseidon_be(inputs: &[&[u8]]) -> Result<[u8; 32]> {
    let mut poseidon = Poseidon::<Fr>::new_circom(inputs.len())
        .map_err(|_| error!(AnalyticsError::CommitmentFailure))?;
    poseidon
        .hash_bytes_be(inputs)
        .map_err(|_| error!(AnalyticsError::CommitmentFailure))
}
