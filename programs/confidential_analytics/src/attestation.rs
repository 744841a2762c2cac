//! Oracle proof verification through the ed25519 precompile.
//!
//! The oracle signs `request_id || cleartexts` with its registered key. The
//! relaying transaction places an ed25519 precompile instruction immediately
//! before `fulfill_decryption`; the runtime verifies the signature and this
//! module checks, via the instructions sysvar, that the verified
//! (key, message, signature) triple is exactly the one we expect.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::sysvar::instructions::{
    load_current_index_checked, load_instruction_at_checked,
};
use solana_sdk_ids::ed25519_program;

use crate::constants::SIGNATURE_LEN;
use crate::encrypted::{ProofVerifier, RequestId};

const SIGNATURE_COUNT_OFFSET: usize = 0;
const OFFSETS_START: usize = 2;
const OFFSETS_LEN: usize = 14;
/// Instruction index meaning "data lives in this same instruction".
const CURRENT_INSTRUCTION: u16 = u16::MAX;

/// Message the oracle signs for a decryption response.
pub fn attestation_message(request_id: &RequestId, cleartexts: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(32 + cleartexts.len());
    message.extend_from_slice(&request_id.0);
    message.extend_from_slice(cleartexts);
    message
}

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn slice_at(data: &[u8], offset: u16, len: usize) -> Option<&[u8]> {
    let start = offset as usize;
    data.get(start..start.checked_add(len)?)
}

/// Checks that ed25519 precompile instruction data covers exactly one
/// signature by `signer` over `message`, equal to `signature`, with every
/// field stored inline.
pub fn ed25519_payload_matches(
    data: &[u8],
    signer: &Pubkey,
    message: &[u8],
    signature: &[u8],
) -> bool {
    if signature.len() != SIGNATURE_LEN || data.get(SIGNATURE_COUNT_OFFSET) != Some(&1) {
        return false;
    }
    if data.len() < OFFSETS_START + OFFSETS_LEN {
        return false;
    }

    let field = |index: usize| read_u16(data, OFFSETS_START + index * 2);
    let (
        Some(signature_offset),
        Some(signature_ix),
        Some(pubkey_offset),
        Some(pubkey_ix),
        Some(message_offset),
        Some(message_size),
        Some(message_ix),
    ) = (
        field(0),
        field(1),
        field(2),
        field(3),
        field(4),
        field(5),
        field(6),
    )
    else {
        return false;
    };

    if [signature_ix, pubkey_ix, message_ix]
        .iter()
        .any(|ix| *ix != CURRENT_INSTRUCTION)
    {
        return false;
    }
    if message_size as usize != message.len() {
        return false;
    }

    slice_at(data, pubkey_offset, 32) == Some(&signer.to_bytes()[..])
        && slice_at(data, signature_offset, SIGNATURE_LEN) == Some(signature)
        && slice_at(data, message_offset, message.len()) == Some(message)
}

/// [`ProofVerifier`] backed by the ed25519 instruction preceding the current
/// one in the transaction.
pub struct Ed25519Attestation<'a, 'info> {
    instructions: &'a AccountInfo<'info>,
    oracle: Pubkey,
}

impl<'a, 'info> Ed25519Attestation<'a, 'info> {
    pub fn new(instructions: &'a AccountInfo<'info>, oracle: Pubkey) -> Self {
        Self {
            instructions,
            oracle,
        }
    }
}

impl ProofVerifier for Ed25519Attestation<'_, '_> {
    fn verify(&self, request_id: &RequestId, cleartexts: &[u8], proof: &[u8]) -> bool {
        let Ok(current) = load_current_index_checked(self.instructions) else {
            return false;
        };
        let Some(previous) = current.checked_sub(1) else {
            return false;
        };
        let Ok(ix) = load_instruction_at_checked(previous as usize, self.instructions) else {
            return false;
        };
        if ix.program_id != ed25519_program::ID {
            return false;
        }

        let message = attestation_message(request_id, cleartexts);
        ed25519_payload_matches(&ix.data, &self.oracle, &message, proof)
    }
}
