//! Deterministic trade loop addresses.
//!
//! The address is the storage key of the record, so it must separate
//! creators: the same `trade_id` picked by two different accounts lands in
//! two different slots.

use alloc::vec::Vec;
use codec::Encode;
use primitives::{
  seeds::{DERIVATION_VERSION, TRADE_LOOP_SEED},
  LoopAddress, TradeId,
};

fn hash_with_bump<AccountId: Encode>(
  trade_id: &TradeId,
  creator: &AccountId,
  bump: u8,
) -> LoopAddress {
  let creator = creator.encode();
  let mut seed_input =
    Vec::with_capacity(TRADE_LOOP_SEED.len() + trade_id.len() + creator.len() + 1);
  seed_input.extend_from_slice(TRADE_LOOP_SEED);
  seed_input.extend_from_slice(trade_id);
  seed_input.extend_from_slice(&creator);
  seed_input.push(bump);
  frame::hashing::blake2_256(&seed_input)
}

/// Address of the loop `creator` opens under `trade_id`, with the bump that
/// proves it.
pub fn derive_loop_address<AccountId: Encode>(
  trade_id: &TradeId,
  creator: &AccountId,
) -> (LoopAddress, u8) {
  (
    hash_with_bump(trade_id, creator, DERIVATION_VERSION),
    DERIVATION_VERSION,
  )
}

/// Recomputes an address from its inputs and compares.
pub fn verify_loop_address<AccountId: Encode>(
  address: &LoopAddress,
  trade_id: &TradeId,
  creator: &AccountId,
  bump: u8,
) -> bool {
  hash_with_bump(trade_id, creator, bump) == *address
}
