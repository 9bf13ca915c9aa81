//! Wire instructions driving the engine.
//!
//! Each instruction is a SCALE-encoded enum: one tag byte, fixed-width
//! fields and compact-length-prefixed asset lists. Clients may also wrap an
//! instruction in a versioned envelope `[ENVELOPE_TAG, version, ...]`.

use alloc::vec::Vec;
use codec::{Decode, DecodeAll, Encode};
use frame::prelude::*;
use primitives::{LoopAddress, TradeId};

/// Leading byte of a versioned envelope. No bare instruction uses this tag.
pub const ENVELOPE_TAG: u8 = 0xFF;

/// Envelope version understood by this decoder.
pub const INSTRUCTION_VERSION: u8 = 1;

#[derive(
  Encode, Decode, CloneNoBound, PartialEqNoBound, EqNoBound, RuntimeDebugNoBound, TypeInfo,
)]
#[scale_info(skip_type_params(MaxAssets))]
pub enum TradeInstruction<AccountId, AssetId, Hash, MaxAssets: Get<u32>>
where
  AccountId: Clone + PartialEq + Eq + core::fmt::Debug,
  AssetId: Clone + PartialEq + Eq + core::fmt::Debug,
  Hash: Clone + PartialEq + Eq + core::fmt::Debug,
{
  #[codec(index = 0)]
  InitializeLoop {
    trade_id: TradeId,
    step_count: u8,
    timeout_seconds: u64,
  },
  #[codec(index = 1)]
  AddStep {
    address: LoopAddress,
    step_index: u8,
    to: AccountId,
    assets: BoundedVec<AssetId, MaxAssets>,
  },
  #[codec(index = 2)]
  ApproveStep { address: LoopAddress, step_index: u8 },
  #[codec(index = 3)]
  ExecuteStep {
    address: LoopAddress,
    step_index: u8,
    from: AccountId,
    to: AccountId,
  },
  #[codec(index = 4)]
  ExecuteFullLoop { address: LoopAddress },
  #[codec(index = 5)]
  CancelLoop { address: LoopAddress },
  #[codec(index = 6)]
  InitializeConfig { governance: Option<AccountId> },
  /// `None` fields keep the current value.
  #[codec(index = 7)]
  UpdateConfig {
    new_authority: Option<AccountId>,
    new_governance: Option<AccountId>,
    new_paused: Option<bool>,
  },
  #[codec(index = 8)]
  UpgradeProgram { new_version: u32, code_hash: Hash },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MalformedMessage;

impl<AccountId, AssetId, Hash, MaxAssets> TradeInstruction<AccountId, AssetId, Hash, MaxAssets>
where
  AccountId: Decode + Encode + Clone + PartialEq + Eq + core::fmt::Debug,
  AssetId: Decode + Encode + Clone + PartialEq + Eq + core::fmt::Debug,
  Hash: Decode + Encode + Clone + PartialEq + Eq + core::fmt::Debug,
  MaxAssets: Get<u32>,
{
  /// Decodes a bare or enveloped instruction.
  ///
  /// The whole buffer must be consumed. Unknown tags, truncated fields,
  /// asset lists longer than `MaxAssets` or claiming more elements than the
  /// buffer holds, and empty asset lists are all rejected.
  pub fn unpack(input: &[u8]) -> Result<Self, MalformedMessage> {
    let body = match input {
      [] => return Err(MalformedMessage),
      [ENVELOPE_TAG, INSTRUCTION_VERSION, rest @ ..] => rest,
      [ENVELOPE_TAG, ..] => return Err(MalformedMessage),
      bare => bare,
    };
    let instruction = Self::decode_all(&mut &body[..]).map_err(|_| MalformedMessage)?;
    if let Self::AddStep { assets, .. } = &instruction {
      if assets.is_empty() {
        return Err(MalformedMessage);
      }
    }
    Ok(instruction)
  }

  pub fn pack(&self) -> Vec<u8> {
    self.encode()
  }

  pub fn pack_versioned(&self) -> Vec<u8> {
    let mut packed = Vec::from([ENVELOPE_TAG, INSTRUCTION_VERSION]);
    self.encode_to(&mut packed);
    packed
  }
}
