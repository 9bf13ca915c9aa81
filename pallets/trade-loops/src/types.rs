use crate::{validation::Leg, Config};
use alloc::vec::Vec;
use frame::deps::frame_support::traits::fungible;
use frame::prelude::*;
use primitives::{StepStatus, TradeId};

pub type BalanceOf<T> = <<T as Config>::Currency as fungible::Inspect<
  <T as frame_system::Config>::AccountId,
>>::Balance;

pub type AssetListOf<T> = BoundedVec<<T as Config>::AssetId, <T as Config>::MaxAssetsPerStep>;

pub type StepSlotsOf<T> = BoundedVec<Option<TradeStep<T>>, <T as Config>::MaxParticipants>;

/// One leg of a loop: `from` hands `assets` to `to`.
#[derive(
  Encode,
  Decode,
  CloneNoBound,
  PartialEqNoBound,
  EqNoBound,
  RuntimeDebugNoBound,
  TypeInfo,
  MaxEncodedLen,
)]
#[scale_info(skip_type_params(T))]
#[codec(mel_bound())]
pub struct TradeStep<T: Config> {
  pub from: T::AccountId,
  pub to: T::AccountId,
  pub assets: AssetListOf<T>,
  pub status: StepStatus,
}

impl<T: Config> TradeStep<T> {
  pub fn leg(&self) -> Leg<'_, T::AccountId, T::AssetId> {
    Leg {
      from: &self.from,
      to: &self.to,
      assets: &self.assets,
    }
  }
}

/// Persistent record of one trade attempt.
///
/// `steps` is sized to the requested step count when the loop is opened and
/// never grows or shrinks; empty slots are `None` until their sender fills
/// them.
#[derive(
  Encode,
  Decode,
  CloneNoBound,
  PartialEqNoBound,
  EqNoBound,
  RuntimeDebugNoBound,
  TypeInfo,
  MaxEncodedLen,
)]
#[scale_info(skip_type_params(T))]
#[codec(mel_bound())]
pub struct TradeLoop<T: Config> {
  pub trade_id: TradeId,
  /// Unix seconds
  pub created_at: u64,
  /// Unix seconds; approval and execution fail from this instant on
  pub expires_at: u64,
  /// Creator and deposit payer. Grants no extra rights over the loop.
  pub authority: T::AccountId,
  pub deposit: BalanceOf<T>,
  pub bump: u8,
  pub steps: StepSlotsOf<T>,
}

impl<T: Config> TradeLoop<T> {
  pub fn capacity(&self) -> usize {
    self.steps.len()
  }

  pub fn is_full(&self) -> bool {
    self.steps.iter().all(Option::is_some)
  }

  pub fn is_expired(&self, now: u64) -> bool {
    now >= self.expires_at
  }

  pub fn step(&self, index: u8) -> Option<&TradeStep<T>> {
    self.steps.get(index as usize).and_then(Option::as_ref)
  }

  /// Filled steps, in index order.
  pub fn filled(&self) -> impl Iterator<Item = &TradeStep<T>> {
    self.steps.iter().flatten()
  }

  /// Legs of a full loop, `None` while any slot is empty.
  pub fn legs(&self) -> Option<Vec<Leg<'_, T::AccountId, T::AssetId>>> {
    self.steps.iter().map(|slot| slot.as_ref().map(TradeStep::leg)).collect()
  }

  /// Moves step `index` to `next`. Returns false, leaving the record
  /// untouched, when the slot is empty or the move is not a forward one.
  pub fn advance_step(&mut self, index: u8, next: StepStatus) -> bool {
    match self.steps.get_mut(index as usize) {
      Some(Some(step)) if step.status.can_advance_to(next) => {
        step.status = next;
        true
      }
      _ => false,
    }
  }

  pub fn any_committed(&self) -> bool {
    self.filled().any(|step| step.status.is_committed())
  }

  pub fn all_with_status(&self, status: StepStatus) -> bool {
    self.is_full() && self.filled().all(|step| step.status == status)
  }

  pub fn is_participant(&self, who: &T::AccountId) -> bool {
    self.filled().any(|step| step.from == *who)
  }
}

/// Process-wide engine settings.
#[derive(
  Clone,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
  MaxEncodedLen,
)]
pub struct ProgramConfig<AccountId> {
  pub version: u32,
  /// May update the config and authorize upgrades
  pub authority: AccountId,
  /// Delegate with the same rights as `authority`
  pub governance: Option<AccountId>,
  pub paused: bool,
}

impl<AccountId: PartialEq> ProgramConfig<AccountId> {
  pub fn is_admin(&self, who: &AccountId) -> bool {
    self.authority == *who || self.governance.as_ref() == Some(who)
  }
}
