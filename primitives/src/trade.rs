use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

/// Opaque identifier chosen by the creator of a trade loop.
pub type TradeId = [u8; 32];

/// Storage key of a trade loop, derived from its trade id and creator.
pub type LoopAddress = [u8; 32];

/// Lifecycle of one leg of a trade loop.
///
/// Transitions only move forward: `Created -> Approved -> Executed`.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub enum StepStatus {
  /// Registered by its sender, still withdrawable
  #[default]
  Created,
  /// Irrevocably committed by its sender
  Approved,
  /// Assets moved to the receiver
  Executed,
}

impl StepStatus {
  /// Whether moving from `self` to `next` keeps the status monotonic.
  pub fn can_advance_to(self, next: StepStatus) -> bool {
    matches!(
      (self, next),
      (StepStatus::Created, StepStatus::Approved) | (StepStatus::Approved, StepStatus::Executed)
    )
  }

  pub fn is_committed(self) -> bool {
    !matches!(self, StepStatus::Created)
  }
}

/// What happens to the creator's allocation deposit when a loop is cancelled.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub enum DepositPolicy {
  /// Return the deposit to the creator
  #[default]
  Release,
  /// Burn the deposit
  Forfeit,
}
