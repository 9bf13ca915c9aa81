//! Cycle integrity checks for trade loops.
//!
//! Everything here is pure: the functions only look at the legs they are
//! handed and never touch storage, so the same checks run when a loop is
//! completed, approved and executed.

use alloc::collections::BTreeSet;

/// Borrowed view of one leg of a loop.
#[derive(Clone, Copy, Debug)]
pub struct Leg<'a, AccountId, AssetId> {
  pub from: &'a AccountId,
  pub to: &'a AccountId,
  pub assets: &'a [AssetId],
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoopError {
  /// A leg pledges no assets
  EmptyAssets,
  /// An asset is pledged twice, within one leg or across legs
  DuplicateAsset,
  /// Some leg's receiver is not the next leg's sender
  NotClosed,
  /// Fewer than two distinct senders
  TooFewParticipants,
}

/// Rejects empty and duplicate-bearing asset lists.
pub fn check_assets<AssetId: Ord>(assets: &[AssetId]) -> Result<(), LoopError> {
  if assets.is_empty() {
    return Err(LoopError::EmptyAssets);
  }
  let mut seen = BTreeSet::new();
  for asset in assets {
    if !seen.insert(asset) {
      return Err(LoopError::DuplicateAsset);
    }
  }
  Ok(())
}

/// Checks that `legs` form exactly one closed cycle.
///
/// `legs[i].to == legs[i + 1].from` for every `i`, wrapping around to the
/// first leg, with at least two distinct senders. No asset may appear in more
/// than one leg.
pub fn validate_loop<AccountId: Ord, AssetId: Ord>(
  legs: &[Leg<'_, AccountId, AssetId>],
) -> Result<(), LoopError> {
  let mut pledged = BTreeSet::new();
  for leg in legs {
    check_assets(leg.assets)?;
    for asset in leg.assets {
      if !pledged.insert(asset) {
        return Err(LoopError::DuplicateAsset);
      }
    }
  }

  let senders: BTreeSet<&AccountId> = legs.iter().map(|leg| leg.from).collect();
  if senders.len() < 2 {
    return Err(LoopError::TooFewParticipants);
  }

  let closed = legs
    .iter()
    .zip(legs.iter().cycle().skip(1))
    .all(|(leg, next)| leg.to == next.from);
  if !closed {
    return Err(LoopError::NotClosed);
  }
  Ok(())
}
