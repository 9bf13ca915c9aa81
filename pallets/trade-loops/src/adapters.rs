//! Asset collaborator used by the trade loops pallet.
//!
//! The pallet never touches an NFT pallet's storage: it asks `NftLedger`
//! whether a holding is valid, makes sure a destination can receive, and
//! asks it to move the asset.

use core::marker::PhantomData;
use frame::deps::frame_support::traits::tokens::nonfungibles_v2::{Inspect, Transfer};
use frame::prelude::*;

/// Outcome of a holding query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Holding {
  /// Held exclusively and transferable
  Held,
  /// Someone else holds it, or it does not exist
  NotOwner,
  /// Held, but the holder is not its sole authority (frozen or delegated)
  Locked,
  /// Held in a quantity below the committed one
  Insufficient,
}

pub trait NftLedger<AccountId, AssetId> {
  /// Side-effect free: does `who` hold at least one `asset`, exclusively?
  fn holding(who: &AccountId, asset: &AssetId) -> Holding;

  /// Prepares `who` to receive `asset`. Idempotent.
  fn ensure_holding(who: &AccountId, asset: &AssetId) -> DispatchResult;

  /// Moves `asset` from `from` to `to`. The only call that may re-enter the pallet.
  fn transfer(from: &AccountId, to: &AccountId, asset: &AssetId) -> DispatchResult;
}

/// Ledger with no assets, for configurations that never settle loops.
impl<AccountId, AssetId> NftLedger<AccountId, AssetId> for () {
  fn holding(_: &AccountId, _: &AssetId) -> Holding {
    Holding::NotOwner
  }

  fn ensure_holding(_: &AccountId, _: &AssetId) -> DispatchResult {
    Ok(())
  }

  fn transfer(_: &AccountId, _: &AccountId, _: &AssetId) -> DispatchResult {
    Err(DispatchError::Other("NftLedger not configured"))
  }
}

/// `NftLedger` over any `nonfungibles_v2` implementation such as `pallet-nfts`.
///
/// Assets are `(collection, item)` pairs. Account-based NFT pallets keep no
/// per-holder location, so `ensure_holding` has nothing to do.
pub struct NonfungiblesAdapter<Nfts>(PhantomData<Nfts>);

/// `(collection, item)` pair identifying one NFT of `Nfts`.
pub type NftOf<Nfts, AccountId> = (
  <Nfts as Inspect<AccountId>>::CollectionId,
  <Nfts as Inspect<AccountId>>::ItemId,
);

impl<AccountId, Nfts> NftLedger<AccountId, NftOf<Nfts, AccountId>> for NonfungiblesAdapter<Nfts>
where
  AccountId: PartialEq,
  Nfts: Inspect<AccountId> + Transfer<AccountId>,
{
  fn holding(who: &AccountId, asset: &NftOf<Nfts, AccountId>) -> Holding {
    let (collection, item) = asset;
    match Nfts::owner(collection, item) {
      Some(owner) if owner == *who => {
        if Nfts::can_transfer(collection, item) {
          Holding::Held
        } else {
          Holding::Locked
        }
      }
      _ => Holding::NotOwner,
    }
  }

  fn ensure_holding(_: &AccountId, _: &NftOf<Nfts, AccountId>) -> DispatchResult {
    Ok(())
  }

  fn transfer(
    _from: &AccountId,
    to: &AccountId,
    asset: &NftOf<Nfts, AccountId>,
  ) -> DispatchResult {
    let (collection, item) = asset;
    <Nfts as Transfer<AccountId>>::transfer(collection, item, to)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use alloc::collections::BTreeMap;
  use core::cell::RefCell;

  thread_local! {
    static OWNERS: RefCell<BTreeMap<(u32, u32), u64>> = RefCell::new(BTreeMap::new());
    static FROZEN: RefCell<BTreeMap<(u32, u32), bool>> = RefCell::new(BTreeMap::new());
  }

  struct MockNfts;

  impl Inspect<u64> for MockNfts {
    type ItemId = u32;
    type CollectionId = u32;

    fn owner(collection: &u32, item: &u32) -> Option<u64> {
      OWNERS.with(|o| o.borrow().get(&(*collection, *item)).copied())
    }

    fn can_transfer(collection: &u32, item: &u32) -> bool {
      !FROZEN.with(|f| f.borrow().get(&(*collection, *item)).copied().unwrap_or(false))
    }
  }

  impl Transfer<u64> for MockNfts {
    fn transfer(collection: &u32, item: &u32, destination: &u64) -> DispatchResult {
      OWNERS.with(|o| o.borrow_mut().insert((*collection, *item), *destination));
      Ok(())
    }

    fn disable_transfer(collection: &u32, item: &u32) -> DispatchResult {
      FROZEN.with(|f| f.borrow_mut().insert((*collection, *item), true));
      Ok(())
    }

    fn enable_transfer(collection: &u32, item: &u32) -> DispatchResult {
      FROZEN.with(|f| f.borrow_mut().insert((*collection, *item), false));
      Ok(())
    }
  }

  type Adapter = NonfungiblesAdapter<MockNfts>;

  fn holding(who: u64, asset: (u32, u32)) -> Holding {
    <Adapter as NftLedger<u64, (u32, u32)>>::holding(&who, &asset)
  }

  #[test]
  fn holding_reflects_owner_and_freeze_state() {
    OWNERS.with(|o| o.borrow_mut().insert((1, 1), 10));
    assert_eq!(holding(10, (1, 1)), Holding::Held);
    assert_eq!(holding(11, (1, 1)), Holding::NotOwner);
    assert_eq!(holding(10, (1, 2)), Holding::NotOwner);

    assert!(MockNfts::disable_transfer(&1, &1).is_ok());
    assert_eq!(holding(10, (1, 1)), Holding::Locked);
    assert!(MockNfts::enable_transfer(&1, &1).is_ok());
    assert_eq!(holding(10, (1, 1)), Holding::Held);
  }

  #[test]
  fn transfer_moves_ownership() {
    OWNERS.with(|o| o.borrow_mut().insert((2, 7), 10));
    assert!(<Adapter as NftLedger<u64, (u32, u32)>>::ensure_holding(&20, &(2, 7)).is_ok());
    assert!(<Adapter as NftLedger<u64, (u32, u32)>>::transfer(&10, &20, &(2, 7)).is_ok());
    assert_eq!(MockNfts::owner(&2, &7), Some(20));
    assert_eq!(holding(20, (2, 7)), Holding::Held);
    assert_eq!(holding(10, (2, 7)), Holding::NotOwner);
  }
}
