#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use core::marker::PhantomData;
use polkadot_sdk::frame_support::{
  traits::Get,
  weights::{constants::RocksDbWeight, Weight},
};

pub trait WeightInfo {
  fn initialize_loop() -> Weight;
  fn add_step() -> Weight;
  fn approve_step() -> Weight;
  fn execute_step() -> Weight;
  fn execute_full_loop() -> Weight;
  fn cancel_loop() -> Weight;
  fn initialize_config() -> Weight;
  fn update_config() -> Weight;
  fn upgrade_program() -> Weight;
  fn submit_instruction() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config + crate::Config> WeightInfo for SubstrateWeight<T> {
  fn initialize_loop() -> Weight {
    Weight::from_parts(30_000_000, 3600)
      .saturating_add(T::DbWeight::get().reads(3))
      .saturating_add(T::DbWeight::get().writes(3))
  }

  fn add_step() -> Weight {
    let assets = u64::from(T::MaxAssetsPerStep::get());
    Weight::from_parts(28_000_000, 4200)
      .saturating_add(Weight::from_parts(2_500_000, 0).saturating_mul(assets))
      .saturating_add(T::DbWeight::get().reads(assets.saturating_add(2)))
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn approve_step() -> Weight {
    Weight::from_parts(22_000_000, 4200)
      .saturating_add(T::DbWeight::get().reads(2))
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn execute_step() -> Weight {
    let assets = u64::from(T::MaxAssetsPerStep::get());
    Weight::from_parts(35_000_000, 4200)
      .saturating_add(Weight::from_parts(18_000_000, 1500).saturating_mul(assets))
      .saturating_add(T::DbWeight::get().reads(assets.saturating_mul(2).saturating_add(2)))
      .saturating_add(T::DbWeight::get().writes(assets.saturating_add(1)))
  }

  fn execute_full_loop() -> Weight {
    let transfers =
      u64::from(T::MaxAssetsPerStep::get()).saturating_mul(u64::from(T::MaxParticipants::get()));
    Weight::from_parts(60_000_000, 4200)
      .saturating_add(Weight::from_parts(18_000_000, 1500).saturating_mul(transfers))
      .saturating_add(T::DbWeight::get().reads(transfers.saturating_mul(2).saturating_add(2)))
      .saturating_add(T::DbWeight::get().writes(transfers.saturating_add(1)))
  }

  fn cancel_loop() -> Weight {
    Weight::from_parts(30_000_000, 4200)
      .saturating_add(T::DbWeight::get().reads(3))
      .saturating_add(T::DbWeight::get().writes(3))
  }

  fn initialize_config() -> Weight {
    Weight::from_parts(12_000_000, 1500)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn update_config() -> Weight {
    Weight::from_parts(14_000_000, 1500)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn upgrade_program() -> Weight {
    Weight::from_parts(18_000_000, 1500)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(2))
  }

  fn submit_instruction() -> Weight {
    Weight::from_parts(5_000_000, 0).saturating_add(Self::execute_full_loop())
  }
}

impl WeightInfo for () {
  fn initialize_loop() -> Weight {
    Weight::from_parts(30_000_000, 3600)
      .saturating_add(RocksDbWeight::get().reads(3))
      .saturating_add(RocksDbWeight::get().writes(3))
  }

  fn add_step() -> Weight {
    Weight::from_parts(38_000_000, 4200)
      .saturating_add(RocksDbWeight::get().reads(6))
      .saturating_add(RocksDbWeight::get().writes(1))
  }

  fn approve_step() -> Weight {
    Weight::from_parts(22_000_000, 4200)
      .saturating_add(RocksDbWeight::get().reads(2))
      .saturating_add(RocksDbWeight::get().writes(1))
  }

  fn execute_step() -> Weight {
    Weight::from_parts(107_000_000, 10200)
      .saturating_add(RocksDbWeight::get().reads(10))
      .saturating_add(RocksDbWeight::get().writes(5))
  }

  fn execute_full_loop() -> Weight {
    Weight::from_parts(852_000_000, 70200)
      .saturating_add(RocksDbWeight::get().reads(90))
      .saturating_add(RocksDbWeight::get().writes(45))
  }

  fn cancel_loop() -> Weight {
    Weight::from_parts(30_000_000, 4200)
      .saturating_add(RocksDbWeight::get().reads(3))
      .saturating_add(RocksDbWeight::get().writes(3))
  }

  fn initialize_config() -> Weight {
    Weight::from_parts(12_000_000, 1500)
      .saturating_add(RocksDbWeight::get().reads(1))
      .saturating_add(RocksDbWeight::get().writes(1))
  }

  fn update_config() -> Weight {
    Weight::from_parts(14_000_000, 1500)
      .saturating_add(RocksDbWeight::get().reads(1))
      .saturating_add(RocksDbWeight::get().writes(1))
  }

  fn upgrade_program() -> Weight {
    Weight::from_parts(18_000_000, 1500)
      .saturating_add(RocksDbWeight::get().reads(1))
      .saturating_add(RocksDbWeight::get().writes(2))
  }

  fn submit_instruction() -> Weight {
    Weight::from_parts(5_000_000, 0).saturating_add(Self::execute_full_loop())
  }
}
