#![cfg(feature = "runtime-benchmarks")]

use crate::*;
use alloc::vec::Vec;
use frame::prelude::*;
use instruction::TradeInstruction;
use polkadot_sdk::frame_benchmarking::{account, v2::*};
use polkadot_sdk::frame_support::traits::fungible::{Inspect, Mutate};
use polkadot_sdk::frame_system::RawOrigin;
use primitives::{LoopAddress, StepStatus, TradeId};

const SEED: u32 = 0;
const TRADE: TradeId = [1u8; 32];

#[benchmarks]
mod benches {
  use super::*;

  fn max_steps<T: Config>() -> u8 {
    T::MaxParticipants::get().min(u32::from(u8::MAX)) as u8
  }

  fn fund<T: Config>(who: &T::AccountId) {
    let amount = Pallet::<T>::loop_deposit(u8::MAX)
      .saturating_mul(4u32.into())
      .saturating_add(T::Currency::minimum_balance());
    T::Currency::set_balance(who, amount);
  }

  fn participants<T: Config>(count: u8) -> Vec<T::AccountId> {
    (0..u32::from(count))
      .map(|index| account("participant", index, SEED))
      .collect()
  }

  /// Every step moves the maximum number of freshly minted assets.
  fn step_assets<T: Config>(holder: &T::AccountId, index: u8) -> AssetListOf<T> {
    let per_step = T::MaxAssetsPerStep::get();
    let assets: Vec<T::AssetId> = (0..per_step)
      .map(|offset| {
        let asset = T::BenchmarkHelper::asset(u32::from(index) * per_step + offset);
        T::BenchmarkHelper::mint_to(holder, &asset).expect("Failed to mint asset");
        asset
      })
      .collect();
    BoundedVec::try_from(assets).expect("Within MaxAssetsPerStep")
  }

  fn open_loop<T: Config>(parties: &[T::AccountId]) -> LoopAddress {
    let creator = parties[0].clone();
    fund::<T>(&creator);
    Pallet::<T>::do_initialize_loop(
      creator.clone(),
      TRADE,
      parties.len() as u8,
      T::MaxTimeout::get(),
    )
    .expect("Failed to open loop");
    Pallet::<T>::loop_address(&TRADE, &creator)
  }

  fn fill_step<T: Config>(address: LoopAddress, parties: &[T::AccountId], index: u8) {
    let from = parties[index as usize].clone();
    let to = parties[(index as usize + 1) % parties.len()].clone();
    let assets = step_assets::<T>(&from, index);
    Pallet::<T>::do_add_step(from, address, index, to, assets).expect("Failed to add step");
  }

  /// Opens a loop of the maximum size and fills its first `filled` steps.
  fn loop_with_steps<T: Config>(filled: u8) -> (LoopAddress, Vec<T::AccountId>) {
    let parties = participants::<T>(max_steps::<T>());
    let address = open_loop::<T>(&parties);
    for index in 0..filled {
      fill_step::<T>(address, &parties, index);
    }
    (address, parties)
  }

  fn approved_loop<T: Config>() -> (LoopAddress, Vec<T::AccountId>) {
    let steps = max_steps::<T>();
    let (address, parties) = loop_with_steps::<T>(steps);
    for index in 0..steps {
      Pallet::<T>::do_approve_step(parties[index as usize].clone(), address, index)
        .expect("Failed to approve");
    }
    (address, parties)
  }

  fn install_config<T: Config>(authority: T::AccountId) {
    GlobalConfig::<T>::put(ProgramConfig {
      version: primitives::params::PROGRAM_VERSION,
      authority,
      governance: None,
      paused: false,
    });
  }

  #[benchmark]
  fn initialize_loop() {
    let caller: T::AccountId = whitelisted_caller();
    fund::<T>(&caller);
    let steps = max_steps::<T>();

    #[extrinsic_call]
    _(RawOrigin::Signed(caller.clone()), TRADE, steps, T::MaxTimeout::get());

    assert!(Loops::<T>::contains_key(Pallet::<T>::loop_address(&TRADE, &caller)));
  }

  // Filling the last slot runs the full cycle check
  #[benchmark]
  fn add_step() {
    let steps = max_steps::<T>();
    let last = steps - 1;
    let (address, parties) = loop_with_steps::<T>(last);
    let from = parties[last as usize].clone();
    let assets = step_assets::<T>(&from, last);

    #[extrinsic_call]
    _(RawOrigin::Signed(from), address, last, parties[0].clone(), assets);

    assert!(Loops::<T>::get(address).is_some_and(|trade_loop| trade_loop.is_full()));
  }

  #[benchmark]
  fn approve_step() {
    let steps = max_steps::<T>();
    let (address, parties) = loop_with_steps::<T>(steps);

    #[extrinsic_call]
    _(RawOrigin::Signed(parties[0].clone()), address, 0);

    let status = Loops::<T>::get(address).and_then(|l| l.step(0).map(|step| step.status));
    assert_eq!(status, Some(StepStatus::Approved));
  }

  #[benchmark]
  fn execute_step() {
    let (address, parties) = approved_loop::<T>();
    let caller: T::AccountId = whitelisted_caller();

    #[extrinsic_call]
    _(
      RawOrigin::Signed(caller),
      address,
      0,
      parties[0].clone(),
      parties[1].clone(),
    );

    let status = Loops::<T>::get(address).and_then(|l| l.step(0).map(|step| step.status));
    assert_eq!(status, Some(StepStatus::Executed));
  }

  #[benchmark]
  fn execute_full_loop() {
    let (address, _) = approved_loop::<T>();
    let caller: T::AccountId = whitelisted_caller();

    #[extrinsic_call]
    _(RawOrigin::Signed(caller), address);

    assert!(Loops::<T>::get(address)
      .is_some_and(|trade_loop| trade_loop.all_with_status(StepStatus::Executed)));
  }

  #[benchmark]
  fn cancel_loop() {
    let steps = max_steps::<T>();
    let (address, parties) = loop_with_steps::<T>(steps);

    #[extrinsic_call]
    _(RawOrigin::Signed(parties[1].clone()), address);

    assert!(!Loops::<T>::contains_key(address));
  }

  #[benchmark]
  fn initialize_config() -> Result<(), BenchmarkError> {
    let origin =
      T::ConfigOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;
    let governance: T::AccountId = account("governance", 0, SEED);

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, Some(governance));

    assert!(GlobalConfig::<T>::exists());
    Ok(())
  }

  #[benchmark]
  fn update_config() {
    let caller: T::AccountId = whitelisted_caller();
    install_config::<T>(caller.clone());
    let successor: T::AccountId = account("successor", 0, SEED);

    #[extrinsic_call]
    _(
      RawOrigin::Signed(caller),
      Some(successor.clone()),
      Some(successor),
      Some(true),
    );

    assert!(GlobalConfig::<T>::get().is_some_and(|config| config.paused));
  }

  #[benchmark]
  fn upgrade_program() {
    let caller: T::AccountId = whitelisted_caller();
    install_config::<T>(caller.clone());
    let new_version = primitives::params::PROGRAM_VERSION + 1;

    #[extrinsic_call]
    _(RawOrigin::Signed(caller), new_version, T::Hash::default());

    assert!(GlobalConfig::<T>::get().is_some_and(|config| config.version == new_version));
  }

  // The heaviest instruction a payload can carry
  #[benchmark]
  fn submit_instruction() {
    let (address, _) = approved_loop::<T>();
    let caller: T::AccountId = whitelisted_caller();
    let instruction: InstructionOf<T> = TradeInstruction::ExecuteFullLoop { address };
    let payload =
      BoundedVec::try_from(instruction.pack_versioned()).expect("Within MaxInstructionLen");

    #[extrinsic_call]
    _(RawOrigin::Signed(caller), payload);

    assert!(Loops::<T>::get(address)
      .is_some_and(|trade_loop| trade_loop.all_with_status(StepStatus::Executed)));
  }

  #[cfg(test)]
  use crate::mock::{new_test_ext, Test};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
