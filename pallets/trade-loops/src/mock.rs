use crate as pallet_trade_loops;
use crate::{Holding, NftLedger};
use frame::prelude::*;
use polkadot_sdk::{
  frame_support::{
    construct_runtime, ord_parameter_types, storage_alias,
    traits::{ConstU32, ConstU64, ConstU128, Get, UnixTime},
    Blake2_128Concat, PalletId,
  },
  frame_system::EnsureSignedBy,
  sp_runtime::{
    traits::{BlakeTwo256, IdentityLookup},
    BuildStorage, DispatchError, TokenError,
  },
};
use primitives::{params, DepositPolicy, LoopAddress};

use alloc::{vec, vec::Vec};
use core::cell::RefCell;

type Block = polkadot_sdk::frame_system::mocking::MockBlock<Test>;
pub type AccountId = u64;
pub type Balance = u128;
pub type NftId = u32;

pub const ALICE: AccountId = 1;
pub const BOB: AccountId = 2;
pub const CAROL: AccountId = 3;
pub const DAVE: AccountId = 4;
pub const MALLORY: AccountId = 66;
pub const ADMIN: AccountId = 100;
pub const GOVERNOR: AccountId = 101;

pub const INITIAL_BALANCE: Balance = 1_000_000;
pub const DEPOSIT_BASE: Balance = 1_000;
pub const DEPOSIT_PER_STEP: Balance = 100;
/// Clock value every test starts from, in unix seconds
pub const GENESIS_TIME: u64 = 1_700_000_000;

construct_runtime!(
  pub enum Test {
    System: polkadot_sdk::frame_system,
    Balances: polkadot_sdk::pallet_balances,
    TradeLoops: pallet_trade_loops,
  }
);

impl polkadot_sdk::frame_system::Config for Test {
  type BaseCallFilter = polkadot_sdk::frame_support::traits::Everything;
  type BlockWeights = ();
  type BlockLength = ();
  type DbWeight = ();
  type RuntimeOrigin = RuntimeOrigin;
  type RuntimeCall = RuntimeCall;
  type Nonce = u64;
  type Hash = polkadot_sdk::sp_core::H256;
  type Hashing = BlakeTwo256;
  type AccountId = AccountId;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Block = Block;
  type RuntimeEvent = RuntimeEvent;
  type BlockHashCount = ConstU64<250>;
  type Version = ();
  type PalletInfo = PalletInfo;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<Balance>;
  type OnNewAccount = ();
  type OnKilledAccount = ();
  type SystemWeightInfo = ();
  type SS58Prefix = ();
  type OnSetCode = ();
  type MaxConsumers = ConstU32<16>;
  type RuntimeTask = ();
  type ExtensionsWeightInfo = ();
  type SingleBlockMigrations = ();
  type MultiBlockMigrator = ();
  type PreInherents = ();
  type PostInherents = ();
  type PostTransactions = ();
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type MaxLocks = ConstU32<50>;
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = Balance;
  type RuntimeEvent = RuntimeEvent;
  type DustRemoval = ();
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = RuntimeHoldReason;
  type RuntimeFreezeReason = RuntimeFreezeReason;
  type DoneSlashHandler = ();
}

ord_parameter_types! {
  pub const Admin: AccountId = ADMIN;
}

pub struct TradeLoopsPalletId;
impl Get<PalletId> for TradeLoopsPalletId {
  fn get() -> PalletId {
    PalletId(*primitives::pallet_ids::TRADE_LOOPS_PALLET_ID)
  }
}

thread_local! {
  static NOW: RefCell<u64> = const { RefCell::new(GENESIS_TIME) };
  static POLICY: RefCell<DepositPolicy> = const { RefCell::new(DepositPolicy::Release) };
  static FAILING_ASSET: RefCell<Option<NftId>> = const { RefCell::new(None) };
  static REENTRY: RefCell<Option<Reentry>> = const { RefCell::new(None) };
  static REENTRY_RESULTS: RefCell<Vec<DispatchResult>> = const { RefCell::new(Vec::new()) };
}

pub fn reset_mock_adapters() {
  NOW.with(|n| *n.borrow_mut() = GENESIS_TIME);
  POLICY.with(|p| *p.borrow_mut() = DepositPolicy::Release);
  FAILING_ASSET.with(|f| *f.borrow_mut() = None);
  REENTRY.with(|r| *r.borrow_mut() = None);
  REENTRY_RESULTS.with(|r| r.borrow_mut().clear());
}

pub struct MockTime;
impl UnixTime for MockTime {
  fn now() -> core::time::Duration {
    core::time::Duration::from_secs(NOW.with(|n| *n.borrow()))
  }
}

pub fn now() -> u64 {
  NOW.with(|n| *n.borrow())
}

pub fn set_now(seconds: u64) {
  NOW.with(|n| *n.borrow_mut() = seconds);
}

pub fn advance_time(seconds: u64) {
  NOW.with(|n| *n.borrow_mut() += seconds);
}

pub struct CancellationPolicy;
impl Get<DepositPolicy> for CancellationPolicy {
  fn get() -> DepositPolicy {
    POLICY.with(|p| *p.borrow())
  }
}

pub fn set_cancellation_policy(policy: DepositPolicy) {
  POLICY.with(|p| *p.borrow_mut() = policy);
}

/// One mock NFT. `amount` below one models a fractional or burnt holding.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq, TypeInfo, MaxEncodedLen)]
pub struct NftRecord {
  pub owner: AccountId,
  pub amount: u32,
  pub locked: bool,
}

// Kept in runtime storage so a failed dispatch rolls the ledger back too
#[storage_alias]
pub type NftRecords = StorageMap<MockNftStore, Blake2_128Concat, NftId, NftRecord>;

#[storage_alias]
pub type HoldingLocations =
  StorageMap<MockNftStore, Blake2_128Concat, (AccountId, NftId), bool, ValueQuery>;

#[storage_alias]
pub type TransferLog = StorageValue<MockNftStore, Vec<(AccountId, AccountId, NftId)>, ValueQuery>;

pub fn mint_nft(owner: AccountId, id: NftId) {
  NftRecords::insert(
    id,
    NftRecord {
      owner,
      amount: 1,
      locked: false,
    },
  );
}

pub fn set_nft_locked(id: NftId, locked: bool) {
  NftRecords::mutate(id, |record| {
    if let Some(record) = record {
      record.locked = locked;
    }
  });
}

pub fn set_nft_amount(id: NftId, amount: u32) {
  NftRecords::mutate(id, |record| {
    if let Some(record) = record {
      record.amount = amount;
    }
  });
}

pub fn nft_owner(id: NftId) -> Option<AccountId> {
  NftRecords::get(id).map(|record| record.owner)
}

pub fn transfer_log() -> Vec<(AccountId, AccountId, NftId)> {
  TransferLog::get()
}

pub fn fail_transfers_of(id: NftId) {
  FAILING_ASSET.with(|f| *f.borrow_mut() = Some(id));
}

/// Call the next transfer makes back into the pallet before moving anything.
#[derive(Clone, Debug)]
pub enum Reentry {
  ExecuteStep {
    address: LoopAddress,
    step_index: u8,
    from: AccountId,
    to: AccountId,
  },
  ExecuteFullLoop {
    address: LoopAddress,
  },
  CancelLoop {
    address: LoopAddress,
    who: AccountId,
  },
}

pub fn arm_reentry(reentry: Reentry) {
  REENTRY.with(|r| *r.borrow_mut() = Some(reentry));
}

pub fn reentry_results() -> Vec<DispatchResult> {
  REENTRY_RESULTS.with(|r| r.borrow().clone())
}

fn launch_reentry(reentry: Reentry) -> DispatchResult {
  match reentry {
    Reentry::ExecuteStep {
      address,
      step_index,
      from,
      to,
    } => TradeLoops::execute_step(RuntimeOrigin::signed(MALLORY), address, step_index, from, to),
    Reentry::ExecuteFullLoop { address } => {
      TradeLoops::execute_full_loop(RuntimeOrigin::signed(MALLORY), address)
    }
    Reentry::CancelLoop { address, who } => {
      TradeLoops::cancel_loop(RuntimeOrigin::signed(who), address)
    }
  }
}

/// NFT ledger whose transfer doubles as a malicious callback when armed.
pub struct MockNfts;

impl NftLedger<AccountId, NftId> for MockNfts {
  fn holding(who: &AccountId, asset: &NftId) -> Holding {
    match NftRecords::get(asset) {
      Some(record) if record.owner == *who => {
        if record.locked {
          Holding::Locked
        } else if record.amount < 1 {
          Holding::Insufficient
        } else {
          Holding::Held
        }
      }
      _ => Holding::NotOwner,
    }
  }

  fn ensure_holding(who: &AccountId, asset: &NftId) -> DispatchResult {
    HoldingLocations::insert((*who, *asset), true);
    Ok(())
  }

  fn transfer(from: &AccountId, to: &AccountId, asset: &NftId) -> DispatchResult {
    if let Some(reentry) = REENTRY.with(|r| r.borrow_mut().take()) {
      let result = launch_reentry(reentry);
      REENTRY_RESULTS.with(|r| r.borrow_mut().push(result));
    }
    if FAILING_ASSET.with(|f| *f.borrow() == Some(*asset)) {
      return Err(DispatchError::Other("mock transfer failure"));
    }
    NftRecords::try_mutate(asset, |maybe_record| -> DispatchResult {
      let record = maybe_record
        .as_mut()
        .ok_or(DispatchError::Token(TokenError::UnknownAsset))?;
      ensure!(
        record.owner == *from,
        DispatchError::Token(TokenError::FundsUnavailable)
      );
      ensure!(!record.locked, DispatchError::Token(TokenError::Frozen));
      record.owner = *to;
      Ok(())
    })?;
    TransferLog::mutate(|log| log.push((*from, *to, *asset)));
    Ok(())
  }
}

#[cfg(feature = "runtime-benchmarks")]
pub struct MockBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl crate::BenchmarkHelper<AccountId, NftId> for MockBenchmarkHelper {
  fn asset(seed: u32) -> NftId {
    seed
  }

  fn mint_to(who: &AccountId, asset: &NftId) -> DispatchResult {
    mint_nft(*who, *asset);
    Ok(())
  }
}

impl pallet_trade_loops::Config for Test {
  type AssetId = NftId;
  type Nfts = MockNfts;
  type Currency = Balances;
  type TimeProvider = MockTime;
  type ConfigOrigin = EnsureSignedBy<Admin, AccountId>;
  type PalletId = TradeLoopsPalletId;
  type MaxParticipants = ConstU32<{ params::MAX_PARTICIPANTS }>;
  type MaxAssetsPerStep = ConstU32<{ params::MAX_ASSETS_PER_STEP }>;
  type MaxTimeout = ConstU64<{ params::MAX_TIMEOUT_SECONDS }>;
  type MaxInstructionLen = ConstU32<{ params::MAX_INSTRUCTION_LEN }>;
  type LoopDepositBase = ConstU128<DEPOSIT_BASE>;
  type StepDeposit = ConstU128<DEPOSIT_PER_STEP>;
  type CancellationPolicy = CancellationPolicy;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = MockBenchmarkHelper;
}

fn build_ext(
  config: pallet_trade_loops::GenesisConfig<Test>,
) -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = polkadot_sdk::frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  polkadot_sdk::pallet_balances::GenesisConfig::<Test> {
    balances: vec![
      (ALICE, INITIAL_BALANCE),
      (BOB, INITIAL_BALANCE),
      (CAROL, INITIAL_BALANCE),
      (DAVE, INITIAL_BALANCE),
      (MALLORY, INITIAL_BALANCE),
      (ADMIN, INITIAL_BALANCE),
      (GOVERNOR, INITIAL_BALANCE),
    ],
    dev_accounts: None,
  }
  .assimilate_storage(&mut t)
  .unwrap();

  config.assimilate_storage(&mut t).unwrap();

  let mut ext = polkadot_sdk::sp_io::TestExternalities::new(t);
  ext.execute_with(|| {
    System::set_block_number(1);
    reset_mock_adapters();
  });
  ext
}

/// No engine config: nothing is paused and nobody administers the engine.
pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  build_ext(Default::default())
}

/// Config initialized at genesis with `ADMIN` as authority and `GOVERNOR` as governance.
pub fn new_test_ext_with_config() -> polkadot_sdk::sp_io::TestExternalities {
  build_ext(pallet_trade_loops::GenesisConfig {
    authority: Some(ADMIN),
    governance: Some(GOVERNOR),
    paused: false,
  })
}
