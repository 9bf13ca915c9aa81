//! Trade Loops Pallet
//!
//! Settles closed cycles of NFT transfers between two or more parties in one
//! indivisible action. Nobody in a loop trades directly with anyone else:
//! each participant hands their pledged assets to the next one, and the last
//! one pays the first.
//!
//! Lifecycle of a loop:
//! 1. The creator opens a record at an address derived from a trade id and
//!    their own account, reserving a fixed number of steps and paying a
//!    deposit into the pallet account.
//! 2. Every participant registers their outgoing step. Filling the last slot
//!    validates the cycle.
//! 3. Every participant approves their step. Approval cannot be withdrawn.
//! 4. Anyone executes single steps or the whole loop. A step is marked
//!    executed and persisted before any of its assets move, so a transfer
//!    that calls back into the pallet finds the step already executed.
//!
//! A loop can be cancelled by one of its participants only while nobody has
//! approved. A process-wide config holds the pause switch and the accounts
//! allowed to change it.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod adapters;
pub use adapters::{Holding, NftLedger, NonfungiblesAdapter};

pub mod derivation;
pub mod instruction;
pub mod types;
pub use types::*;
pub mod validation;

pub mod weights;
pub use weights::WeightInfo;

#[cfg(test)]
mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub const LOG_TARGET: &str = "runtime::trade-loops";

/// Helper for benchmarking
#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId, AssetId> {
  /// Asset number `seed`; distinct seeds give distinct assets
  fn asset(seed: u32) -> AssetId;
  /// Makes `who` the exclusive holder of `asset`
  fn mint_to(who: &AccountId, asset: &AssetId) -> frame::deps::sp_runtime::DispatchResult;
}

impl<T> From<validation::LoopError> for Error<T> {
  fn from(error: validation::LoopError) -> Self {
    use validation::LoopError;
    match error {
      LoopError::EmptyAssets => Error::<T>::EmptyAssetList,
      LoopError::DuplicateAsset => Error::<T>::DuplicateAsset,
      LoopError::NotClosed | LoopError::TooFewParticipants => Error::<T>::LoopNotClosed,
    }
  }
}

impl<T> From<instruction::MalformedMessage> for Error<T> {
  fn from(_: instruction::MalformedMessage) -> Self {
    Error::<T>::MalformedMessage
  }
}

#[frame::pallet]
pub mod pallet {
  use super::{
    derivation, instruction::TradeInstruction, validation, AssetListOf, BalanceOf, Holding,
    NftLedger, ProgramConfig, StepSlotsOf, TradeLoop, TradeStep, WeightInfo, LOG_TARGET,
  };
  use alloc::vec::Vec;
  use frame::deps::{
    frame_support::traits::{
      fungible::{Inspect as NativeInspect, Mutate as NativeMutate},
      tokens::{Fortitude, Precision, Preservation},
      UnixTime,
    },
    sp_runtime::traits::{AccountIdConversion, Saturating, Zero},
  };
  use frame::prelude::*;
  use primitives::{params::PROGRAM_VERSION, DepositPolicy, LoopAddress, StepStatus, TradeId};

  /// Instruction shape accepted by `submit_instruction`.
  pub type InstructionOf<T> = TradeInstruction<
    <T as frame_system::Config>::AccountId,
    <T as Config>::AssetId,
    <T as frame_system::Config>::Hash,
    <T as Config>::MaxAssetsPerStep,
  >;

  #[pallet::config]
  pub trait Config: frame_system::Config<RuntimeEvent: From<Event<Self>>> {
    /// Identifier of a single NFT
    type AssetId: Parameter + Member + Ord + MaxEncodedLen;

    /// Ownership queries and transfers of the traded NFTs
    type Nfts: NftLedger<Self::AccountId, Self::AssetId>;

    /// Native currency the loop deposit is paid in
    type Currency: NativeInspect<Self::AccountId> + NativeMutate<Self::AccountId>;

    /// Wall clock used for loop expiry
    type TimeProvider: UnixTime;

    /// Origin allowed to initialize the config. Its account becomes the authority.
    type ConfigOrigin: EnsureOrigin<Self::RuntimeOrigin, Success = Self::AccountId>;

    /// Pallet account holding loop deposits
    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// Maximum steps in one loop
    #[pallet::constant]
    type MaxParticipants: Get<u32>;

    /// Maximum assets one step may move
    #[pallet::constant]
    type MaxAssetsPerStep: Get<u32>;

    /// Longest loop lifetime, in seconds
    #[pallet::constant]
    type MaxTimeout: Get<u64>;

    /// Longest payload `submit_instruction` accepts
    #[pallet::constant]
    type MaxInstructionLen: Get<u32>;

    /// Flat part of the deposit paid when a loop is opened
    #[pallet::constant]
    type LoopDepositBase: Get<BalanceOf<Self>>;

    /// Deposit paid per reserved step
    #[pallet::constant]
    type StepDeposit: Get<BalanceOf<Self>>;

    /// Fate of the deposit when a loop is cancelled
    #[pallet::constant]
    type CancellationPolicy: Get<DepositPolicy>;

    /// Weight information for extrinsics
    type WeightInfo: WeightInfo;

    /// Helper for benchmarking
    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::BenchmarkHelper<Self::AccountId, Self::AssetId>;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(PhantomData<T>);

  /// Trade loops keyed by their derived address
  #[pallet::storage]
  pub type Loops<T: Config> =
    StorageMap<_, Blake2_128Concat, LoopAddress, TradeLoop<T>, OptionQuery>;

  /// Engine config. Absent until initialized, and an absent config never pauses.
  #[pallet::storage]
  pub type GlobalConfig<T: Config> = StorageValue<_, ProgramConfig<T::AccountId>, OptionQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// A loop was opened with `step_count` empty slots
    LoopInitialized {
      address: LoopAddress,
      trade_id: TradeId,
      creator: T::AccountId,
      step_count: u8,
      expires_at: u64,
      deposit: BalanceOf<T>,
    },
    /// A participant registered (or replaced) their step
    StepAdded {
      address: LoopAddress,
      step_index: u8,
      from: T::AccountId,
      to: T::AccountId,
    },
    /// Every slot is filled and the steps form a closed cycle
    LoopClosed { address: LoopAddress },
    StepApproved {
      address: LoopAddress,
      step_index: u8,
      who: T::AccountId,
    },
    StepExecuted {
      address: LoopAddress,
      step_index: u8,
      from: T::AccountId,
      to: T::AccountId,
    },
    /// Every step of the loop is executed
    LoopExecuted { address: LoopAddress },
    LoopCancelled {
      address: LoopAddress,
      by: T::AccountId,
      deposit: BalanceOf<T>,
      policy: DepositPolicy,
    },
    ConfigInitialized {
      authority: T::AccountId,
      governance: Option<T::AccountId>,
    },
    ConfigUpdated {
      authority: T::AccountId,
      governance: Option<T::AccountId>,
      paused: bool,
    },
    ProgramUpgraded {
      old_version: u32,
      new_version: u32,
      code_hash: T::Hash,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Instruction bytes could not be decoded
    MalformedMessage,
    /// Step count is zero or above `MaxParticipants`
    InvalidStepCount,
    /// Timeout is above `MaxTimeout`
    InvalidTimeout,
    /// A loop already lives at the derived address
    AddressCollision,
    LoopNotFound,
    /// Step index is outside the loop's capacity
    InvalidStepIndex,
    EmptyAssetList,
    /// An asset is listed twice in a step, or pledged by two steps
    DuplicateAsset,
    /// The sender does not hold a pledged asset
    NotAssetOwner,
    /// The sender holds a pledged asset but cannot move it freely
    AssetLocked,
    InsufficientAssetBalance,
    /// The steps do not form one closed cycle of at least two participants
    LoopNotClosed,
    /// Some slots are still empty
    IncompleteLoop,
    /// No step registered at this index
    StepNotFound,
    /// Caller is not the sender of this step
    NotStepOwner,
    /// The step is approved and can no longer be replaced
    StepAlreadyApproved,
    StepAlreadyExecuted,
    StepNotApproved,
    /// Supplied sender or receiver differs from the recorded step
    ParticipantMismatch,
    /// Not every step is approved
    MissingApprovals,
    /// A participant has committed, so steps can no longer change
    LoopLocked,
    /// Caller is not the sender of any step
    NotParticipant,
    /// Someone has already committed to the loop
    CancellationDenied,
    ProgramPaused,
    /// Caller is neither the config authority nor governance
    NotAuthorized,
    TradeLoopExpired,
    ConfigAlreadyInitialized,
    ConfigNotInitialized,
    /// New version must be greater than the current one
    InvalidProgramVersion,
    /// Expiry does not fit in a u64 timestamp
    TimestampOverflow,
  }

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    #[cfg(feature = "try-runtime")]
    fn try_state(_n: BlockNumberFor<T>) -> Result<(), frame::deps::sp_runtime::TryRuntimeError> {
      Self::do_try_state()
    }
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Open a loop with `step_count` empty steps, paying its deposit.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::initialize_loop())]
    pub fn initialize_loop(
      origin: OriginFor<T>,
      trade_id: TradeId,
      step_count: u8,
      timeout_seconds: u64,
    ) -> DispatchResult {
      let creator = ensure_signed(origin)?;
      Self::do_initialize_loop(creator, trade_id, step_count, timeout_seconds)
    }

    /// Register the caller's outgoing step at `step_index`.
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::add_step())]
    pub fn add_step(
      origin: OriginFor<T>,
      address: LoopAddress,
      step_index: u8,
      to: T::AccountId,
      assets: AssetListOf<T>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::do_add_step(who, address, step_index, to, assets)
    }

    /// Irrevocably commit to the caller's step.
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::approve_step())]
    pub fn approve_step(
      origin: OriginFor<T>,
      address: LoopAddress,
      step_index: u8,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::do_approve_step(who, address, step_index)
    }

    /// Execute one approved step. Any signed account may call this.
    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::execute_step())]
    pub fn execute_step(
      origin: OriginFor<T>,
      address: LoopAddress,
      step_index: u8,
      from: T::AccountId,
      to: T::AccountId,
    ) -> DispatchResult {
      let _caller = ensure_signed(origin)?;
      Self::do_execute_step(address, step_index, from, to)
    }

    /// Execute every step of a fully approved loop.
    #[pallet::call_index(4)]
    #[pallet::weight(T::WeightInfo::execute_full_loop())]
    pub fn execute_full_loop(origin: OriginFor<T>, address: LoopAddress) -> DispatchResult {
      let _caller = ensure_signed(origin)?;
      Self::do_execute_full_loop(address)
    }

    /// Destroy a loop nobody has committed to yet.
    #[pallet::call_index(5)]
    #[pallet::weight(T::WeightInfo::cancel_loop())]
    pub fn cancel_loop(origin: OriginFor<T>, address: LoopAddress) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::do_cancel_loop(who, address)
    }

    #[pallet::call_index(6)]
    #[pallet::weight(T::WeightInfo::initialize_config())]
    pub fn initialize_config(
      origin: OriginFor<T>,
      governance: Option<T::AccountId>,
    ) -> DispatchResult {
      let authority = T::ConfigOrigin::ensure_origin(origin)?;
      ensure!(
        !GlobalConfig::<T>::exists(),
        Error::<T>::ConfigAlreadyInitialized
      );
      GlobalConfig::<T>::put(ProgramConfig {
        version: PROGRAM_VERSION,
        authority: authority.clone(),
        governance: governance.clone(),
        paused: false,
      });
      Self::deposit_event(Event::ConfigInitialized {
        authority,
        governance,
      });
      Ok(())
    }

    /// Replace any of authority, governance or pause state. `None` keeps a field.
    #[pallet::call_index(7)]
    #[pallet::weight(T::WeightInfo::update_config())]
    pub fn update_config(
      origin: OriginFor<T>,
      new_authority: Option<T::AccountId>,
      new_governance: Option<T::AccountId>,
      new_paused: Option<bool>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      GlobalConfig::<T>::try_mutate(|maybe_config| -> DispatchResult {
        let config = maybe_config
          .as_mut()
          .ok_or(Error::<T>::ConfigNotInitialized)?;
        ensure!(config.is_admin(&who), Error::<T>::NotAuthorized);
        if let Some(authority) = new_authority {
          config.authority = authority;
        }
        if let Some(governance) = new_governance {
          config.governance = Some(governance);
        }
        if let Some(paused) = new_paused {
          config.paused = paused;
        }
        log::debug!(
          target: LOG_TARGET,
          "config updated by {:?}, paused: {}",
          who,
          config.paused
        );
        Self::deposit_event(Event::ConfigUpdated {
          authority: config.authority.clone(),
          governance: config.governance.clone(),
          paused: config.paused,
        });
        Ok(())
      })
    }

    /// Bump the engine version and authorize the runtime code with `code_hash`.
    #[pallet::call_index(8)]
    #[pallet::weight(T::WeightInfo::upgrade_program())]
    pub fn upgrade_program(
      origin: OriginFor<T>,
      new_version: u32,
      code_hash: T::Hash,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      GlobalConfig::<T>::try_mutate(|maybe_config| -> DispatchResult {
        let config = maybe_config
          .as_mut()
          .ok_or(Error::<T>::ConfigNotInitialized)?;
        ensure!(config.is_admin(&who), Error::<T>::NotAuthorized);
        ensure!(
          new_version > config.version,
          Error::<T>::InvalidProgramVersion
        );
        let old_version = config.version;
        config.version = new_version;
        frame_system::Pallet::<T>::do_authorize_upgrade(code_hash, true);
        Self::deposit_event(Event::ProgramUpgraded {
          old_version,
          new_version,
          code_hash,
        });
        Ok(())
      })
    }

    /// Decode an encoded instruction and run it with the caller's origin.
    ///
    /// Charged up front for the heaviest instruction. On success the actual
    /// weight is the decoding overhead plus the routed call's weight.
    #[pallet::call_index(9)]
    #[pallet::weight(T::WeightInfo::submit_instruction())]
    pub fn submit_instruction(
      origin: OriginFor<T>,
      payload: BoundedVec<u8, T::MaxInstructionLen>,
    ) -> DispatchResultWithPostInfo {
      let instruction = InstructionOf::<T>::unpack(&payload).map_err(Error::<T>::from)?;
      let actual_weight = Self::instruction_weight(&instruction);
      Self::dispatch_instruction(origin, instruction)?;
      Ok(Some(actual_weight).into())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Account holding every live loop deposit.
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    /// Storage address of the loop `creator` opens under `trade_id`.
    pub fn loop_address(trade_id: &TradeId, creator: &T::AccountId) -> LoopAddress {
      derivation::derive_loop_address(trade_id, creator).0
    }

    pub fn loop_deposit(step_count: u8) -> BalanceOf<T> {
      let per_step = T::StepDeposit::get().saturating_mul(u32::from(step_count).into());
      T::LoopDepositBase::get().saturating_add(per_step)
    }

    fn now() -> u64 {
      T::TimeProvider::now().as_secs()
    }

    fn ensure_active(config: &Option<ProgramConfig<T::AccountId>>) -> DispatchResult {
      let paused = config.as_ref().is_some_and(|config| config.paused);
      ensure!(!paused, Error::<T>::ProgramPaused);
      Ok(())
    }

    fn ensure_held(who: &T::AccountId, asset: &T::AssetId) -> DispatchResult {
      match T::Nfts::holding(who, asset) {
        Holding::Held => Ok(()),
        Holding::NotOwner => Err(Error::<T>::NotAssetOwner.into()),
        Holding::Locked => Err(Error::<T>::AssetLocked.into()),
        Holding::Insufficient => Err(Error::<T>::InsufficientAssetBalance.into()),
      }
    }

    /// Full and closed, checked from scratch.
    fn ensure_closed(trade_loop: &TradeLoop<T>) -> DispatchResult {
      let legs = trade_loop.legs().ok_or(Error::<T>::IncompleteLoop)?;
      validation::validate_loop(&legs).map_err(Error::<T>::from)?;
      Ok(())
    }

    fn load_live(address: &LoopAddress) -> Result<TradeLoop<T>, DispatchError> {
      let trade_loop = Loops::<T>::get(address).ok_or(Error::<T>::LoopNotFound)?;
      if trade_loop.is_expired(Self::now()) {
        log::warn!(
          target: LOG_TARGET,
          "loop {:?} expired at {}",
          address,
          trade_loop.expires_at
        );
        return Err(Error::<T>::TradeLoopExpired.into());
      }
      Ok(trade_loop)
    }

    pub fn do_initialize_loop(
      creator: T::AccountId,
      trade_id: TradeId,
      step_count: u8,
      timeout_seconds: u64,
    ) -> DispatchResult {
      Self::ensure_active(&GlobalConfig::<T>::get())?;
      ensure!(
        step_count > 0 && u32::from(step_count) <= T::MaxParticipants::get(),
        Error::<T>::InvalidStepCount
      );
      ensure!(
        timeout_seconds <= T::MaxTimeout::get(),
        Error::<T>::InvalidTimeout
      );

      let (address, bump) = derivation::derive_loop_address(&trade_id, &creator);
      ensure!(
        !Loops::<T>::contains_key(address),
        Error::<T>::AddressCollision
      );

      let created_at = Self::now();
      let expires_at = created_at
        .checked_add(timeout_seconds)
        .ok_or(Error::<T>::TimestampOverflow)?;
      let steps: StepSlotsOf<T> = alloc::vec![None; step_count as usize]
        .try_into()
        .map_err(|_| Error::<T>::InvalidStepCount)?;

      let deposit = Self::loop_deposit(step_count);
      if !deposit.is_zero() {
        T::Currency::transfer(
          &creator,
          &Self::account_id(),
          deposit,
          Preservation::Preserve,
        )?;
      }

      Loops::<T>::insert(
        address,
        TradeLoop {
          trade_id,
          created_at,
          expires_at,
          authority: creator.clone(),
          deposit,
          bump,
          steps,
        },
      );
      log::debug!(
        target: LOG_TARGET,
        "loop {:?} opened by {:?} with {} steps, expires at {}",
        address,
        creator,
        step_count,
        expires_at
      );
      Self::deposit_event(Event::LoopInitialized {
        address,
        trade_id,
        creator,
        step_count,
        expires_at,
        deposit,
      });
      Ok(())
    }

    pub fn do_add_step(
      who: T::AccountId,
      address: LoopAddress,
      step_index: u8,
      to: T::AccountId,
      assets: AssetListOf<T>,
    ) -> DispatchResult {
      Self::ensure_active(&GlobalConfig::<T>::get())?;
      let mut trade_loop = Loops::<T>::get(address).ok_or(Error::<T>::LoopNotFound)?;
      ensure!(
        usize::from(step_index) < trade_loop.capacity(),
        Error::<T>::InvalidStepIndex
      );
      validation::check_assets(&assets).map_err(Error::<T>::from)?;
      if let Some(existing) = trade_loop.step(step_index) {
        ensure!(existing.from == who, Error::<T>::NotStepOwner);
        ensure!(
          existing.status == StepStatus::Created,
          Error::<T>::StepAlreadyApproved
        );
      }
      ensure!(!trade_loop.any_committed(), Error::<T>::LoopLocked);
      for asset in assets.iter() {
        Self::ensure_held(&who, asset)?;
      }

      let slot = trade_loop
        .steps
        .get_mut(usize::from(step_index))
        .ok_or(Error::<T>::InvalidStepIndex)?;
      *slot = Some(TradeStep {
        from: who.clone(),
        to: to.clone(),
        assets,
        status: StepStatus::Created,
      });

      // Completing the loop commits only a valid cycle
      let closed = trade_loop.is_full();
      if closed {
        Self::ensure_closed(&trade_loop)?;
      }

      Loops::<T>::insert(address, trade_loop);
      Self::deposit_event(Event::StepAdded {
        address,
        step_index,
        from: who,
        to,
      });
      if closed {
        log::debug!(target: LOG_TARGET, "loop {:?} closed", address);
        Self::deposit_event(Event::LoopClosed { address });
      }
      Ok(())
    }

    pub fn do_approve_step(
      who: T::AccountId,
      address: LoopAddress,
      step_index: u8,
    ) -> DispatchResult {
      Self::ensure_active(&GlobalConfig::<T>::get())?;
      let mut trade_loop = Self::load_live(&address)?;
      ensure!(
        usize::from(step_index) < trade_loop.capacity(),
        Error::<T>::InvalidStepIndex
      );
      let step = trade_loop
        .step(step_index)
        .ok_or(Error::<T>::StepNotFound)?;
      ensure!(step.from == who, Error::<T>::NotStepOwner);
      match step.status {
        // Retried approvals succeed without changing anything
        StepStatus::Approved => return Ok(()),
        StepStatus::Executed => return Err(Error::<T>::StepAlreadyExecuted.into()),
        StepStatus::Created => {}
      }
      Self::ensure_closed(&trade_loop)?;

      ensure!(
        trade_loop.advance_step(step_index, StepStatus::Approved),
        Error::<T>::StepAlreadyApproved
      );
      Loops::<T>::insert(address, trade_loop);
      log::debug!(
        target: LOG_TARGET,
        "step {} of loop {:?} approved by {:?}",
        step_index,
        address,
        who
      );
      Self::deposit_event(Event::StepApproved {
        address,
        step_index,
        who,
      });
      Ok(())
    }

    pub fn do_execute_step(
      address: LoopAddress,
      step_index: u8,
      from: T::AccountId,
      to: T::AccountId,
    ) -> DispatchResult {
      Self::ensure_active(&GlobalConfig::<T>::get())?;
      let mut trade_loop = Self::load_live(&address)?;
      ensure!(
        usize::from(step_index) < trade_loop.capacity(),
        Error::<T>::InvalidStepIndex
      );
      let step = trade_loop
        .step(step_index)
        .cloned()
        .ok_or(Error::<T>::StepNotFound)?;
      if step.status == StepStatus::Executed {
        log::warn!(
          target: LOG_TARGET,
          "rejected repeated execution of step {} in loop {:?}",
          step_index,
          address
        );
        return Err(Error::<T>::StepAlreadyExecuted.into());
      }
      ensure!(
        step.status == StepStatus::Approved,
        Error::<T>::StepNotApproved
      );
      ensure!(
        step.from == from && step.to == to,
        Error::<T>::ParticipantMismatch
      );
      for asset in step.assets.iter() {
        Self::ensure_held(&step.from, asset)?;
      }

      // The status flip must be in storage before any transfer can re-enter
      ensure!(
        trade_loop.advance_step(step_index, StepStatus::Executed),
        Error::<T>::StepNotApproved
      );
      let all_executed = trade_loop.all_with_status(StepStatus::Executed);
      Loops::<T>::insert(address, trade_loop);

      Self::transfer_step(&step)?;
      Self::deposit_event(Event::StepExecuted {
        address,
        step_index,
        from: step.from,
        to: step.to,
      });
      if all_executed {
        Self::deposit_event(Event::LoopExecuted { address });
      }
      Ok(())
    }

    pub fn do_execute_full_loop(address: LoopAddress) -> DispatchResult {
      Self::ensure_active(&GlobalConfig::<T>::get())?;
      let mut trade_loop = Self::load_live(&address)?;
      Self::ensure_closed(&trade_loop)?;
      if trade_loop
        .filled()
        .any(|step| step.status == StepStatus::Executed)
      {
        log::warn!(
          target: LOG_TARGET,
          "rejected full execution of partly executed loop {:?}",
          address
        );
        return Err(Error::<T>::StepAlreadyExecuted.into());
      }
      ensure!(
        trade_loop.all_with_status(StepStatus::Approved),
        Error::<T>::MissingApprovals
      );
      for step in trade_loop.filled() {
        for asset in step.assets.iter() {
          Self::ensure_held(&step.from, asset)?;
        }
      }

      let steps: Vec<TradeStep<T>> = trade_loop.filled().cloned().collect();
      // Every step is flipped and stored before the first transfer
      for index in 0..steps.len() {
        ensure!(
          trade_loop.advance_step(index as u8, StepStatus::Executed),
          Error::<T>::MissingApprovals
        );
      }
      Loops::<T>::insert(address, trade_loop);

      for (index, step) in steps.into_iter().enumerate() {
        Self::transfer_step(&step)?;
        Self::deposit_event(Event::StepExecuted {
          address,
          step_index: index as u8,
          from: step.from,
          to: step.to,
        });
      }
      log::debug!(target: LOG_TARGET, "loop {:?} executed", address);
      Self::deposit_event(Event::LoopExecuted { address });
      Ok(())
    }

    fn transfer_step(step: &TradeStep<T>) -> DispatchResult {
      for asset in step.assets.iter() {
        T::Nfts::ensure_holding(&step.to, asset)?;
        T::Nfts::transfer(&step.from, &step.to, asset)?;
      }
      Ok(())
    }

    pub fn do_cancel_loop(who: T::AccountId, address: LoopAddress) -> DispatchResult {
      Self::ensure_active(&GlobalConfig::<T>::get())?;
      let trade_loop = Loops::<T>::get(address).ok_or(Error::<T>::LoopNotFound)?;
      ensure!(
        trade_loop.is_participant(&who),
        Error::<T>::NotParticipant
      );
      let own_steps_open = trade_loop
        .filled()
        .filter(|step| step.from == who)
        .all(|step| step.status == StepStatus::Created);
      ensure!(
        own_steps_open && !trade_loop.any_committed(),
        Error::<T>::CancellationDenied
      );

      let policy = T::CancellationPolicy::get();
      Self::settle_deposit(&trade_loop, policy)?;
      Loops::<T>::remove(address);
      log::debug!(
        target: LOG_TARGET,
        "loop {:?} cancelled by {:?}, deposit {:?}",
        address,
        who,
        policy
      );
      Self::deposit_event(Event::LoopCancelled {
        address,
        by: who,
        deposit: trade_loop.deposit,
        policy,
      });
      Ok(())
    }

    fn settle_deposit(trade_loop: &TradeLoop<T>, policy: DepositPolicy) -> DispatchResult {
      if trade_loop.deposit.is_zero() {
        return Ok(());
      }
      let escrow = Self::account_id();
      match policy {
        DepositPolicy::Release => {
          T::Currency::transfer(
            &escrow,
            &trade_loop.authority,
            trade_loop.deposit,
            Preservation::Expendable,
          )?;
        }
        DepositPolicy::Forfeit => {
          T::Currency::burn_from(
            &escrow,
            trade_loop.deposit,
            Preservation::Expendable,
            Precision::Exact,
            Fortitude::Force,
          )?;
        }
      }
      Ok(())
    }

    /// Weight `submit_instruction` consumes when it runs `instruction`.
    pub fn instruction_weight(instruction: &InstructionOf<T>) -> Weight {
      let routed = match instruction {
        TradeInstruction::InitializeLoop { .. } => T::WeightInfo::initialize_loop(),
        TradeInstruction::AddStep { .. } => T::WeightInfo::add_step(),
        TradeInstruction::ApproveStep { .. } => T::WeightInfo::approve_step(),
        TradeInstruction::ExecuteStep { .. } => T::WeightInfo::execute_step(),
        TradeInstruction::ExecuteFullLoop { .. } => T::WeightInfo::execute_full_loop(),
        TradeInstruction::CancelLoop { .. } => T::WeightInfo::cancel_loop(),
        TradeInstruction::InitializeConfig { .. } => T::WeightInfo::initialize_config(),
        TradeInstruction::UpdateConfig { .. } => T::WeightInfo::update_config(),
        TradeInstruction::UpgradeProgram { .. } => T::WeightInfo::upgrade_program(),
      };
      let decoding = T::WeightInfo::submit_instruction()
        .saturating_sub(T::WeightInfo::execute_full_loop());
      decoding.saturating_add(routed)
    }

    fn dispatch_instruction(origin: OriginFor<T>, instruction: InstructionOf<T>) -> DispatchResult {
      match instruction {
        TradeInstruction::InitializeLoop {
          trade_id,
          step_count,
          timeout_seconds,
        } => Self::initialize_loop(origin, trade_id, step_count, timeout_seconds),
        TradeInstruction::AddStep {
          address,
          step_index,
          to,
          assets,
        } => Self::add_step(origin, address, step_index, to, assets),
        TradeInstruction::ApproveStep {
          address,
          step_index,
        } => Self::approve_step(origin, address, step_index),
        TradeInstruction::ExecuteStep {
          address,
          step_index,
          from,
          to,
        } => Self::execute_step(origin, address, step_index, from, to),
        TradeInstruction::ExecuteFullLoop { address } => Self::execute_full_loop(origin, address),
        TradeInstruction::CancelLoop { address } => Self::cancel_loop(origin, address),
        TradeInstruction::InitializeConfig { governance } => {
          Self::initialize_config(origin, governance)
        }
        TradeInstruction::UpdateConfig {
          new_authority,
          new_governance,
          new_paused,
        } => Self::update_config(origin, new_authority, new_governance, new_paused),
        TradeInstruction::UpgradeProgram {
          new_version,
          code_hash,
        } => Self::upgrade_program(origin, new_version, code_hash),
      }
    }

    /// Storage invariants: every record sits at the address its own trade id,
    /// creator and bump derive, and every full record is a closed cycle.
    #[cfg(any(test, feature = "try-runtime"))]
    pub fn do_try_state() -> Result<(), DispatchError> {
      for (address, trade_loop) in Loops::<T>::iter() {
        ensure!(
          derivation::verify_loop_address(
            &address,
            &trade_loop.trade_id,
            &trade_loop.authority,
            trade_loop.bump
          ),
          "loop stored under a foreign address"
        );
        ensure!(
          trade_loop.capacity() > 0
            && trade_loop.capacity() <= T::MaxParticipants::get() as usize,
          "loop capacity out of bounds"
        );
        if trade_loop.is_full() {
          Self::ensure_closed(&trade_loop)?;
        } else {
          ensure!(
            !trade_loop.any_committed(),
            "incomplete loop with committed steps"
          );
        }
      }
      Ok(())
    }
  }

  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    /// Initial config authority. No config is written when `None`.
    pub authority: Option<T::AccountId>,
    pub governance: Option<T::AccountId>,
    pub paused: bool,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      // Deposit escrow survives being drained to zero
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());
      if let Some(authority) = &self.authority {
        GlobalConfig::<T>::put(ProgramConfig {
          version: PROGRAM_VERSION,
          authority: authority.clone(),
          governance: self.governance.clone(),
          paused: self.paused,
        });
      }
    }
  }
}
