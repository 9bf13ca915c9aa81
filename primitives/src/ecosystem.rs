//! Ecosystem constants for the trade-loop engine.
//!
//! Limits and identifiers shared between the pallet and any runtime that
//! configures it.

/// Pallet identifiers for deriving pallet-owned accounts.
pub mod pallet_ids {
  /// Trade loops pallet ID, owns creator deposits while a loop is live
  pub const TRADE_LOOPS_PALLET_ID: &[u8; 8] = b"py/trdlp";
}

/// Engine parameters.
pub mod params {
  /// Maximum number of legs (and therefore participants) in one loop.
  pub const MAX_PARTICIPANTS: u32 = 11;

  /// Maximum number of assets a single leg may move.
  pub const MAX_ASSETS_PER_STEP: u32 = 4;

  /// Longest lifetime of a loop, in seconds (30 days).
  pub const MAX_TIMEOUT_SECONDS: u64 = 30 * 24 * 60 * 60;

  /// Engine version recorded in a freshly initialized config.
  pub const PROGRAM_VERSION: u32 = 1;

  /// Upper bound on an encoded instruction accepted by `submit_instruction`.
  pub const MAX_INSTRUCTION_LEN: u32 = 512;
}

/// Namespaces for deterministic address derivation.
pub mod seeds {
  /// Prefix mixed into every trade loop address
  pub const TRADE_LOOP_SEED: &[u8] = b"trade_loop";

  /// Version byte mixed into the address and stored alongside the record
  pub const DERIVATION_VERSION: u8 = 1;
}
