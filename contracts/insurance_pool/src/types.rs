use fixed_point::MathError;
use soroban_sdk::{contracterror, contracttype, Address, String};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum PoolError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidAmount = 4,
    InsufficientBalance = 5,
    InsufficientAvailableCapacity = 6,
    InsufficientCapacity = 7,
    NothingToHarvest = 8,
    NotAuthorizedMinter = 9,
    DivisionByZero = 10,
    Overflow = 11,
    CollateralUnderflow = 12,
    PolicyFlowNotSet = 13,
}

impl From<MathError> for PoolError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::DivisionByZero => PoolError::DivisionByZero,
            MathError::Overflow => PoolError::Overflow,
        }
    }
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RewardStream {
    Emission = 1,
    Premium = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolConfig {
    pub admin: Address,
    pub name: String,
    pub collateral_token: Address, // staked, premiums and payouts
    pub emission_token: Address,   // minted as liquidity incentive
    pub policy_flow: Option<Address>,
}

/// Pool-wide totals and reward accumulators. Accumulators and `product_p` are
/// scaled by `fixed_point::SCALE`.
///
/// A depositor's stake is `shares * product_p`. Every paid claim shrinks
/// `product_p` by the fraction of capital it consumed, so losses compound
/// into every stake at once. A claim that consumes everything closes the
/// epoch: all shares of that epoch are worth nothing afterwards.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PoolState {
    pub total_staked: i128,
    pub total_shares: i128,
    pub total_locked: i128,
    pub product_p: i128,
    pub current_epoch: u32,
    pub acc_emission_per_share: i128,
    pub acc_premium_per_share: i128,
    pub last_accrual_block: u32,
    pub emission_per_block: i128,
    pub collateral_factor: i128,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Depositor {
    pub shares: i128,
    pub snapshot_epoch: u32,
    pub reward_debt_emission: i128,
    pub reward_debt_premium: i128,
    pub unclaimed_emission: i128,
    pub unclaimed_premium: i128,
}

/// Reward accumulators frozen when an epoch was wiped out.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EpochClose {
    pub acc_emission_per_share: i128,
    pub acc_premium_per_share: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolInfo {
    pub name: String,
    pub total_staked: i128,
    pub total_locked: i128,
    pub available_capacity: i128,
    pub collateral_factor: i128,
    pub emission_per_block: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PoolEvent {
    Staked,
    Unstaked,
    Harvested,
    CollateralLocked,
    CollateralReleased,
    PremiumCollected,
    ClaimPaid,
    EmissionRateUpdated,
    PolicyFlowSet,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Config,
    State,
    Depositor(Address),
    EpochClose(u32),
}
