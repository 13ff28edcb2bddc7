//! Share and reward bookkeeping for the pool.
//!
//! Depositors hold shares; a share is worth `product_p` collateral. Emission
//! (accrued per block) and premium (credited when a policy is sold) use the
//! accumulated-reward-per-share technique over shares. A paid claim scales
//! `product_p` down instead of touching individual records, so every stake
//! absorbs exactly its fraction of the loss. Every function only mutates the
//! values it is handed, so callers load state, run the ledger and persist only
//! once everything succeeded.

use fixed_point::{checked_add, checked_sub, scaled_div, scaled_mul, MathError, SCALE};

use crate::types::{Depositor, EpochClose, PoolState, RewardStream};

/// Advance the emission accumulator to `current_block`. Blocks during which
/// nobody holds shares are skipped, not carried forward.
pub fn accrue(pool: &mut PoolState, current_block: u32) -> Result<(), MathError> {
    if current_block <= pool.last_accrual_block {
        return Ok(());
    }
    if pool.total_shares == 0 || pool.emission_per_block == 0 {
        pool.last_accrual_block = current_block;
        return Ok(());
    }

    let elapsed = (current_block - pool.last_accrual_block) as i128;
    let emitted = elapsed
        .checked_mul(pool.emission_per_block)
        .ok_or(MathError::Overflow)?;
    let acc = checked_add(
        pool.acc_emission_per_share,
        scaled_div(emitted, pool.total_shares)?,
    )?;

    pool.acc_emission_per_share = acc;
    pool.last_accrual_block = current_block;
    Ok(())
}

/// Collateral the depositor can currently withdraw.
pub fn stake_of(pool: &PoolState, depositor: &Depositor) -> Result<i128, MathError> {
    if depositor.snapshot_epoch != pool.current_epoch || depositor.shares == 0 {
        return Ok(0);
    }
    scaled_mul(depositor.shares, pool.product_p)
}

/// `closed` must be the record of the depositor's epoch when that epoch has
/// ended; it is ignored otherwise.
pub fn pending_emission(
    pool: &PoolState,
    depositor: &Depositor,
    closed: Option<&EpochClose>,
) -> Result<i128, MathError> {
    let index = reward_index(pool, depositor, closed);
    let fresh = accrued_since(
        depositor.shares,
        index.acc_emission_per_share,
        depositor.reward_debt_emission,
    )?;
    checked_add(depositor.unclaimed_emission, fresh)
}

pub fn pending_premium(
    pool: &PoolState,
    depositor: &Depositor,
    closed: Option<&EpochClose>,
) -> Result<i128, MathError> {
    let index = reward_index(pool, depositor, closed);
    let fresh = accrued_since(
        depositor.shares,
        index.acc_premium_per_share,
        depositor.reward_debt_premium,
    )?;
    checked_add(depositor.unclaimed_premium, fresh)
}

/// Must run before the depositor's shares change. Parks fresh rewards in the
/// unclaimed buckets, drops shares of a wiped epoch and re-checkpoints.
pub fn settle(
    pool: &PoolState,
    depositor: &mut Depositor,
    closed: Option<&EpochClose>,
) -> Result<(), MathError> {
    let emission = pending_emission(pool, depositor, closed)?;
    let premium = pending_premium(pool, depositor, closed)?;

    depositor.unclaimed_emission = emission;
    depositor.unclaimed_premium = premium;
    if depositor.snapshot_epoch != pool.current_epoch {
        depositor.shares = 0;
        depositor.snapshot_epoch = pool.current_epoch;
    }

    checkpoint(pool, depositor)
}

/// Snapshot both accumulators against the depositor's current shares.
pub fn checkpoint(pool: &PoolState, depositor: &mut Depositor) -> Result<(), MathError> {
    let emission = scaled_mul(depositor.shares, pool.acc_emission_per_share)?;
    let premium = scaled_mul(depositor.shares, pool.acc_premium_per_share)?;

    depositor.reward_debt_emission = emission;
    depositor.reward_debt_premium = premium;
    Ok(())
}

/// Issue shares for `amount` of fresh collateral. Call after `settle`.
pub fn add_stake(
    pool: &mut PoolState,
    depositor: &mut Depositor,
    amount: i128,
) -> Result<(), MathError> {
    if pool.total_shares == 0 {
        pool.product_p = SCALE;
    }
    let minted = scaled_div(amount, pool.product_p)?;

    let shares = checked_add(depositor.shares, minted)?;
    let total_shares = checked_add(pool.total_shares, minted)?;
    let total_staked = checked_add(pool.total_staked, amount)?;

    depositor.shares = shares;
    pool.total_shares = total_shares;
    pool.total_staked = total_staked;
    checkpoint(pool, depositor)
}

/// Burn the shares backing `amount`, rounding the burn up. Call after
/// `settle` and only with `amount <= stake_of(..)`.
pub fn remove_stake(
    pool: &mut PoolState,
    depositor: &mut Depositor,
    amount: i128,
) -> Result<(), MathError> {
    let mut burned = scaled_div(amount, pool.product_p)?;
    if scaled_mul(burned, pool.product_p)? < amount {
        burned = checked_add(burned, 1)?;
    }
    if burned > depositor.shares || amount == stake_of(pool, depositor)? {
        burned = depositor.shares;
    }

    let shares = checked_sub(depositor.shares, burned)?;
    let total_shares = checked_sub(pool.total_shares, burned)?;
    let total_staked = checked_sub(pool.total_staked, amount)?;

    depositor.shares = shares;
    pool.total_shares = total_shares;
    pool.total_staked = total_staked;
    checkpoint(pool, depositor)
}

/// Empty one unclaimed bucket. Call after `settle`.
pub fn take_unclaimed(depositor: &mut Depositor, stream: RewardStream) -> i128 {
    match stream {
        RewardStream::Emission => core::mem::take(&mut depositor.unclaimed_emission),
        RewardStream::Premium => core::mem::take(&mut depositor.unclaimed_premium),
    }
}

/// Spread a collected premium over all current shares.
pub fn credit_premium(pool: &mut PoolState, amount: i128) -> Result<(), MathError> {
    let acc = checked_add(
        pool.acc_premium_per_share,
        scaled_div(amount, pool.total_shares)?,
    )?;
    pool.acc_premium_per_share = acc;
    Ok(())
}

/// Take a paid claim out of the depositors' capital.
///
/// Returns the ended epoch and its frozen accumulators when the loss left
/// the shares worthless; the caller must store them.
pub fn book_loss(
    pool: &mut PoolState,
    amount: i128,
) -> Result<Option<(u32, EpochClose)>, MathError> {
    let remaining = checked_sub(pool.total_staked, amount)?;
    if remaining < 0 {
        return Err(MathError::Overflow);
    }
    let ratio = scaled_div(remaining, pool.total_staked)?;
    let product_p = scaled_mul(pool.product_p, ratio)?;

    pool.total_staked = remaining;
    if product_p > 0 {
        pool.product_p = product_p;
        return Ok(None);
    }

    let ended = pool.current_epoch;
    let close = EpochClose {
        acc_emission_per_share: pool.acc_emission_per_share,
        acc_premium_per_share: pool.acc_premium_per_share,
    };
    pool.current_epoch = ended.checked_add(1).ok_or(MathError::Overflow)?;
    pool.total_shares = 0;
    pool.product_p = SCALE;
    Ok(Some((ended, close)))
}

pub fn available_capacity(pool: &PoolState) -> i128 {
    (pool.total_staked - pool.total_locked).max(0)
}

/// Leftover dust without shares behind it cannot back new policies, since
/// their premiums would have no one to go to.
pub fn can_underwrite(pool: &PoolState, payoff: i128) -> bool {
    if pool.total_shares == 0 {
        return false;
    }
    match pool.total_locked.checked_add(payoff) {
        Some(locked) => locked <= pool.total_staked,
        None => false,
    }
}

pub fn collateral_factor(pool: &PoolState) -> Result<i128, MathError> {
    if pool.total_staked == 0 {
        return Ok(0);
    }
    scaled_div(pool.total_locked, pool.total_staked)
}

fn reward_index(
    pool: &PoolState,
    depositor: &Depositor,
    closed: Option<&EpochClose>,
) -> EpochClose {
    if depositor.snapshot_epoch == pool.current_epoch {
        return EpochClose {
            acc_emission_per_share: pool.acc_emission_per_share,
            acc_premium_per_share: pool.acc_premium_per_share,
        };
    }
    closed.cloned().unwrap_or_default()
}

fn accrued_since(shares: i128, acc_per_share: i128, debt: i128) -> Result<i128, MathError> {
    let gross = scaled_mul(shares, acc_per_share)?;
    Ok(checked_sub(gross, debt)?.max(0))
}
