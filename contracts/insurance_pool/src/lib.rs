#![no_std]

use soroban_sdk::{contract, contractclient, contractimpl, log, token, Address, Env, String};

mod ledger;
mod storage;
mod types;

pub use types::*;

/// The slice of the reward token the pool needs for emission payouts.
#[contractclient(name = "EmissionTokenClient")]
pub trait EmissionTokenInterface {
    fn minter(env: Env) -> Address;
    fn mint(env: Env, minter: Address, to: Address, amount: i128);
}

//
// ──────────────────────────────────────────────────────────
// CONTRACT
// ──────────────────────────────────────────────────────────
//

/// Shared collateral pool backing every policy sold by the policy flow.
///
/// Depositors stake the collateral token and earn two reward streams:
/// emission tokens minted per ledger block and a share of every premium
/// collected. Paid claims are borne by all depositors in proportion to
/// their stake at the time of the claim.
#[contract]
pub struct InsurancePoolContract;

#[contractimpl]
impl InsurancePoolContract {
    /// Initialize the pool
    ///
    /// # Arguments
    /// * `admin` - Address allowed to bind the policy flow and tune emission
    /// * `name` - Human readable pool name
    /// * `collateral_token` - Token staked by depositors and paid out on claims
    /// * `emission_token` - Reward token; the pool must hold its minter role
    /// * `emission_per_block` - Emission tokens distributed per ledger block
    pub fn initialize(
        env: Env,
        admin: Address,
        name: String,
        collateral_token: Address,
        emission_token: Address,
        emission_per_block: i128,
    ) -> Result<(), PoolError> {
        if storage::has_config(&env) {
            return Err(PoolError::AlreadyInitialized);
        }
        admin.require_auth();
        if emission_per_block < 0 {
            return Err(PoolError::InvalidAmount);
        }

        let config = PoolConfig {
            admin,
            name,
            collateral_token,
            emission_token,
            policy_flow: None,
        };
        storage::set_config(&env, &config);

        let state = PoolState {
            product_p: fixed_point::SCALE,
            last_accrual_block: env.ledger().sequence(),
            emission_per_block,
            ..Default::default()
        };
        storage::set_state(&env, &state);
        Ok(())
    }

    // ───────────── ADMIN FUNCTIONS ─────────────

    /// Bind the policy flow contract, the only caller of the collateral
    /// entry points.
    pub fn set_policy_flow(env: Env, admin: Address, policy_flow: Address) -> Result<(), PoolError> {
        let mut config = storage::get_config(&env)?;
        Self::require_admin(&config, &admin)?;

        config.policy_flow = Some(policy_flow.clone());
        storage::set_config(&env, &config);

        env.events().publish((PoolEvent::PolicyFlowSet, admin), policy_flow);
        Ok(())
    }

    /// Change the emission rate. Blocks up to now are accrued at the old rate.
    pub fn set_emission_per_block(env: Env, admin: Address, amount: i128) -> Result<(), PoolError> {
        let config = storage::get_config(&env)?;
        Self::require_admin(&config, &admin)?;
        if amount < 0 {
            return Err(PoolError::InvalidAmount);
        }

        let mut state = Self::accrued_state(&env)?;
        state.emission_per_block = amount;
        Self::commit(&env, &mut state)?;

        env.events().publish((PoolEvent::EmissionRateUpdated, admin), amount);
        Ok(())
    }

    // ───────────── DEPOSITOR FUNCTIONS ─────────────

    pub fn stake(env: Env, depositor: Address, amount: i128) -> Result<(), PoolError> {
        depositor.require_auth();
        let config = storage::get_config(&env)?;
        if amount <= 0 {
            return Err(PoolError::InvalidAmount);
        }

        let mut state = Self::accrued_state(&env)?;
        let mut record = Self::settled_depositor(&env, &state, &depositor)?;
        ledger::add_stake(&mut state, &mut record, amount)?;

        Self::commit(&env, &mut state)?;
        storage::set_depositor(&env, &depositor, &record);

        let token_client = token::Client::new(&env, &config.collateral_token);
        token_client.transfer(&depositor, &env.current_contract_address(), &amount);

        env.events().publish((PoolEvent::Staked, depositor), amount);
        Ok(())
    }

    /// Withdraw part of the stake. Only collateral not locked behind active
    /// policies can leave; unharvested rewards stay claimable.
    pub fn unstake(env: Env, depositor: Address, amount: i128) -> Result<(), PoolError> {
        depositor.require_auth();
        let config = storage::get_config(&env)?;
        if amount <= 0 {
            return Err(PoolError::InvalidAmount);
        }

        let mut state = Self::accrued_state(&env)?;
        let mut record = Self::settled_depositor(&env, &state, &depositor)?;

        if amount > ledger::stake_of(&state, &record)? {
            return Err(PoolError::InsufficientBalance);
        }
        let capacity = ledger::available_capacity(&state);
        if amount > capacity {
            log!(
                &env,
                "unstake rejected: amount {} exceeds available capacity {}",
                amount,
                capacity
            );
            return Err(PoolError::InsufficientAvailableCapacity);
        }

        ledger::remove_stake(&mut state, &mut record, amount)?;

        Self::commit(&env, &mut state)?;
        storage::set_depositor(&env, &depositor, &record);

        let token_client = token::Client::new(&env, &config.collateral_token);
        token_client.transfer(&env.current_contract_address(), &depositor, &amount);

        env.events().publish((PoolEvent::Unstaked, depositor), amount);
        Ok(())
    }

    /// Pay out everything pending on one reward stream. Returns the amount.
    pub fn harvest(env: Env, depositor: Address, stream: RewardStream) -> Result<i128, PoolError> {
        depositor.require_auth();
        let config = storage::get_config(&env)?;

        let mut state = Self::accrued_state(&env)?;
        let mut record = Self::settled_depositor(&env, &state, &depositor)?;

        let amount = ledger::take_unclaimed(&mut record, stream);
        if amount == 0 {
            return Err(PoolError::NothingToHarvest);
        }

        let pool_address = env.current_contract_address();
        if stream == RewardStream::Emission {
            let emission_client = EmissionTokenClient::new(&env, &config.emission_token);
            if emission_client.minter() != pool_address {
                return Err(PoolError::NotAuthorizedMinter);
            }
        }

        Self::commit(&env, &mut state)?;
        storage::set_depositor(&env, &depositor, &record);

        match stream {
            RewardStream::Emission => {
                EmissionTokenClient::new(&env, &config.emission_token).mint(
                    &pool_address,
                    &depositor,
                    &amount,
                );
            }
            RewardStream::Premium => {
                token::Client::new(&env, &config.collateral_token).transfer(
                    &pool_address,
                    &depositor,
                    &amount,
                );
            }
        }

        env.events()
            .publish((PoolEvent::Harvested, depositor, stream), amount);
        Ok(amount)
    }

    // ───────────── POLICY FLOW FUNCTIONS ─────────────

    pub fn can_underwrite(env: Env, payoff: i128) -> Result<bool, PoolError> {
        if payoff <= 0 {
            return Err(PoolError::InvalidAmount);
        }
        let state = storage::get_state(&env);
        Ok(ledger::can_underwrite(&state, payoff))
    }

    /// Reserve `payoff` of pool capital for a newly sold policy.
    pub fn lock_collateral(env: Env, caller: Address, payoff: i128) -> Result<(), PoolError> {
        Self::require_policy_flow(&env, &caller)?;
        if payoff <= 0 {
            return Err(PoolError::InvalidAmount);
        }

        let mut state = Self::accrued_state(&env)?;
        if !ledger::can_underwrite(&state, payoff) {
            return Err(PoolError::InsufficientCapacity);
        }
        state.total_locked += payoff;
        Self::commit(&env, &mut state)?;

        env.events()
            .publish((PoolEvent::CollateralLocked, caller), payoff);
        Ok(())
    }

    /// Return the collateral of a policy that settled without a payout.
    pub fn release_collateral(env: Env, caller: Address, payoff: i128) -> Result<(), PoolError> {
        Self::require_policy_flow(&env, &caller)?;
        if payoff <= 0 {
            return Err(PoolError::InvalidAmount);
        }

        let mut state = Self::accrued_state(&env)?;
        if payoff > state.total_locked {
            return Err(PoolError::CollateralUnderflow);
        }
        state.total_locked -= payoff;
        Self::commit(&env, &mut state)?;

        env.events()
            .publish((PoolEvent::CollateralReleased, caller), payoff);
        Ok(())
    }

    /// Pull a premium from the buyer and spread it over current depositors.
    pub fn collect_premium(
        env: Env,
        caller: Address,
        buyer: Address,
        amount: i128,
    ) -> Result<(), PoolError> {
        Self::require_policy_flow(&env, &caller)?;
        let config = storage::get_config(&env)?;
        if amount <= 0 {
            return Err(PoolError::InvalidAmount);
        }

        let mut state = Self::accrued_state(&env)?;
        ledger::credit_premium(&mut state, amount)?;
        Self::commit(&env, &mut state)?;

        let token_client = token::Client::new(&env, &config.collateral_token);
        token_client.transfer(&buyer, &env.current_contract_address(), &amount);

        env.events()
            .publish((PoolEvent::PremiumCollected, buyer), amount);
        Ok(())
    }

    /// Pay a policy's payoff to its buyer out of locked collateral. The
    /// payout becomes a loss shared by all current depositors.
    pub fn pay_claim(
        env: Env,
        caller: Address,
        buyer: Address,
        payoff: i128,
    ) -> Result<(), PoolError> {
        Self::require_policy_flow(&env, &caller)?;
        let config = storage::get_config(&env)?;
        if payoff <= 0 {
            return Err(PoolError::InvalidAmount);
        }

        let mut state = Self::accrued_state(&env)?;
        if payoff > state.total_locked {
            return Err(PoolError::CollateralUnderflow);
        }
        state.total_locked -= payoff;
        if let Some((epoch, close)) = ledger::book_loss(&mut state, payoff)? {
            log!(&env, "claim of {} exhausted pool epoch {}", payoff, epoch);
            storage::set_epoch_close(&env, epoch, &close);
        }
        Self::commit(&env, &mut state)?;

        let token_client = token::Client::new(&env, &config.collateral_token);
        token_client.transfer(&env.current_contract_address(), &buyer, &payoff);

        env.events().publish((PoolEvent::ClaimPaid, buyer), payoff);
        Ok(())
    }

    // ───────────── VIEW FUNCTIONS ─────────────

    pub fn get_config(env: Env) -> Result<PoolConfig, PoolError> {
        storage::get_config(&env)
    }

    pub fn get_pool_info(env: Env) -> Result<PoolInfo, PoolError> {
        let config = storage::get_config(&env)?;
        let state = storage::get_state(&env);

        Ok(PoolInfo {
            name: config.name,
            total_staked: state.total_staked,
            total_locked: state.total_locked,
            available_capacity: ledger::available_capacity(&state),
            collateral_factor: ledger::collateral_factor(&state)?,
            emission_per_block: state.emission_per_block,
        })
    }

    pub fn get_total_staked(env: Env) -> i128 {
        storage::get_state(&env).total_staked
    }

    pub fn get_total_locked(env: Env) -> i128 {
        storage::get_state(&env).total_locked
    }

    pub fn get_available_capacity(env: Env) -> i128 {
        ledger::available_capacity(&storage::get_state(&env))
    }

    pub fn get_collateral_factor(env: Env) -> Result<i128, PoolError> {
        Ok(ledger::collateral_factor(&storage::get_state(&env))?)
    }

    /// Stake after deducting the depositor's share of paid claims.
    pub fn get_stake_amount(env: Env, user: Address) -> Result<i128, PoolError> {
        let state = storage::get_state(&env);
        let record = storage::get_depositor(&env, &user);
        Ok(ledger::stake_of(&state, &record)?)
    }

    /// Portion of the user's stake not backing active policies.
    pub fn get_unlocked_for(env: Env, user: Address) -> Result<i128, PoolError> {
        let state = storage::get_state(&env);
        let stake = Self::get_stake_amount(env, user)?;
        let factor = ledger::collateral_factor(&state)?;
        let locked = fixed_point::scaled_mul(stake, factor)?;
        Ok(stake - locked)
    }

    pub fn get_depositor(env: Env, user: Address) -> Depositor {
        storage::get_depositor(&env, &user)
    }

    pub fn pending_emission(env: Env, user: Address) -> Result<i128, PoolError> {
        let state = Self::accrued_state(&env)?;
        let record = storage::get_depositor(&env, &user);
        let closed = Self::closed_epoch(&env, &state, &record);
        Ok(ledger::pending_emission(&state, &record, closed.as_ref())?)
    }

    pub fn pending_premium(env: Env, user: Address) -> Result<i128, PoolError> {
        let state = storage::get_state(&env);
        let record = storage::get_depositor(&env, &user);
        let closed = Self::closed_epoch(&env, &state, &record);
        Ok(ledger::pending_premium(&state, &record, closed.as_ref())?)
    }

    // ───────────── INTERNAL HELPERS ─────────────

    fn require_admin(config: &PoolConfig, caller: &Address) -> Result<(), PoolError> {
        caller.require_auth();
        if *caller != config.admin {
            return Err(PoolError::Unauthorized);
        }
        Ok(())
    }

    fn require_policy_flow(env: &Env, caller: &Address) -> Result<(), PoolError> {
        caller.require_auth();
        let config = storage::get_config(env)?;
        match config.policy_flow {
            Some(ref flow) if flow == caller => Ok(()),
            Some(_) => Err(PoolError::Unauthorized),
            None => Err(PoolError::PolicyFlowNotSet),
        }
    }

    /// Pool state with emission accrued up to the current ledger block.
    fn accrued_state(env: &Env) -> Result<PoolState, PoolError> {
        let mut state = storage::get_state(env);
        ledger::accrue(&mut state, env.ledger().sequence())?;
        Ok(state)
    }

    /// Accumulators of the epoch the record was last touched in, if that
    /// epoch has been wiped out since.
    fn closed_epoch(env: &Env, state: &PoolState, record: &Depositor) -> Option<EpochClose> {
        if record.snapshot_epoch == state.current_epoch {
            return None;
        }
        storage::get_epoch_close(env, record.snapshot_epoch)
    }

    fn settled_depositor(
        env: &Env,
        state: &PoolState,
        depositor: &Address,
    ) -> Result<Depositor, PoolError> {
        let mut record = storage::get_depositor(env, depositor);
        let closed = Self::closed_epoch(env, state, &record);
        ledger::settle(state, &mut record, closed.as_ref())?;
        Ok(record)
    }

    fn commit(env: &Env, state: &mut PoolState) -> Result<(), PoolError> {
        state.collateral_factor = ledger::collateral_factor(state)?;
        storage::set_state(env, state);
        Ok(())
    }
}
