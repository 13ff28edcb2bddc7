#![no_std]

use soroban_sdk::{contract, contractimpl, log, xdr::ToXdr, Address, Bytes, Env, String, Vec};

mod interfaces;
mod response;
mod storage;
mod types;

use interfaces::{OracleClient, PoolClient, SigManagerClient};
pub use types::*;

//
// ──────────────────────────────────────────────────────────
// CONTRACT
// ──────────────────────────────────────────────────────────
//

/// Sells flight delay policies against the insurance pool and settles them
/// from flight status reported by the oracle adapter.
///
/// A policy is `Active` until exactly one of: the oracle reports a delay at or
/// above the threshold (`SettledPaid`), the oracle reports anything else
/// (`SettledDeclined`), or the coverage window ends without a pending request
/// (`Expired`). A pending request holds expiry off for `claim_grace` seconds
/// past the window; after that the request is dropped and the policy expires.
#[contract]
pub struct PolicyFlowContract;

#[contractimpl]
impl PolicyFlowContract {
    /// Initialize the policy flow
    ///
    /// # Arguments
    /// * `admin` - Address allowed to change the settlement parameters
    /// * `pool` - Insurance pool backing the policies
    /// * `oracle` - Flight oracle adapter answering claim queries
    /// * `delay_threshold` - Delay in minutes at or above which a claim pays
    /// * `query_path` - Field of the flight record the oracle should report
    pub fn initialize(
        env: Env,
        admin: Address,
        pool: Address,
        oracle: Address,
        delay_threshold: u32,
        query_path: String,
    ) -> Result<(), FlowError> {
        if storage::has_config(&env) {
            return Err(FlowError::AlreadyInitialized);
        }
        admin.require_auth();

        let config = FlowConfig {
            admin,
            pool,
            oracle,
            sig_manager: None,
            delay_threshold,
            query_path,
            frozen_time: 0,
            claim_grace: DEFAULT_CLAIM_GRACE,
        };
        storage::set_config(&env, &config);
        Ok(())
    }

    // ───────────── POLICY PURCHASE ─────────────

    /// Buy a policy. Collateral for `payoff` is locked in the pool and the
    /// premium is pulled from the buyer. Returns the new policy id.
    pub fn purchase(
        env: Env,
        buyer: Address,
        application: PolicyApplication,
        approval: Option<Approval>,
    ) -> Result<u64, FlowError> {
        buyer.require_auth();
        let config = storage::get_config(&env)?;
        let now = env.ledger().timestamp();

        Self::validate_application(&config, &application, now)?;
        Self::check_approval(&env, &config, &buyer, &application, approval, now)?;

        let pool = PoolClient::new(&env, &config.pool);
        if !pool.can_underwrite(&application.payoff) {
            return Err(FlowError::InsufficientCapacity);
        }

        let policy_id = storage::next_policy_id(&env);
        let policy = Policy {
            id: policy_id,
            buyer: buyer.clone(),
            product_type: application.product_type,
            flight_number: application.flight_number,
            premium: application.premium,
            payoff: application.payoff,
            purchase_time: now,
            coverage_start: application.coverage_start,
            coverage_end: application.coverage_end,
            status: PolicyStatus::Active,
        };
        storage::set_policy(&env, &policy);
        storage::add_user_policy(&env, &buyer, policy_id);

        let flow = env.current_contract_address();
        pool.lock_collateral(&flow, &policy.payoff);
        pool.collect_premium(&flow, &buyer, &policy.premium);

        env.events().publish(
            (FlowEvent::PolicyPurchased, buyer, policy_id),
            (policy.premium, policy.payoff),
        );
        Ok(policy_id)
    }

    // ───────────── CLAIM SETTLEMENT ─────────────

    /// Ask the oracle for the flight's delay. Returns the request id; the
    /// policy settles when the answer arrives in `on_oracle_response`.
    pub fn request_claim_evaluation(
        env: Env,
        caller: Address,
        policy_id: u64,
    ) -> Result<u64, FlowError> {
        caller.require_auth();
        let config = storage::get_config(&env)?;
        let policy = storage::get_policy(&env, policy_id).ok_or(FlowError::PolicyNotFound)?;
        let now = env.ledger().timestamp();

        if policy.status != PolicyStatus::Active {
            return Err(FlowError::PolicyNotActive);
        }
        if storage::has_request_for_policy(&env, policy_id) {
            log!(&env, "claim request rejected: policy {} already pending", policy_id);
            return Err(FlowError::RequestAlreadyPending);
        }
        if now > policy.coverage_end {
            return Err(FlowError::PolicyNotActive);
        }
        if now < policy.coverage_start {
            return Err(FlowError::ClaimTooEarly);
        }

        let request = PendingRequest {
            request_id: storage::next_request_id(&env),
            policy_id,
            submitted_at: now,
        };
        storage::set_request(&env, &request);

        OracleClient::new(&env, &config.oracle).submit_query(
            &env.current_contract_address(),
            &request.request_id,
            &policy.flight_number,
            &config.query_path,
            &policy.coverage_start,
        );

        env.events().publish(
            (FlowEvent::ClaimRequested, policy_id),
            request.request_id,
        );
        Ok(request.request_id)
    }

    /// Oracle callback. Each request resolves at most once; a malformed
    /// payload declines the claim.
    pub fn on_oracle_response(
        env: Env,
        oracle: Address,
        request_id: u64,
        response: Bytes,
    ) -> Result<(), FlowError> {
        oracle.require_auth();
        let config = storage::get_config(&env)?;
        if oracle != config.oracle {
            log!(&env, "oracle response from unknown adapter for request {}", request_id);
            return Err(FlowError::Unauthorized);
        }

        let request = match storage::get_request(&env, request_id) {
            Some(request) => request,
            None => {
                log!(&env, "oracle response for unknown request {}", request_id);
                return Err(FlowError::UnknownRequest);
            }
        };
        storage::remove_request(&env, &request);

        let mut policy =
            storage::get_policy(&env, request.policy_id).ok_or(FlowError::PolicyNotFound)?;
        if policy.status != PolicyStatus::Active {
            log!(&env, "oracle response for settled policy {}", policy.id);
            return Err(FlowError::PolicyNotActive);
        }
        if Self::grace_elapsed(&env, &config, &policy) {
            log!(
                &env,
                "oracle response for request {} arrived after the claim grace, expiring policy {}",
                request_id,
                policy.id
            );
            Self::expire(&env, &config, policy);
            return Ok(());
        }

        let paid = match response::parse_delay(&response) {
            Ok(delay) => delay >= config.delay_threshold,
            Err(err) => {
                log!(
                    &env,
                    "declining policy {}: unreadable response, error {}",
                    policy.id,
                    err as u32
                );
                false
            }
        };

        policy.status = if paid {
            PolicyStatus::SettledPaid
        } else {
            PolicyStatus::SettledDeclined
        };
        storage::set_policy(&env, &policy);

        let pool = PoolClient::new(&env, &config.pool);
        let flow = env.current_contract_address();
        if paid {
            pool.pay_claim(&flow, &policy.buyer, &policy.payoff);
        } else {
            pool.release_collateral(&flow, &policy.payoff);
        }

        env.events()
            .publish((FlowEvent::PolicySettled, policy.id), policy.status);
        Ok(())
    }

    // ───────────── EXPIRY ─────────────

    /// Mark a lapsed policy `Expired` and release its collateral. A request
    /// still unanswered past the claim grace is dropped. Returns `false` when
    /// the policy had already reached a terminal state.
    pub fn expire_policy(env: Env, policy_id: u64) -> Result<bool, FlowError> {
        let config = storage::get_config(&env)?;
        let policy = storage::get_policy(&env, policy_id).ok_or(FlowError::PolicyNotFound)?;

        if policy.status != PolicyStatus::Active {
            return Ok(false);
        }
        if env.ledger().timestamp() <= policy.coverage_end {
            return Err(FlowError::CoverageNotEnded);
        }
        if storage::has_request_for_policy(&env, policy_id)
            && !Self::grace_elapsed(&env, &config, &policy)
        {
            return Err(FlowError::RequestAlreadyPending);
        }

        Self::expire(&env, &config, policy);
        Ok(true)
    }

    /// Expire every lapsed policy among ids `start_id .. start_id + limit`.
    /// Returns how many were expired.
    pub fn sweep_expired(env: Env, start_id: u64, limit: u32) -> Result<u32, FlowError> {
        let config = storage::get_config(&env)?;
        let last_id = storage::get_policy_count(&env);
        let start_id = start_id.max(1);
        let end_id = start_id.saturating_add(limit as u64).min(last_id + 1);

        let mut expired = 0u32;
        for policy_id in start_id..end_id {
            if let Some(policy) = storage::get_policy(&env, policy_id) {
                if Self::effective_status(&env, &config, &policy) == PolicyStatus::Expired {
                    Self::expire(&env, &config, policy);
                    expired += 1;
                }
            }
        }
        Ok(expired)
    }

    // ───────────── ADMIN FUNCTIONS ─────────────

    pub fn set_delay_threshold(env: Env, admin: Address, minutes: u32) -> Result<(), FlowError> {
        let mut config = Self::require_admin(&env, &admin)?;
        config.delay_threshold = minutes;
        Self::update_config(&env, admin, &config);
        Ok(())
    }

    /// Stop sales `seconds` before the covered departure.
    pub fn set_frozen_time(env: Env, admin: Address, seconds: u64) -> Result<(), FlowError> {
        let mut config = Self::require_admin(&env, &admin)?;
        config.frozen_time = seconds;
        Self::update_config(&env, admin, &config);
        Ok(())
    }

    /// Require purchases to carry an approval from `sig_manager`, or lift
    /// the requirement with `None`.
    pub fn set_sig_manager(
        env: Env,
        admin: Address,
        sig_manager: Option<Address>,
    ) -> Result<(), FlowError> {
        let mut config = Self::require_admin(&env, &admin)?;
        config.sig_manager = sig_manager;
        Self::update_config(&env, admin, &config);
        Ok(())
    }

    /// Seconds a pending claim request may outlive the coverage window.
    pub fn set_claim_grace(env: Env, admin: Address, seconds: u64) -> Result<(), FlowError> {
        let mut config = Self::require_admin(&env, &admin)?;
        config.claim_grace = seconds;
        Self::update_config(&env, admin, &config);
        Ok(())
    }

    pub fn set_oracle(env: Env, admin: Address, oracle: Address) -> Result<(), FlowError> {
        let mut config = Self::require_admin(&env, &admin)?;
        config.oracle = oracle;
        Self::update_config(&env, admin, &config);
        Ok(())
    }

    // ───────────── VIEW FUNCTIONS ─────────────

    pub fn get_config(env: Env) -> Result<FlowConfig, FlowError> {
        storage::get_config(&env)
    }

    /// Policy with its status as of now; a lapsed policy reads `Expired`
    /// even before anyone expired it.
    pub fn get_policy(env: Env, policy_id: u64) -> Result<Policy, FlowError> {
        let config = storage::get_config(&env)?;
        let mut policy = storage::get_policy(&env, policy_id).ok_or(FlowError::PolicyNotFound)?;
        policy.status = Self::effective_status(&env, &config, &policy);
        Ok(policy)
    }

    pub fn get_user_policy_ids(env: Env, user: Address) -> Vec<u64> {
        storage::get_user_policies(&env, &user)
    }

    pub fn get_user_policies(env: Env, user: Address) -> Result<Vec<Policy>, FlowError> {
        let config = storage::get_config(&env)?;
        let mut policies = Vec::new(&env);
        for policy_id in storage::get_user_policies(&env, &user).iter() {
            if let Some(mut policy) = storage::get_policy(&env, policy_id) {
                policy.status = Self::effective_status(&env, &config, &policy);
                policies.push_back(policy);
            }
        }
        Ok(policies)
    }

    pub fn get_policies(env: Env, start_id: u64, limit: u32) -> Result<Vec<Policy>, FlowError> {
        let config = storage::get_config(&env)?;
        let mut policies = Vec::new(&env);
        let start_id = start_id.max(1);
        let end_id = start_id
            .saturating_add(limit as u64)
            .min(storage::get_policy_count(&env) + 1);

        for policy_id in start_id..end_id {
            if let Some(mut policy) = storage::get_policy(&env, policy_id) {
                policy.status = Self::effective_status(&env, &config, &policy);
                policies.push_back(policy);
            }
        }
        Ok(policies)
    }

    pub fn get_total_policy_count(env: Env) -> u64 {
        storage::get_policy_count(&env)
    }

    pub fn has_pending_request(env: Env, policy_id: u64) -> bool {
        storage::has_request_for_policy(&env, policy_id)
    }

    pub fn get_pending_request(env: Env, policy_id: u64) -> Option<PendingRequest> {
        storage::get_request_for_policy(&env, policy_id)
    }

    // ───────────── INTERNAL HELPERS ─────────────

    fn require_admin(env: &Env, admin: &Address) -> Result<FlowConfig, FlowError> {
        admin.require_auth();
        let config = storage::get_config(env)?;
        if config.admin != *admin {
            return Err(FlowError::Unauthorized);
        }
        Ok(config)
    }

    fn update_config(env: &Env, admin: Address, config: &FlowConfig) {
        storage::set_config(env, config);
        env.events().publish((FlowEvent::ConfigUpdated, admin), ());
    }

    fn validate_application(
        config: &FlowConfig,
        application: &PolicyApplication,
        now: u64,
    ) -> Result<(), FlowError> {
        if application.premium <= 0 || application.payoff <= 0 {
            return Err(FlowError::InvalidAmount);
        }
        if application.coverage_start >= application.coverage_end {
            return Err(FlowError::InvalidCoverageWindow);
        }
        if application.coverage_start <= now {
            return Err(FlowError::CoverageStartInPast);
        }
        if application.coverage_start < now.saturating_add(config.frozen_time) {
            return Err(FlowError::PurchaseWindowClosed);
        }
        Ok(())
    }

    fn check_approval(
        env: &Env,
        config: &FlowConfig,
        buyer: &Address,
        application: &PolicyApplication,
        approval: Option<Approval>,
        now: u64,
    ) -> Result<(), FlowError> {
        let manager = match config.sig_manager {
            Some(ref manager) => manager,
            None => return Ok(()),
        };
        let approval = approval.ok_or(FlowError::SignatureRequired)?;
        if approval.deadline < now {
            return Err(FlowError::SignatureExpired);
        }

        let payload = Self::approval_payload(env, application, approval.deadline);
        let verified = SigManagerClient::new(env, manager).try_verify(
            buyer,
            &payload,
            &approval.signer,
            &approval.signature,
        );
        match verified {
            Ok(Ok(true)) => Ok(()),
            _ => Err(FlowError::InvalidSignature),
        }
    }

    /// Bytes a pricing signer approves for one application.
    fn approval_payload(env: &Env, application: &PolicyApplication, deadline: u64) -> Bytes {
        (
            application.flight_number.clone(),
            application.premium,
            application.payoff,
            application.coverage_start,
            deadline,
            env.current_contract_address(),
        )
            .to_xdr(env)
    }

    fn effective_status(env: &Env, config: &FlowConfig, policy: &Policy) -> PolicyStatus {
        if policy.status == PolicyStatus::Active
            && env.ledger().timestamp() > policy.coverage_end
            && (!storage::has_request_for_policy(env, policy.id)
                || Self::grace_elapsed(env, config, policy))
        {
            return PolicyStatus::Expired;
        }
        policy.status
    }

    fn grace_elapsed(env: &Env, config: &FlowConfig, policy: &Policy) -> bool {
        env.ledger().timestamp() > policy.coverage_end.saturating_add(config.claim_grace)
    }

    /// Drops any request still pending for the policy, so a later oracle
    /// answer resolves to `UnknownRequest`.
    fn expire(env: &Env, config: &FlowConfig, mut policy: Policy) {
        if let Some(request) = storage::get_request_for_policy(env, policy.id) {
            log!(
                env,
                "dropping request {} of lapsed policy {}",
                request.request_id,
                policy.id
            );
            storage::remove_request(env, &request);
        }
        policy.status = PolicyStatus::Expired;
        storage::set_policy(env, &policy);

        PoolClient::new(env, &config.pool)
            .release_collateral(&env.current_contract_address(), &policy.payoff);

        env.events()
            .publish((FlowEvent::PolicyExpired, policy.id), policy.payoff);
    }
}

#[cfg(test)]
mod test;
