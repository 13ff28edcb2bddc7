#![cfg(test)]
extern crate std;

use super::*;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use flight_oracle::{FlightOracleContract, FlightOracleContractClient, OracleError};
use insurance_pool::{InsurancePoolContract, InsurancePoolContractClient};
use rand::rngs::OsRng;
use sig_manager::{SigManagerContract, SigManagerContractClient};
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token::Client as TokenClient,
    token::StellarAssetClient,
    xdr::ToXdr,
    Address, Bytes, BytesN, Env, String,
};

const NOW: u64 = 1_700_000_000;
const DEPARTURE: u64 = NOW + 3_600;
const ARRIVAL: u64 = DEPARTURE + 7_200;

struct Setup<'a> {
    flow: PolicyFlowContractClient<'a>,
    flow_id: Address,
    pool: InsurancePoolContractClient<'a>,
    pool_id: Address,
    oracle: FlightOracleContractClient<'a>,
    oracle_id: Address,
    admin: Address,
    node: Address,
    buyer: Address,
    collateral: TokenClient<'a>,
}

fn setup(env: &Env) -> Setup<'_> {
    env.mock_all_auths();
    env.ledger().with_mut(|li| {
        li.timestamp = NOW;
        li.sequence_number = 100;
    });

    let admin = Address::generate(env);
    let node = Address::generate(env);
    let depositor = Address::generate(env);
    let buyer = Address::generate(env);

    let sac = env.register_stellar_asset_contract_v2(Address::generate(env));
    let collateral_id = sac.address();
    let minter = StellarAssetClient::new(env, &collateral_id);
    minter.mint(&depositor, &1_000);
    minter.mint(&buyer, &100);

    let pool_id = env.register_contract(None, InsurancePoolContract);
    let pool = InsurancePoolContractClient::new(env, &pool_id);
    pool.initialize(
        &admin,
        &String::from_str(env, "Flight delay pool"),
        &collateral_id,
        &Address::generate(env),
        &0,
    );

    let oracle_id = env.register_contract(None, FlightOracleContract);
    let oracle = FlightOracleContractClient::new(env, &oracle_id);
    oracle.initialize(&admin, &node);

    let flow_id = env.register_contract(None, PolicyFlowContract);
    let flow = PolicyFlowContractClient::new(env, &flow_id);
    flow.initialize(
        &admin,
        &pool_id,
        &oracle_id,
        &60,
        &String::from_str(env, "delay"),
    );

    pool.set_policy_flow(&admin, &flow_id);
    pool.stake(&depositor, &1_000);

    Setup {
        flow,
        flow_id,
        pool,
        pool_id,
        oracle,
        oracle_id,
        admin,
        node,
        buyer,
        collateral: TokenClient::new(env, &collateral_id),
    }
}

fn application(env: &Env, premium: i128, payoff: i128) -> PolicyApplication {
    PolicyApplication {
        product_type: 0,
        flight_number: String::from_str(env, "AQ1299"),
        premium,
        payoff,
        coverage_start: DEPARTURE,
        coverage_end: ARRIVAL,
    }
}

fn set_time(env: &Env, timestamp: u64) {
    env.ledger().with_mut(|li| li.timestamp = timestamp);
}

fn buy(env: &Env, s: &Setup, payoff: i128) -> u64 {
    s.flow.purchase(&s.buyer, &application(env, 10, payoff), &None)
}

fn respond(env: &Env, s: &Setup, request_id: u64, raw: &[u8]) -> bool {
    s.oracle.fulfill(
        &s.node,
        &s.flow_id,
        &request_id,
        &Bytes::from_slice(env, raw),
    )
}

// ───────────── PURCHASE TESTS ─────────────

#[test]
fn test_purchase_locks_collateral_and_collects_premium() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = s.flow.purchase(&s.buyer, &application(&env, 50, 400), &None);
    assert_eq!(policy_id, 1);

    let policy = s.flow.get_policy(&policy_id);
    assert_eq!(policy.buyer, s.buyer);
    assert_eq!(policy.status, PolicyStatus::Active);
    assert_eq!(policy.purchase_time, NOW);
    assert_eq!(policy.flight_number, String::from_str(&env, "AQ1299"));

    assert_eq!(s.pool.get_total_locked(), 400);
    assert_eq!(s.pool.get_available_capacity(), 600);
    assert_eq!(s.collateral.balance(&s.buyer), 50);
    assert_eq!(s.collateral.balance(&s.pool_id), 1_050);

    assert_eq!(s.flow.get_total_policy_count(), 1);
    assert_eq!(s.flow.get_user_policy_ids(&s.buyer).len(), 1);
    assert_eq!(s.flow.get_user_policies(&s.buyer).get(0), Some(policy));
}

#[test]
fn test_purchase_beyond_capacity_changes_nothing() {
    let env = Env::default();
    let s = setup(&env);

    assert_eq!(
        s.flow.try_purchase(&s.buyer, &application(&env, 10, 1_001), &None),
        Err(Ok(FlowError::InsufficientCapacity))
    );
    assert_eq!(s.flow.get_total_policy_count(), 0);
    assert_eq!(s.pool.get_total_locked(), 0);
    assert_eq!(s.collateral.balance(&s.buyer), 100);

    buy(&env, &s, 1_000);
    assert_eq!(
        s.flow.try_purchase(&s.buyer, &application(&env, 10, 1), &None),
        Err(Ok(FlowError::InsufficientCapacity))
    );
    assert_eq!(s.flow.get_total_policy_count(), 1);
}

#[test]
fn test_purchase_validation() {
    let env = Env::default();
    let s = setup(&env);

    assert_eq!(
        s.flow.try_purchase(&s.buyer, &application(&env, 0, 400), &None),
        Err(Ok(FlowError::InvalidAmount))
    );
    assert_eq!(
        s.flow.try_purchase(&s.buyer, &application(&env, 10, -1), &None),
        Err(Ok(FlowError::InvalidAmount))
    );

    let mut reversed = application(&env, 10, 400);
    reversed.coverage_end = reversed.coverage_start;
    assert_eq!(
        s.flow.try_purchase(&s.buyer, &reversed, &None),
        Err(Ok(FlowError::InvalidCoverageWindow))
    );

    let mut departed = application(&env, 10, 400);
    departed.coverage_start = NOW;
    assert_eq!(
        s.flow.try_purchase(&s.buyer, &departed, &None),
        Err(Ok(FlowError::CoverageStartInPast))
    );

    s.flow.set_frozen_time(&s.admin, &7_200);
    assert_eq!(
        s.flow.try_purchase(&s.buyer, &application(&env, 10, 400), &None),
        Err(Ok(FlowError::PurchaseWindowClosed))
    );
    s.flow.set_frozen_time(&s.admin, &3_600);
    assert_eq!(buy(&env, &s, 400), 1);
}

// ───────────── CLAIM TESTS ─────────────

#[test]
fn test_delayed_flight_pays_out() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = s.flow.purchase(&s.buyer, &application(&env, 50, 400), &None);
    set_time(&env, DEPARTURE + 60);

    let request_id = s.flow.request_claim_evaluation(&s.buyer, &policy_id);
    assert!(s.flow.has_pending_request(&policy_id));
    let pending = s.flow.get_pending_request(&policy_id).unwrap();
    assert_eq!(pending.request_id, request_id);
    assert_eq!(pending.submitted_at, DEPARTURE + 60);

    let query = s.oracle.get_query(&s.flow_id, &request_id);
    assert_eq!(query.subject, String::from_str(&env, "AQ1299"));
    assert_eq!(query.path, String::from_str(&env, "delay"));
    assert_eq!(query.timestamp, DEPARTURE);

    assert!(respond(&env, &s, request_id, b"200"));

    assert_eq!(s.flow.get_policy(&policy_id).status, PolicyStatus::SettledPaid);
    assert!(!s.flow.has_pending_request(&policy_id));
    assert_eq!(s.collateral.balance(&s.buyer), 50 + 400);
    assert_eq!(s.pool.get_total_locked(), 0);
    assert_eq!(s.pool.get_total_staked(), 600);
    assert_eq!(s.pool.get_available_capacity(), 600);
}

#[test]
fn test_short_delay_declines() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = buy(&env, &s, 400);
    set_time(&env, DEPARTURE);
    let request_id = s.flow.request_claim_evaluation(&s.buyer, &policy_id);

    assert!(respond(&env, &s, request_id, b"59"));

    assert_eq!(
        s.flow.get_policy(&policy_id).status,
        PolicyStatus::SettledDeclined
    );
    assert_eq!(s.collateral.balance(&s.buyer), 90);
    assert_eq!(s.pool.get_total_locked(), 0);
    assert_eq!(s.pool.get_available_capacity(), 1_000);
}

#[test]
fn test_malformed_response_declines() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = buy(&env, &s, 400);
    set_time(&env, DEPARTURE);
    let request_id = s.flow.request_claim_evaluation(&s.buyer, &policy_id);

    assert!(respond(&env, &s, request_id, b"cancelled"));

    assert_eq!(
        s.flow.get_policy(&policy_id).status,
        PolicyStatus::SettledDeclined
    );
    assert_eq!(s.collateral.balance(&s.buyer), 90);
    assert_eq!(s.pool.get_total_locked(), 0);
}

#[test]
fn test_replayed_or_unknown_response_rejected() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = buy(&env, &s, 400);
    set_time(&env, DEPARTURE);
    let request_id = s.flow.request_claim_evaluation(&s.buyer, &policy_id);
    respond(&env, &s, request_id, b"200");

    let payload = Bytes::from_slice(&env, b"200");
    assert_eq!(
        s.flow.try_on_oracle_response(&s.oracle_id, &request_id, &payload),
        Err(Ok(FlowError::UnknownRequest))
    );
    assert_eq!(
        s.flow.try_on_oracle_response(&s.oracle_id, &99, &payload),
        Err(Ok(FlowError::UnknownRequest))
    );
    assert_eq!(
        s.oracle.try_fulfill(&s.node, &s.flow_id, &request_id, &payload),
        Err(Ok(OracleError::NotFound))
    );

    assert_eq!(s.flow.get_policy(&policy_id).status, PolicyStatus::SettledPaid);
    assert_eq!(s.collateral.balance(&s.buyer), 90 + 400);
    assert_eq!(s.pool.get_total_locked(), 0);
}

#[test]
fn test_response_only_from_configured_oracle() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = buy(&env, &s, 400);
    set_time(&env, DEPARTURE);
    let request_id = s.flow.request_claim_evaluation(&s.buyer, &policy_id);

    let impostor = Address::generate(&env);
    assert_eq!(
        s.flow.try_on_oracle_response(&impostor, &request_id, &Bytes::from_slice(&env, b"999")),
        Err(Ok(FlowError::Unauthorized))
    );
    assert!(s.flow.has_pending_request(&policy_id));
    assert_eq!(s.pool.get_total_locked(), 400);
}

#[test]
fn test_claim_request_rules() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = buy(&env, &s, 400);
    assert_eq!(
        s.flow.try_request_claim_evaluation(&s.buyer, &policy_id),
        Err(Ok(FlowError::ClaimTooEarly))
    );
    assert_eq!(
        s.flow.try_request_claim_evaluation(&s.buyer, &42),
        Err(Ok(FlowError::PolicyNotFound))
    );

    set_time(&env, DEPARTURE + 1);
    let request_id = s.flow.request_claim_evaluation(&s.buyer, &policy_id);
    assert_eq!(
        s.flow.try_request_claim_evaluation(&s.buyer, &policy_id),
        Err(Ok(FlowError::RequestAlreadyPending))
    );

    respond(&env, &s, request_id, b"10");
    assert_eq!(
        s.flow.try_request_claim_evaluation(&s.buyer, &policy_id),
        Err(Ok(FlowError::PolicyNotActive))
    );
}

// ───────────── EXPIRY TESTS ─────────────

#[test]
fn test_lapsed_policy_reads_expired_and_expires_once() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = buy(&env, &s, 400);
    assert_eq!(
        s.flow.try_expire_policy(&policy_id),
        Err(Ok(FlowError::CoverageNotEnded))
    );

    set_time(&env, ARRIVAL + 1);
    assert_eq!(s.flow.get_policy(&policy_id).status, PolicyStatus::Expired);
    assert_eq!(s.pool.get_total_locked(), 400);
    assert_eq!(
        s.flow.try_request_claim_evaluation(&s.buyer, &policy_id),
        Err(Ok(FlowError::PolicyNotActive))
    );

    assert!(s.flow.expire_policy(&policy_id));
    assert_eq!(s.pool.get_total_locked(), 0);
    assert!(!s.flow.expire_policy(&policy_id));
    assert_eq!(s.pool.get_total_locked(), 0);
}

#[test]
fn test_pending_request_holds_expiry_within_grace() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = buy(&env, &s, 400);
    set_time(&env, DEPARTURE);
    let request_id = s.flow.request_claim_evaluation(&s.buyer, &policy_id);

    set_time(&env, ARRIVAL + DEFAULT_CLAIM_GRACE);
    assert_eq!(s.flow.get_policy(&policy_id).status, PolicyStatus::Active);
    assert_eq!(
        s.flow.try_expire_policy(&policy_id),
        Err(Ok(FlowError::RequestAlreadyPending))
    );
    assert_eq!(s.flow.sweep_expired(&1, &10), 0);

    assert!(respond(&env, &s, request_id, b"120"));
    assert_eq!(s.flow.get_policy(&policy_id).status, PolicyStatus::SettledPaid);
}

#[test]
fn test_unanswered_request_expires_after_grace() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = buy(&env, &s, 400);
    set_time(&env, DEPARTURE);
    let request_id = s.flow.request_claim_evaluation(&s.buyer, &policy_id);

    set_time(&env, ARRIVAL + DEFAULT_CLAIM_GRACE + 1);
    assert_eq!(s.flow.get_policy(&policy_id).status, PolicyStatus::Expired);
    assert!(s.flow.expire_policy(&policy_id));
    assert!(!s.flow.has_pending_request(&policy_id));
    assert_eq!(s.pool.get_total_locked(), 0);

    // The oracle answers eventually, but the request no longer exists.
    assert!(!respond(&env, &s, request_id, b"120"));
    assert_eq!(s.flow.get_policy(&policy_id).status, PolicyStatus::Expired);
    assert_eq!(s.collateral.balance(&s.buyer), 90);
    assert_eq!(s.pool.get_total_staked(), 1_000);
    assert!(!s.flow.expire_policy(&policy_id));
}

#[test]
fn test_sweep_drops_stale_requests() {
    let env = Env::default();
    let s = setup(&env);

    let stale = buy(&env, &s, 300);
    let plain = buy(&env, &s, 200);
    set_time(&env, DEPARTURE);
    let request_id = s.flow.request_claim_evaluation(&s.buyer, &stale);

    set_time(&env, ARRIVAL + 1);
    assert_eq!(s.flow.sweep_expired(&1, &10), 1);
    assert_eq!(s.flow.get_policy(&plain).status, PolicyStatus::Expired);
    assert_eq!(s.pool.get_total_locked(), 300);

    set_time(&env, ARRIVAL + DEFAULT_CLAIM_GRACE + 1);
    assert_eq!(s.flow.sweep_expired(&1, &10), 1);
    assert_eq!(s.flow.get_pending_request(&stale), None);
    assert_eq!(s.pool.get_total_locked(), 0);
    assert!(!respond(&env, &s, request_id, b"0"));
}

#[test]
fn test_late_answer_expires_instead_of_paying() {
    let env = Env::default();
    let s = setup(&env);

    let policy_id = buy(&env, &s, 400);
    set_time(&env, DEPARTURE);
    let request_id = s.flow.request_claim_evaluation(&s.buyer, &policy_id);

    set_time(&env, ARRIVAL + DEFAULT_CLAIM_GRACE + 1);
    assert!(respond(&env, &s, request_id, b"120"));

    assert_eq!(s.flow.get_policy(&policy_id).status, PolicyStatus::Expired);
    assert!(!s.flow.has_pending_request(&policy_id));
    assert_eq!(s.pool.get_total_locked(), 0);
    assert_eq!(s.collateral.balance(&s.buyer), 90);
}

#[test]
fn test_sweep_is_idempotent() {
    let env = Env::default();
    let s = setup(&env);

    buy(&env, &s, 100);
    buy(&env, &s, 200);
    let settled = buy(&env, &s, 300);
    assert_eq!(s.pool.get_total_locked(), 600);

    set_time(&env, DEPARTURE);
    let request_id = s.flow.request_claim_evaluation(&s.buyer, &settled);
    respond(&env, &s, request_id, b"0");

    set_time(&env, ARRIVAL + 1);
    assert_eq!(s.flow.sweep_expired(&1, &10), 2);
    assert_eq!(s.pool.get_total_locked(), 0);
    assert_eq!(s.flow.sweep_expired(&1, &10), 0);

    let policies = s.flow.get_policies(&1, &10);
    assert_eq!(policies.len(), 3);
    assert_eq!(policies.get(0).unwrap().status, PolicyStatus::Expired);
    assert_eq!(policies.get(1).unwrap().status, PolicyStatus::Expired);
    assert_eq!(policies.get(2).unwrap().status, PolicyStatus::SettledDeclined);
    assert_eq!(s.flow.get_policies(&2, &1).len(), 1);
}

// ───────────── SIGNATURE GATE TESTS ─────────────

fn signed_approval(
    env: &Env,
    s: &Setup,
    key: &SigningKey,
    app: &PolicyApplication,
    deadline: u64,
) -> Approval {
    let payload = (
        app.flight_number.clone(),
        app.premium,
        app.payoff,
        app.coverage_start,
        deadline,
        s.flow_id.clone(),
    )
        .to_xdr(env);
    let message = (s.buyer.clone(), payload).to_xdr(env);
    let mut raw = std::vec![0u8; message.len() as usize];
    message.copy_into_slice(&mut raw);

    Approval {
        signer: BytesN::from_array(env, &VerifyingKey::from(key).to_bytes()),
        signature: BytesN::from_array(env, &key.sign(&raw).to_bytes()),
        deadline,
    }
}

#[test]
fn test_signature_gate() {
    let env = Env::default();
    let s = setup(&env);

    let manager_id = env.register_contract(None, SigManagerContract);
    let manager = SigManagerContractClient::new(&env, &manager_id);
    manager.initialize(&s.admin);
    let key = SigningKey::generate(&mut OsRng);
    manager.add_signer(
        &s.admin,
        &BytesN::from_array(&env, &VerifyingKey::from(&key).to_bytes()),
    );
    s.flow.set_sig_manager(&s.admin, &Some(manager_id));

    let app = application(&env, 10, 400);
    assert_eq!(
        s.flow.try_purchase(&s.buyer, &app, &None),
        Err(Ok(FlowError::SignatureRequired))
    );

    let stale = signed_approval(&env, &s, &key, &app, NOW - 1);
    assert_eq!(
        s.flow.try_purchase(&s.buyer, &app, &Some(stale)),
        Err(Ok(FlowError::SignatureExpired))
    );

    // Approval for a smaller payoff cannot be reused for a bigger one.
    let small = application(&env, 10, 100);
    let approval = signed_approval(&env, &s, &key, &small, NOW + 60);
    assert_eq!(
        s.flow.try_purchase(&s.buyer, &app, &Some(approval.clone())),
        Err(Ok(FlowError::InvalidSignature))
    );

    let rogue = SigningKey::generate(&mut OsRng);
    let forged = signed_approval(&env, &s, &rogue, &app, NOW + 60);
    assert_eq!(
        s.flow.try_purchase(&s.buyer, &app, &Some(forged)),
        Err(Ok(FlowError::InvalidSignature))
    );
    assert_eq!(s.flow.get_total_policy_count(), 0);

    assert_eq!(s.flow.purchase(&s.buyer, &small, &Some(approval)), 1);

    s.flow.set_sig_manager(&s.admin, &None);
    assert_eq!(buy(&env, &s, 100), 2);
}

// ───────────── ADMIN TESTS ─────────────

#[test]
fn test_admin_setters() {
    let env = Env::default();
    let s = setup(&env);

    let outsider = Address::generate(&env);
    assert_eq!(
        s.flow.try_set_delay_threshold(&outsider, &1),
        Err(Ok(FlowError::Unauthorized))
    );

    s.flow.set_delay_threshold(&s.admin, &300);
    s.flow.set_claim_grace(&s.admin, &3_600);
    let new_oracle = Address::generate(&env);
    s.flow.set_oracle(&s.admin, &new_oracle);

    let config = s.flow.get_config();
    assert_eq!(config.delay_threshold, 300);
    assert_eq!(config.claim_grace, 3_600);
    assert_eq!(config.oracle, new_oracle);
    assert_eq!(config.pool, s.pool_id);
    assert_eq!(config.sig_manager, None);

    assert_eq!(
        s.flow.try_initialize(
            &s.admin,
            &s.pool_id,
            &s.oracle_id,
            &60,
            &String::from_str(&env, "delay"),
        ),
        Err(Ok(FlowError::AlreadyInitialized))
    );
}
