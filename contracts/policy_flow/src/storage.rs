use soroban_sdk::{Address, Env, Vec};
use crate::types::{DataKey, FlowConfig, FlowError, PendingRequest, Policy};

pub fn has_config(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

pub fn set_config(env: &Env, config: &FlowConfig) {
    env.storage().instance().set(&DataKey::Config, config);
}

pub fn get_config(env: &Env) -> Result<FlowConfig, FlowError> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(FlowError::NotInitialized)
}

pub fn get_policy_count(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::PolicyCounter)
        .unwrap_or(0)
}

pub fn next_policy_id(env: &Env) -> u64 {
    let id = get_policy_count(env) + 1;
    env.storage().instance().set(&DataKey::PolicyCounter, &id);
    id
}

pub fn next_request_id(env: &Env) -> u64 {
    let id: u64 = env
        .storage()
        .instance()
        .get(&DataKey::RequestCounter)
        .unwrap_or(0)
        + 1;
    env.storage().instance().set(&DataKey::RequestCounter, &id);
    id
}

pub fn get_policy(env: &Env, policy_id: u64) -> Option<Policy> {
    env.storage().persistent().get(&DataKey::Policy(policy_id))
}

pub fn set_policy(env: &Env, policy: &Policy) {
    env.storage()
        .persistent()
        .set(&DataKey::Policy(policy.id), policy);
}

pub fn get_user_policies(env: &Env, user: &Address) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&DataKey::UserPolicies(user.clone()))
        .unwrap_or(Vec::new(env))
}

pub fn add_user_policy(env: &Env, user: &Address, policy_id: u64) {
    let mut ids = get_user_policies(env, user);
    ids.push_back(policy_id);
    env.storage()
        .persistent()
        .set(&DataKey::UserPolicies(user.clone()), &ids);
}

pub fn get_request(env: &Env, request_id: u64) -> Option<PendingRequest> {
    env.storage().persistent().get(&DataKey::Request(request_id))
}

pub fn get_request_for_policy(env: &Env, policy_id: u64) -> Option<PendingRequest> {
    let request_id: u64 = env
        .storage()
        .persistent()
        .get(&DataKey::PolicyRequest(policy_id))?;
    get_request(env, request_id)
}

pub fn has_request_for_policy(env: &Env, policy_id: u64) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::PolicyRequest(policy_id))
}

pub fn set_request(env: &Env, request: &PendingRequest) {
    env.storage()
        .persistent()
        .set(&DataKey::Request(request.request_id), request);
    env.storage()
        .persistent()
        .set(&DataKey::PolicyRequest(request.policy_id), &request.request_id);
}

pub fn remove_request(env: &Env, request: &PendingRequest) {
    env.storage()
        .persistent()
        .remove(&DataKey::Request(request.request_id));
    env.storage()
        .persistent()
        .remove(&DataKey::PolicyRequest(request.policy_id));
}
