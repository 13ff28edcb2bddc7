use soroban_sdk::{Address, Env};
use crate::types::{DataKey, Depositor, EpochClose, PoolConfig, PoolError, PoolState};

pub fn has_config(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

pub fn set_config(env: &Env, config: &PoolConfig) {
    env.storage().instance().set(&DataKey::Config, config);
}

pub fn get_config(env: &Env) -> Result<PoolConfig, PoolError> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(PoolError::NotInitialized)
}

pub fn set_state(env: &Env, state: &PoolState) {
    env.storage().instance().set(&DataKey::State, state);
}

pub fn get_state(env: &Env) -> PoolState {
    env.storage()
        .instance()
        .get(&DataKey::State)
        .unwrap_or_default()
}

pub fn get_depositor(env: &Env, user: &Address) -> Depositor {
    env.storage()
        .persistent()
        .get(&DataKey::Depositor(user.clone()))
        .unwrap_or_default()
}

pub fn set_depositor(env: &Env, user: &Address, depositor: &Depositor) {
    env.storage()
        .persistent()
        .set(&DataKey::Depositor(user.clone()), depositor);
}

pub fn get_epoch_close(env: &Env, epoch: u32) -> Option<EpochClose> {
    env.storage().persistent().get(&DataKey::EpochClose(epoch))
}

pub fn set_epoch_close(env: &Env, epoch: u32, close: &EpochClose) {
    env.storage()
        .persistent()
        .set(&DataKey::EpochClose(epoch), close);
}
