use crate::types::{Config, OracleError, Query};
use soroban_sdk::{symbol_short, Address, Env};

pub struct Storage;

impl Storage {
    pub fn has_config(env: &Env) -> bool {
        env.storage().instance().has(&symbol_short!("config"))
    }

    pub fn set_config(env: &Env, config: &Config) {
        env.storage()
            .instance()
            .set(&symbol_short!("config"), config);
    }

    pub fn get_config(env: &Env) -> Result<Config, OracleError> {
        env.storage()
            .instance()
            .get(&symbol_short!("config"))
            .ok_or(OracleError::NotInitialized)
    }

    pub fn has_query(env: &Env, consumer: &Address, request_id: u64) -> bool {
        env.storage()
            .persistent()
            .has(&(symbol_short!("query"), consumer.clone(), request_id))
    }

    pub fn set_query(env: &Env, consumer: &Address, request_id: u64, query: &Query) {
        env.storage()
            .persistent()
            .set(&(symbol_short!("query"), consumer.clone(), request_id), query);
    }

    pub fn get_query(env: &Env, consumer: &Address, request_id: u64) -> Option<Query> {
        env.storage()
            .persistent()
            .get(&(symbol_short!("query"), consumer.clone(), request_id))
    }

    pub fn remove_query(env: &Env, consumer: &Address, request_id: u64) {
        env.storage()
            .persistent()
            .remove(&(symbol_short!("query"), consumer.clone(), request_id));
    }
}
