#![no_std]
use soroban_sdk::{contract, contractclient, contractimpl, log, Address, Bytes, Env, String};

mod storage;
mod types;

use storage::Storage;
pub use types::{Config, OracleError, OracleEvent, Query};

/// Callback every consumer of the adapter implements.
#[contractclient(name = "OracleConsumerClient")]
pub trait OracleConsumer {
    fn on_oracle_response(env: Env, oracle: Address, request_id: u64, response: Bytes);
}

/// Bridge between on-chain consumers and an off-chain flight status node.
///
/// Consumers file queries keyed by their own request id; the node answers
/// them with `fulfill`, which forwards the raw payload to the consumer.
#[contract]
pub struct FlightOracleContract;

#[contractimpl]
impl FlightOracleContract {
    pub fn initialize(env: Env, admin: Address, node: Address) -> Result<(), OracleError> {
        if Storage::has_config(&env) {
            return Err(OracleError::AlreadyInitialized);
        }
        admin.require_auth();

        let config = Config {
            admin,
            node,
            paused: false,
        };
        Storage::set_config(&env, &config);

        Ok(())
    }

    pub fn submit_query(
        env: Env,
        consumer: Address,
        request_id: u64,
        subject: String,
        path: String,
        timestamp: u64,
    ) -> Result<(), OracleError> {
        consumer.require_auth();
        let config = Storage::get_config(&env)?;

        if config.paused {
            return Err(OracleError::Paused);
        }

        if Storage::has_query(&env, &consumer, request_id) {
            return Err(OracleError::DuplicateRequest);
        }

        let query = Query {
            subject: subject.clone(),
            path,
            timestamp,
            submitted_at: env.ledger().timestamp(),
        };
        Storage::set_query(&env, &consumer, request_id, &query);

        env.events()
            .publish((OracleEvent::QuerySubmitted, consumer, request_id), subject);
        Ok(())
    }

    /// Deliver the node's answer. The query is consumed even when the
    /// consumer rejects the payload; the return value says whether the
    /// callback succeeded.
    pub fn fulfill(
        env: Env,
        node: Address,
        consumer: Address,
        request_id: u64,
        response: Bytes,
    ) -> Result<bool, OracleError> {
        node.require_auth();
        let config = Storage::get_config(&env)?;

        if node != config.node {
            return Err(OracleError::Unauthorized);
        }

        if config.paused {
            return Err(OracleError::Paused);
        }

        if !Storage::has_query(&env, &consumer, request_id) {
            return Err(OracleError::NotFound);
        }
        Storage::remove_query(&env, &consumer, request_id);

        let consumer_client = OracleConsumerClient::new(&env, &consumer);
        let delivered = matches!(
            consumer_client.try_on_oracle_response(
                &env.current_contract_address(),
                &request_id,
                &response,
            ),
            Ok(Ok(_))
        );
        if !delivered {
            log!(&env, "consumer rejected response for request {}", request_id);
        }

        env.events()
            .publish((OracleEvent::QueryFulfilled, consumer, request_id), delivered);
        Ok(delivered)
    }

    pub fn get_query(env: Env, consumer: Address, request_id: u64) -> Result<Query, OracleError> {
        Storage::get_query(&env, &consumer, request_id).ok_or(OracleError::NotFound)
    }

    pub fn get_config(env: Env) -> Result<Config, OracleError> {
        Storage::get_config(&env)
    }

    pub fn set_node(env: Env, new_node: Address) -> Result<(), OracleError> {
        let mut config = Storage::get_config(&env)?;
        config.admin.require_auth();
        config.node = new_node.clone();
        Storage::set_config(&env, &config);

        env.events()
            .publish((OracleEvent::NodeUpdated, config.admin), new_node);
        Ok(())
    }

    pub fn pause(env: Env) -> Result<(), OracleError> {
        let mut config = Storage::get_config(&env)?;
        config.admin.require_auth();
        config.paused = true;
        Storage::set_config(&env, &config);
        Ok(())
    }

    pub fn unpause(env: Env) -> Result<(), OracleError> {
        let mut config = Storage::get_config(&env)?;
        config.admin.require_auth();
        config.paused = false;
        Storage::set_config(&env, &config);
        Ok(())
    }
}
