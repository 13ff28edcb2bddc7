//! Client-side views of the contracts the policy flow calls. Only the
//! generated clients are used; the traits themselves are never implemented.

use soroban_sdk::{contractclient, Address, Bytes, BytesN, Env, String};

#[allow(dead_code)]
#[contractclient(name = "PoolClient")]
pub trait PoolInterface {
    fn can_underwrite(env: Env, payoff: i128) -> bool;
    fn lock_collateral(env: Env, caller: Address, payoff: i128);
    fn release_collateral(env: Env, caller: Address, payoff: i128);
    fn collect_premium(env: Env, caller: Address, buyer: Address, amount: i128);
    fn pay_claim(env: Env, caller: Address, buyer: Address, payoff: i128);
}

#[allow(dead_code)]
#[contractclient(name = "OracleClient")]
pub trait OracleInterface {
    fn submit_query(
        env: Env,
        consumer: Address,
        request_id: u64,
        subject: String,
        path: String,
        timestamp: u64,
    );
}

#[allow(dead_code)]
#[contractclient(name = "SigManagerClient")]
pub trait SigManagerInterface {
    fn verify(
        env: Env,
        buyer: Address,
        payload: Bytes,
        signer: BytesN<32>,
        signature: BytesN<64>,
    ) -> bool;
}
