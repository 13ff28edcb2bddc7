#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contractmeta, contracttype, symbol_short,
    xdr::ToXdr, Address, Bytes, BytesN, Env, Symbol,
};


contractmeta!(
    key = "Description",
    val = "Registry of ed25519 keys allowed to approve policy applications"
);

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum SigError {
    NotAuthorized = 1,
    AdminNotFound = 2,
    AlreadyInitialized = 3,
    SignerAlreadyExists = 4,
    SignerNotFound = 5,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SigEvent {
    SignerAdded,
    SignerRemoved,
}

// Storage keys
const ADMIN: Symbol = symbol_short!("ADMIN");
const SIGNER: Symbol = symbol_short!("SIGNER");

#[contract]
pub struct SigManagerContract;

#[contractimpl]
impl SigManagerContract {
    pub fn initialize(env: Env, admin: Address) -> Result<(), SigError> {
        if env.storage().instance().has(&ADMIN) {
            return Err(SigError::AlreadyInitialized);
        }
        admin.require_auth();
        env.storage().instance().set(&ADMIN, &admin);
        Ok(())
    }

    pub fn add_signer(env: Env, admin: Address, signer: BytesN<32>) -> Result<(), SigError> {
        Self::require_admin(&env, &admin)?;

        let key = (SIGNER, signer.clone());
        if env.storage().persistent().has(&key) {
            return Err(SigError::SignerAlreadyExists);
        }
        env.storage().persistent().set(&key, &true);

        env.events().publish((SigEvent::SignerAdded, admin), signer);
        Ok(())
    }

    pub fn remove_signer(env: Env, admin: Address, signer: BytesN<32>) -> Result<(), SigError> {
        Self::require_admin(&env, &admin)?;

        let key = (SIGNER, signer.clone());
        if !env.storage().persistent().has(&key) {
            return Err(SigError::SignerNotFound);
        }
        env.storage().persistent().remove(&key);

        env.events().publish((SigEvent::SignerRemoved, admin), signer);
        Ok(())
    }

    pub fn is_valid_signer(env: Env, signer: BytesN<32>) -> bool {
        env.storage().persistent().has(&(SIGNER, signer))
    }

    /// Check that a registered signer approved `payload` for `buyer`.
    ///
    /// Returns `false` for an unknown key. A signature that does not match
    /// the message aborts the invocation.
    pub fn verify(
        env: Env,
        buyer: Address,
        payload: Bytes,
        signer: BytesN<32>,
        signature: BytesN<64>,
    ) -> bool {
        if !Self::is_valid_signer(env.clone(), signer.clone()) {
            return false;
        }

        let message = (buyer, payload).to_xdr(&env);
        env.crypto().ed25519_verify(&signer, &message, &signature);
        true
    }

    pub fn get_admin(env: Env) -> Option<Address> {
        env.storage().instance().get(&ADMIN)
    }

    // Helper functions
    fn require_admin(env: &Env, admin: &Address) -> Result<(), SigError> {
        admin.require_auth();

        let stored_admin: Option<Address> = env.storage().instance().get(&ADMIN);

        match stored_admin {
            Some(stored) if stored == *admin => Ok(()),
            Some(_) => Err(SigError::NotAuthorized),
            None => Err(SigError::AdminNotFound),
        }
    }
}
