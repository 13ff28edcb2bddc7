#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, contracttype, Address, Env, String};

//
// ──────────────────────────────────────────────────────────
// DATA KEYS
// ──────────────────────────────────────────────────────────
//

#[contracttype]
pub enum DataKey {
    Metadata,         // TokenMetadata
    Minter,           // Address holding the mint authority
    TotalSupply,      // i128
    Balance(Address), // i128 per holder
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TokenEvent {
    MinterPassed,
    Minted,
    Transferred,
}

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum TokenError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    NotMinter = 3,
    InvalidAmount = 4,
    InsufficientBalance = 5,
}

//
// ──────────────────────────────────────────────────────────
// CONTRACT
// ──────────────────────────────────────────────────────────
//

/// Emission reward token. A single address holds the mint authority; it starts
/// with the deployer and can only be handed on by whoever currently holds it.
#[contract]
pub struct RewardToken;

#[contractimpl]
impl RewardToken {
    pub fn initialize(
        env: Env,
        admin: Address,
        name: String,
        symbol: String,
        decimals: u32,
    ) -> Result<(), TokenError> {
        if env.storage().instance().has(&DataKey::Metadata) {
            return Err(TokenError::AlreadyInitialized);
        }
        admin.require_auth();

        let metadata = TokenMetadata {
            name,
            symbol,
            decimals,
        };
        env.storage().instance().set(&DataKey::Metadata, &metadata);
        env.storage().instance().set(&DataKey::Minter, &admin);
        env.storage().instance().set(&DataKey::TotalSupply, &0i128);
        Ok(())
    }

    /// Hand the mint authority to `new_minter`. Only the current holder may do
    /// this, so once it is passed to a contract that never calls this entry
    /// point the hand-over cannot be undone.
    pub fn pass_minter_role(
        env: Env,
        minter: Address,
        new_minter: Address,
    ) -> Result<(), TokenError> {
        minter.require_auth();
        Self::assert_minter(&env, &minter)?;

        env.storage().instance().set(&DataKey::Minter, &new_minter);
        env.events()
            .publish((TokenEvent::MinterPassed, minter), new_minter);
        Ok(())
    }

    pub fn mint(env: Env, minter: Address, to: Address, amount: i128) -> Result<(), TokenError> {
        minter.require_auth();
        Self::assert_minter(&env, &minter)?;
        if amount <= 0 {
            return Err(TokenError::InvalidAmount);
        }

        let supply = Self::total_supply(env.clone());
        let balance = Self::balance(env.clone(), to.clone());
        env.storage()
            .instance()
            .set(&DataKey::TotalSupply, &(supply + amount));
        env.storage()
            .persistent()
            .set(&DataKey::Balance(to.clone()), &(balance + amount));

        env.events().publish((TokenEvent::Minted, to), amount);
        Ok(())
    }

    pub fn transfer(env: Env, from: Address, to: Address, amount: i128) -> Result<(), TokenError> {
        from.require_auth();
        if amount <= 0 {
            return Err(TokenError::InvalidAmount);
        }

        let from_balance = Self::balance(env.clone(), from.clone());
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance);
        }
        env.storage()
            .persistent()
            .set(&DataKey::Balance(from.clone()), &(from_balance - amount));
        let to_balance = Self::balance(env.clone(), to.clone());
        env.storage()
            .persistent()
            .set(&DataKey::Balance(to.clone()), &(to_balance + amount));

        env.events().publish((TokenEvent::Transferred, from, to), amount);
        Ok(())
    }

    // ───────────── VIEW FUNCTIONS ─────────────

    pub fn minter(env: Env) -> Result<Address, TokenError> {
        env.storage()
            .instance()
            .get(&DataKey::Minter)
            .ok_or(TokenError::NotInitialized)
    }

    pub fn balance(env: Env, id: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Balance(id))
            .unwrap_or(0)
    }

    pub fn total_supply(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::TotalSupply)
            .unwrap_or(0)
    }

    pub fn name(env: Env) -> Result<String, TokenError> {
        Ok(Self::metadata(&env)?.name)
    }

    pub fn symbol(env: Env) -> Result<String, TokenError> {
        Ok(Self::metadata(&env)?.symbol)
    }

    pub fn decimals(env: Env) -> Result<u32, TokenError> {
        Ok(Self::metadata(&env)?.decimals)
    }

    // ───────────── INTERNAL HELPERS ─────────────

    fn metadata(env: &Env) -> Result<TokenMetadata, TokenError> {
        env.storage()
            .instance()
            .get(&DataKey::Metadata)
            .ok_or(TokenError::NotInitialized)
    }

    fn assert_minter(env: &Env, caller: &Address) -> Result<(), TokenError> {
        let minter: Address = env
            .storage()
            .instance()
            .get(&DataKey::Minter)
            .ok_or(TokenError::NotInitialized)?;
        if minter != *caller {
            return Err(TokenError::NotMinter);
        }
        Ok(())
    }
}
