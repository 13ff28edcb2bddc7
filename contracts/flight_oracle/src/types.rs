use soroban_sdk::{contracterror, contracttype, Address, String};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum OracleError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    NotFound = 4,
    DuplicateRequest = 5,
    Paused = 6,
}

/// A flight status lookup waiting for the off-chain node.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Query {
    pub subject: String, // flight number
    pub path: String,    // field to extract from the flight record
    pub timestamp: u64,  // scheduled departure
    pub submitted_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub admin: Address,
    pub node: Address,
    pub paused: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OracleEvent {
    QuerySubmitted,
    QueryFulfilled,
    NodeUpdated,
}
