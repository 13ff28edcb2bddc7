use soroban_sdk::{contracterror, contracttype, Address, BytesN, String};

/// How long after `coverage_end` an unanswered claim request keeps a policy
/// from expiring.
pub const DEFAULT_CLAIM_GRACE: u64 = 86_400;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum FlowError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidAmount = 4,
    InvalidCoverageWindow = 5,
    CoverageStartInPast = 6,
    PurchaseWindowClosed = 7,
    InsufficientCapacity = 8,
    PolicyNotFound = 9,
    PolicyNotActive = 10,
    RequestAlreadyPending = 11,
    UnknownRequest = 12,
    ResponseParseError = 13,
    InvalidSignature = 14,
    SignatureExpired = 15,
    SignatureRequired = 16,
    ClaimTooEarly = 17,
    CoverageNotEnded = 18,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PolicyStatus {
    Active = 1,
    Expired = 2,
    SettledPaid = 3,
    SettledDeclined = 4,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlowConfig {
    pub admin: Address,
    pub pool: Address,
    pub oracle: Address,
    pub sig_manager: Option<Address>,
    pub delay_threshold: u32, // minutes of delay that trigger a payout
    pub query_path: String,   // field the oracle node extracts
    pub frozen_time: u64,     // seconds before departure when sales stop
    pub claim_grace: u64,     // seconds a pending request may outlive coverage
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Policy {
    pub id: u64,
    pub buyer: Address,
    pub product_type: u32,
    pub flight_number: String,
    pub premium: i128,
    pub payoff: i128,
    pub purchase_time: u64,
    pub coverage_start: u64, // scheduled departure
    pub coverage_end: u64,
    pub status: PolicyStatus,
}

/// Terms the buyer asks to be covered for.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PolicyApplication {
    pub product_type: u32,
    pub flight_number: String,
    pub premium: i128,
    pub payoff: i128,
    pub coverage_start: u64,
    pub coverage_end: u64,
}

/// Off-chain pricing approval for an application.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Approval {
    pub signer: BytesN<32>,
    pub signature: BytesN<64>,
    pub deadline: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingRequest {
    pub request_id: u64,
    pub policy_id: u64,
    pub submitted_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FlowEvent {
    PolicyPurchased,
    ClaimRequested,
    PolicySettled,
    PolicyExpired,
    ConfigUpdated,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Config,
    PolicyCounter,
    RequestCounter,
    Policy(u64),
    UserPolicies(Address),
    Request(u64),
    PolicyRequest(u64),
}
