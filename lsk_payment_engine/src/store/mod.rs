mod appwrite;

pub use appwrite::{AppwriteConfig, AppwriteStore};

/// Collection names in the marketplace database.
pub mod collections {
    pub const TRANSACTIONS: &str = "transactions";
    pub const WALLETS: &str = "user_wallets";
    pub const LISTINGS: &str = "listings";
    pub const AGENTS: &str = "agents";
    pub const AGENT_PAYMENTS: &str = "agent_payments";
}
