use std::env;

use log::*;
use lsk_common::Secret;
use lsk_payment_engine::store::AppwriteConfig;

const DEFAULT_LSK_HOST: &str = "127.0.0.1";
const DEFAULT_LSK_PORT: u16 = 8480;
const DEFAULT_APPWRITE_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
const DEFAULT_DATABASE_ID: &str = "landsalelkdb";
/// The platform's cut of an escrow-release payment, in basis points (2000 = 20%).
const DEFAULT_PLATFORM_FEE_BPS: u32 = 2000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub platform_fee_bps: u32,
    pub payhere: PayHereConfig,
    pub appwrite: AppwriteConfig,
}

/// Credentials for verifying inbound PayHere notifications. The merchant secret is shared with the gateway and is
/// the only thing standing between us and forged payment callbacks, hence the [`Secret`] wrapper.
#[derive(Clone, Debug, Default)]
pub struct PayHereConfig {
    pub merchant_id: String,
    pub merchant_secret: Secret<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LSK_HOST.to_string(),
            port: DEFAULT_LSK_PORT,
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            payhere: PayHereConfig::default(),
            appwrite: AppwriteConfig {
                endpoint: DEFAULT_APPWRITE_ENDPOINT.to_string(),
                project_id: String::default(),
                api_key: Secret::default(),
                database_id: DEFAULT_DATABASE_ID.to_string(),
            },
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LSK_HOST").ok().unwrap_or_else(|| DEFAULT_LSK_HOST.into());
        let port = env::var("LSK_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for LSK_PORT. {e} Using the default, {DEFAULT_LSK_PORT}, instead.");
                    DEFAULT_LSK_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_LSK_PORT);
        let platform_fee_bps = env::var("LSK_PLATFORM_FEE_BPS")
            .map(|s| {
                s.parse::<u32>().ok().filter(|bps| *bps <= 10_000).unwrap_or_else(|| {
                    error!(
                        "🪛️ {s} is not a valid fee in basis points for LSK_PLATFORM_FEE_BPS. Using the default, \
                         {DEFAULT_PLATFORM_FEE_BPS}, instead."
                    );
                    DEFAULT_PLATFORM_FEE_BPS
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PLATFORM_FEE_BPS);
        let payhere = PayHereConfig::from_env_or_default();
        let appwrite = appwrite_config_from_env();
        Self { host, port, platform_fee_bps, payhere, appwrite }
    }
}

impl PayHereConfig {
    pub fn from_env_or_default() -> Self {
        let merchant_id = env::var("LSK_PAYHERE_MERCHANT_ID").ok().unwrap_or_else(|| {
            error!("🪛️ LSK_PAYHERE_MERCHANT_ID is not set. Please set it to your PayHere merchant id.");
            String::default()
        });
        let merchant_secret = env::var("LSK_PAYHERE_MERCHANT_SECRET").map(Secret::new).unwrap_or_else(|_| {
            error!(
                "🚨️ LSK_PAYHERE_MERCHANT_SECRET is not set. Every incoming payment notification will fail \
                 signature verification until it is configured."
            );
            Secret::default()
        });
        Self { merchant_id, merchant_secret }
    }
}

fn appwrite_config_from_env() -> AppwriteConfig {
    let endpoint = env::var("LSK_APPWRITE_ENDPOINT").ok().unwrap_or_else(|| {
        info!("🪛️ LSK_APPWRITE_ENDPOINT is not set. Using the default, {DEFAULT_APPWRITE_ENDPOINT}.");
        DEFAULT_APPWRITE_ENDPOINT.to_string()
    });
    let project_id = env::var("LSK_APPWRITE_PROJECT_ID").ok().unwrap_or_else(|| {
        error!("🪛️ LSK_APPWRITE_PROJECT_ID is not set. Please set it to the marketplace's Appwrite project id.");
        String::default()
    });
    let api_key = env::var("LSK_APPWRITE_API_KEY").map(Secret::new).unwrap_or_else(|_| {
        error!("🪛️ LSK_APPWRITE_API_KEY is not set. Document store calls will be rejected until it is configured.");
        Secret::default()
    });
    let database_id = env::var("LSK_APPWRITE_DATABASE_ID").ok().unwrap_or_else(|| {
        info!("🪛️ LSK_APPWRITE_DATABASE_ID is not set. Using the default, {DEFAULT_DATABASE_ID}.");
        DEFAULT_DATABASE_ID.to_string()
    });
    AppwriteConfig { endpoint, project_id, api_key, database_id }
}
