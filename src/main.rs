use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use warden::bot::{self, AppState};
use warden::cache::{CacheConfig, MemoryTier, ObjectCache, RedisTier, RemoteTier, TieredCacheStore};
use warden::config::Config;
use warden::database::{Database, StoreContext};
use warden::permissions::{AdminRosterCache, TelegramAdmins};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warden=info,teloxide=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting Warden bot...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    info!("Database connected");

    let remote: Arc<dyn RemoteTier> = match &config.redis {
        Some(redis) => {
            info!("Connecting to Redis at {}...", redis.address);
            Arc::new(RedisTier::connect(redis).await?)
        }
        None => {
            warn!("REDIS_ADDRESS not set, remote cache tier is in-process only");
            Arc::new(MemoryTier::new())
        }
    };

    let tiered = TieredCacheStore::new(config.local_cache, remote, config.backend_timeout);
    let ctx = StoreContext::new(ObjectCache::new(tiered), Arc::new(db), config.backend_timeout);
    info!(
        "Cache initialized ({} items / {} bytes local)",
        config.local_cache.max_items, config.local_cache.max_cost
    );

    // Throttle respects Telegram's global, per-chat and per-group limits
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());

    let me = bot.get_me().await?;
    let bot_username = config
        .bot_username
        .clone()
        .unwrap_or_else(|| me.username().to_string());
    info!("Using bot username: @{}", bot_username);

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let rosters = AdminRosterCache::new(
        Arc::new(TelegramAdmins::new(bot.inner().clone())),
        CacheConfig::admin_rosters(),
    );

    let state = AppState::new(ctx, rosters, config.owner_ids.clone(), bot_username);
    let dispatcher = bot::build_dispatcher(bot, state);

    bot::run(dispatcher).await;

    Ok(())
}
