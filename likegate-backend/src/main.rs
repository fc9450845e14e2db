use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::Bot;

mod channels;
mod config;
mod controllers;
mod db;
mod error;
mod fulfillment;
mod integrations;
mod like_service;
mod membership;
mod messages;
mod models;
mod rate_limiter;
mod scheduler;
#[cfg(test)]
mod testing;

use channels::telegram::{self, TelegramContext, TelegramMembershipOracle, TelegramNotifier};
use channels::{LogNotifier, Notifier};
use config::Config;
use db::Database;
use fulfillment::HttpFulfillmentExecutor;
use integrations::{LinkShortener, PlayerInfoClient};
use like_service::LikeService;
use membership::MembershipGate;
use scheduler::{Reconciler, ReconcilerConfig};

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    /// Present only when this process runs the reconciler
    pub reconciler: Option<Arc<Reconciler>>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, format!("Failed to initialize database: {}", e))
    })?;
    let db = Arc::new(db);

    let http = reqwest::Client::builder()
        .user_agent(concat!("likegate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("Failed to build HTTP client: {}", e)))?;
    let lookup_timeout = Duration::from_secs(config.lookup_timeout_secs);

    let bot = config.bot_token.as_deref().map(Bot::new);
    if bot.is_none() {
        log::warn!("BOT_TOKEN not set - Telegram front-end disabled, notifications go to the log");
    }

    let gate = match (&bot, &config.required_channel) {
        (Some(bot), Some(group)) => {
            log::info!("Requiring membership in {}", group);
            MembershipGate::new(Arc::new(TelegramMembershipOracle::new(bot.clone(), group)))
        }
        (None, Some(group)) => {
            log::warn!("REQUIRED_CHANNEL {} ignored without a bot token", group);
            MembershipGate::open()
        }
        _ => MembershipGate::open(),
    };

    let service = Arc::new(LikeService::new(
        db.clone(),
        gate,
        PlayerInfoClient::new(http.clone(), config.player_info_api.clone(), lookup_timeout),
        LinkShortener::new(
            http.clone(),
            config.shortener_api_url.clone(),
            config.shortener_api_key.clone(),
            lookup_timeout,
        ),
        config.public_base_url.clone(),
        chrono::Duration::minutes(config.request_ttl_minutes),
        config.admin_ids.clone(),
    ));

    let notifier: Arc<dyn Notifier> = match &bot {
        Some(bot) => Arc::new(TelegramNotifier::new(bot.clone())),
        None => Arc::new(LogNotifier),
    };

    // Reconciler runs only when there is an API to fulfill against
    let mut reconciler_shutdown_tx = None;
    let reconciler = match &config.like_api_url {
        Some(like_api_url) => {
            let executor = Arc::new(HttpFulfillmentExecutor::new(
                http.clone(),
                like_api_url.clone(),
                Duration::from_secs(config.fulfillment_timeout_secs),
            ));
            let reconciler = Arc::new(Reconciler::new(
                db.clone(),
                executor,
                notifier.clone(),
                ReconcilerConfig::from(&config),
            ));

            let handle = Arc::clone(&reconciler);
            let (tx, rx) = tokio::sync::oneshot::channel();
            tokio::spawn(async move {
                handle.start(rx).await;
            });
            reconciler_shutdown_tx = Some(tx);
            Some(reconciler)
        }
        None => {
            log::warn!("LIKE_API_URL not set - reconciler disabled, verified requests will queue");
            None
        }
    };

    let mut telegram_shutdown_tx = None;
    if let Some(bot) = bot {
        let ctx = Arc::new(TelegramContext {
            service: service.clone(),
            required_group: config.required_channel.clone(),
            how_to_verify_url: config.how_to_verify_url.clone(),
            vip_access_url: config.vip_access_url.clone(),
        });
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            if let Err(e) = telegram::start_telegram_listener(bot, ctx, rx).await {
                log::error!("Telegram listener error: {}", e);
            }
        });
        telegram_shutdown_tx = Some(tx);
    }

    log::info!("Starting likegate server on port {}", port);
    log::info!("Verification links use {}", config.public_base_url);

    let state = web::Data::new(AppState {
        db: Arc::clone(&db),
        config: config.clone(),
        reconciler,
    });

    let result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(controllers::health::config)
            .configure(controllers::verify::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await;

    log::info!("HTTP server stopped, shutting down workers");
    if let Some(tx) = reconciler_shutdown_tx {
        let _ = tx.send(());
    }
    if let Some(tx) = telegram_shutdown_tx {
        let _ = tx.send(());
    }
    // Give the reconciler a moment to release its lease
    tokio::time::sleep(Duration::from_millis(200)).await;

    result
}
