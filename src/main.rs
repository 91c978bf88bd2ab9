use std::sync::Arc;

use sponsor_indexer::application::IngestWorker;
use sponsor_indexer::config::AppConfig;
use sponsor_indexer::domain::services::DisabledDemographics;
use sponsor_indexer::infrastructure::api::{ApiGateway, StaticToken};
use sponsor_indexer::infrastructure::persistence::DbPool;
use sponsor_indexer::utils::logging;

#[tokio::main]
async fn main() {
    logging::init_logger();

    let config = AppConfig::from_env();
    if config.api.token.is_empty() {
        logging::log_error("GITHUB_TOKEN is not set, all API calls would fail");
        return;
    }

    let tokens = Arc::new(StaticToken::new(config.api.token.clone()));
    let gateway = match ApiGateway::new(&config, tokens.clone()) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            logging::log_error(&format!("Failed to create API gateway: {}", e));
            return;
        }
    };

    match DbPool::new(&config).await {
        Ok(db_pool) => {
            let mut worker = IngestWorker::new(
                config,
                db_pool,
                gateway,
                tokens,
                Arc::new(DisabledDemographics),
            );

            tokio::select! {
                result = worker.run() => {
                    if let Err(e) = result {
                        logging::log_error(&format!("Worker stopped: {}", e));
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    logging::log_info("Shutdown signal received, stopping worker");
                }
            }
        }
        Err(e) => logging::log_error(&format!("Failed to connect to database: {}", e)),
    }
}
