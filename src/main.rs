use actix_web::middleware::{Compress, DefaultHeaders};
use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tracing::info;

use snaplink::api::shortener_routes;
use snaplink::config::AppConfig;
use snaplink::services::ShortenerService;
use snaplink::store::StoreFactory;
use snaplink::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load();

    // Keep the guard alive for the whole run so log writes are flushed.
    let _log_guard = init_logging(&config.logging);

    let store = StoreFactory::create(&config.store)
        .await
        .context("Failed to create store backend")?;
    info!("Using store backend: {}", store.backend_name());

    let service = web::Data::new(ShortenerService::new(
        store,
        config.store.collection.clone(),
        config.shortener.max_token_attempts,
    ));

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting server at http://{}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Methods", "POST, GET"))
                    .add(("Access-Control-Allow-Headers", "Content-Type")),
            )
            .service(shortener_routes())
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await?;

    Ok(())
}
