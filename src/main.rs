use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use teachsmart_gateway::config::LoggingSettings;
use teachsmart_gateway::{configure_routes, handle_json_payload_error, AppState, Settings};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match logging.format.as_str() {
        "pretty" => subscriber.pretty().init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.init(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    init_tracing(&settings.logging);
    info!("Starting TeachSmart gateway...");

    let app_state = AppState::from_settings(&settings);

    if let Err(e) = app_state.uploads.prepare().await {
        error!(
            "Failed to create uploads folder {}: {}",
            app_state.uploads.dir().display(),
            e
        );
        return Err(e);
    }

    info!(
        "Workers: {} {} (timeout {}s), uploads in {}",
        settings.scripts.interpreter,
        settings.scripts.scripts_dir.display(),
        settings.scripts.timeout_secs,
        app_state.uploads.dir().display()
    );

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Server is running on {}:{}", host, port);

    let mut server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(configure_routes)
    });

    if let Some(workers) = settings.server.workers {
        server = server.workers(workers);
    }

    server.bind((host, port))?.run().await
}
