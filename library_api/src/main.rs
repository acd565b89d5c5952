use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use paperclip::actix::OpenApiExt;
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use library_api::app_config::{config_app, json_config};
use library_api::books_service::BooksService;
use library_api::repository_factory::create_books_repository;
use library_api::request_context::RequestTimeout;
use library_api::settings::Settings;

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry() -> anyhow::Result<()> {
    let app_name = "library_api";

    // Spans are exported to Jaeger in batches
    global::set_text_map_propagator(TraceContextPropagator::new());
    #[allow(deprecated)]
    let tracer = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(app_name)
        .install_batch(TokioCurrentThread)
        .context("Failed to install OpenTelemetry tracer")?;

    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    // Spans as structured logs on stdout
    let formatting_layer = BunyanFormattingLayer::new(app_name.into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install `tracing` subscriber")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_result = dotenvy::dotenv();
    init_telemetry()?;
    if let Err(err) = dotenv_result {
        tracing::info!("No .env file loaded: {}", err);
    }

    let settings = Settings::load().context("Failed to load settings")?;
    let books_repository = create_books_repository(&settings).await?;
    let request_timeout = RequestTimeout(settings.request_timeout());

    tracing::info!("starting HTTP server at http://0.0.0.0:{}", settings.app_port);

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(Data::new(BooksService::new(books_repository.clone())))
            .app_data(Data::new(request_timeout))
            .app_data(json_config())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind(("0.0.0.0", settings.app_port))
    .with_context(|| format!("Failed to bind port {}", settings.app_port))?
    .run()
    .await?;

    global::shutdown_tracer_provider();
    Ok(())
}
