use std::sync::Arc;
use std::time::Duration;
use actix_web::{App, HttpServer, web};
use clap::Parser;

use alert_injector::app::fake_pipeline::{self, FakePipeline, FakePipelineConfig};
use alert_injector::infrastructure::clock::TokioClock;
use alert_injector::infrastructure::logger::{LogConfig, Logger};

/// Fake push gateway + alert manager for rehearsing alert tests locally
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    #[arg(long, default_value_t = 9091)]
    port: u16,
    /// Alert reported for every pushed instance
    #[arg(long, default_value = "HighErrorRate")]
    alert_name: String,
    /// Seconds after the first push before the alert turns active
    #[arg(long, default_value_t = 20)]
    fire_after: u64,
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    Logger::new(LogConfig {
        level: args.log_level.clone(),
        extra_targets: vec!["actix_web".to_string(), "fake_pipeline".to_string()],
        ..LogConfig::default()
    })
    .init();

    let pipeline = web::Data::new(FakePipeline::new(
        FakePipelineConfig {
            alert_name: args.alert_name.clone(),
            fire_after: Duration::from_secs(args.fire_after),
            ..FakePipelineConfig::default()
        },
        Arc::new(TokioClock),
    ));

    tracing::info!(
        "🌐 Starting fake pipeline on port {} (alert '{}' after {}s)",
        args.port, args.alert_name, args.fire_after
    );

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(pipeline.clone())
            .configure(fake_pipeline::configure)
    })
    .bind(("0.0.0.0", args.port))?
    .run()
    .await
}
