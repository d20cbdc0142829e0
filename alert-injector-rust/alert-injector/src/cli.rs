use std::collections::HashMap;
use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use tracing::{debug, warn};

use crate::app::{AlertInjector, AlertVerifier, InjectionReport};
use crate::domain::error::{AlertTestError, Result};
use crate::infrastructure::clock::{Clock, TokioClock};
use crate::infrastructure::config::{Config, ConfigOverrides};
use crate::infrastructure::logger::{LogConfig, Logger};

#[derive(Parser, Debug)]
#[command(name = "alert-injector", version, about = "Alert Test Data Injector")]
pub struct Cli {
    /// Prometheus URL [env: PROMETHEUS_URL] [default: http://prometheus:9090]
    #[arg(long, global = true)]
    pub prometheus_url: Option<String>,
    /// Pushgateway URL [env: PUSHGATEWAY_URL] [default: http://pushgateway:9091]
    #[arg(long, global = true)]
    pub pushgateway_url: Option<String>,
    /// AlertManager URL [env: ALERTMANAGER_URL] [default: http://alertmanager:9093]
    #[arg(long, global = true)]
    pub alertmanager_url: Option<String>,
    /// What to do when the push gateway rejects a batch
    #[arg(long, global = true, value_parser = ["continue", "abort", "threshold"])]
    pub on_push_failure: Option<String>,
    /// Rejected pushes tolerated before aborting with `--on-push-failure threshold`
    #[arg(long, global = true)]
    pub failure_threshold: Option<u32>,
    /// Per-request HTTP timeout in seconds
    #[arg(long, global = true)]
    pub request_timeout: Option<u64>,
    /// Seconds between metric pushes
    #[arg(long, global = true, hide = true)]
    pub push_interval: Option<u64>,
    /// Seconds between alert polls
    #[arg(long, global = true, hide = true)]
    pub poll_interval: Option<u64>,
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// Also write daily-rotated logs to this directory
    #[arg(long, global = true)]
    pub log_dir: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Inject high error rate
    InjectErrorRate {
        /// Service name
        #[arg(long, default_value = "test-service")]
        service: String,
        /// Duration in minutes
        #[arg(long, default_value_t = 5)]
        duration: u64,
    },
    /// Inject high latency
    InjectLatency {
        #[arg(long, default_value = "test-service")]
        service: String,
        /// Latency in milliseconds
        #[arg(long, default_value_t = 2000)]
        latency: u64,
        #[arg(long, default_value_t = 5)]
        duration: u64,
    },
    /// Inject resource exhaustion
    InjectResourceExhaustion {
        #[arg(long, default_value = "test-service")]
        service: String,
        /// Resource type
        #[arg(long, default_value = "memory", value_parser = ["memory", "cpu"])]
        resource: String,
        /// Usage percentage
        #[arg(long, default_value_t = 95)]
        usage: u32,
        #[arg(long, default_value_t = 5)]
        duration: u64,
    },
    /// Clear injected metrics
    Clear {
        #[arg(long, default_value = "test-service")]
        service: String,
    },
    /// Wait for alert to fire
    WaitForAlert {
        /// Alert name
        alert_name: String,
        /// Timeout in seconds
        #[arg(long, default_value_t = 180)]
        timeout: u64,
    },
    /// Check that an active alert carries the given labels
    VerifyLabels {
        alert_name: String,
        /// Expected label as key=value; repeatable
        #[arg(long = "label", required = true, value_parser = parse_key_value)]
        labels: Vec<(String, String)>,
    },
    /// Check that an active alert carries the given annotation keys
    VerifyAnnotations {
        alert_name: String,
        /// Required annotation key; repeatable
        #[arg(long = "annotation", required = true)]
        annotations: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    Interrupted,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::Interrupted => 130,
        }
    }

    fn from_success(success: bool) -> Self {
        if success { ExitStatus::Success } else { ExitStatus::Failure }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

pub fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            prometheus_url: self.prometheus_url.clone(),
            pushgateway_url: self.pushgateway_url.clone(),
            alertmanager_url: self.alertmanager_url.clone(),
            request_timeout_secs: self.request_timeout,
            push_interval_secs: self.push_interval,
            poll_interval_secs: self.poll_interval,
            failure_policy: self.on_push_failure.clone(),
            failure_threshold: self.failure_threshold,
            log_level: self.log_level.clone(),
            log_directory: self.log_dir.clone(),
        }
    }
}

/// Parses arguments; `Err` carries the exit status when parsing ends the run
/// (help/version print and succeed, anything else fails with 1).
pub fn parse_args<I, T>(args: I) -> std::result::Result<Cli, ExitStatus>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(cli),
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Err(ExitStatus::Success),
                _ => Err(ExitStatus::Failure),
            }
        }
    }
}

/// Resolves configuration, sets up logging and runs the selected command
/// until it finishes or the user interrupts it.
pub async fn run(cli: Cli) -> ExitStatus {
    let Some(command) = cli.command.clone() else {
        let _ = Cli::command().print_help();
        return ExitStatus::Failure;
    };

    let config = match Config::resolve(&cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            return ExitStatus::Failure;
        }
    };

    Logger::new(LogConfig {
        level: config.log_level.clone(),
        log_directory: config.log_directory.clone(),
        ..LogConfig::default()
    })
    .init();
    debug!("Configuration: {}", config.summary());

    let clock: Arc<dyn Clock> = Arc::new(TokioClock);
    tokio::select! {
        status = execute(&command, &config, clock) => status,
        _ = interrupted() => {
            println!("\n\n{} Interrupted by user", "✗".red());
            ExitStatus::Interrupted
        }
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Runs one command against the configured endpoints.
pub async fn execute(command: &Command, config: &Config, clock: Arc<dyn Clock>) -> ExitStatus {
    match command {
        Command::InjectErrorRate { service, duration } => {
            let outcome = match AlertInjector::new(config, clock) {
                Ok(injector) => injector.inject_high_error_rate(service, *duration).await,
                Err(e) => Err(e),
            };
            report_injection(outcome)
        }
        Command::InjectLatency {
            service,
            latency,
            duration,
        } => {
            let outcome = match AlertInjector::new(config, clock) {
                Ok(injector) => injector.inject_high_latency(service, *latency, *duration).await,
                Err(e) => Err(e),
            };
            report_injection(outcome)
        }
        Command::InjectResourceExhaustion {
            service,
            resource,
            usage,
            duration,
        } => {
            let outcome = match AlertInjector::new(config, clock) {
                Ok(injector) => {
                    injector
                        .inject_resource_exhaustion(service, resource, *usage, *duration)
                        .await
                }
                Err(e) => Err(e),
            };
            report_injection(outcome)
        }
        Command::Clear { service } => {
            let outcome = match AlertInjector::new(config, clock) {
                Ok(injector) => injector.clear_injected_metrics(service).await,
                Err(e) => Err(e),
            };
            report(outcome.map(|_| format!("Metrics cleared for {service}")))
        }
        Command::WaitForAlert { alert_name, timeout } => {
            let outcome = match AlertVerifier::new(config, clock) {
                Ok(verifier) => {
                    verifier
                        .wait_for_alert(alert_name, Duration::from_secs(*timeout))
                        .await
                }
                Err(e) => Err(e),
            };
            report(outcome.map(|elapsed| {
                format!("Alert '{}' fired after {}s", alert_name, elapsed.as_secs())
            }))
        }
        Command::VerifyLabels { alert_name, labels } => {
            let expected: HashMap<String, String> = labels.iter().cloned().collect();
            let outcome = match AlertVerifier::new(config, clock) {
                Ok(verifier) => verifier.verify_alert_labels(alert_name, &expected).await,
                Err(e) => Err(e),
            };
            report(outcome.map(|_| format!("All labels verified for '{alert_name}'")))
        }
        Command::VerifyAnnotations {
            alert_name,
            annotations,
        } => {
            let outcome = match AlertVerifier::new(config, clock) {
                Ok(verifier) => {
                    verifier
                        .verify_alert_annotations(alert_name, annotations.as_slice())
                        .await
                }
                Err(e) => Err(e),
            };
            report(outcome.map(|_| format!("All annotations present for '{alert_name}'")))
        }
    }
}

fn report_injection(outcome: Result<InjectionReport>) -> ExitStatus {
    match outcome {
        Ok(report) if report.succeeded() => {
            println!("{} Injected {} metric batches", "✓".green(), report.pushes_accepted);
            ExitStatus::Success
        }
        Ok(report) => {
            println!(
                "{} {} of {} pushes rejected{}",
                "✗".red(),
                report.pushes_rejected,
                report.pushes_attempted,
                if report.aborted_by_policy { " (aborted)" } else { "" }
            );
            ExitStatus::Failure
        }
        Err(e) => report_error(&e),
    }
}

fn report(outcome: Result<String>) -> ExitStatus {
    match outcome {
        Ok(message) => {
            println!("{} {}", "✓".green(), message);
            ExitStatus::from_success(true)
        }
        Err(e) => report_error(&e),
    }
}

fn report_error(err: &AlertTestError) -> ExitStatus {
    println!("{} {}", "✗".red(), err);
    ExitStatus::Failure
}
