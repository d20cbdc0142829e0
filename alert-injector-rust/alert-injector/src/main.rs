use std::process::ExitCode;

use alert_injector::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = match cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(status) => return status.into(),
    };

    cli::run(cli).await.into()
}
