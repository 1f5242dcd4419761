use std::process::ExitCode;

use corroborate::config::EvidenceConfig;

#[tokio::main]
async fn main() -> ExitCode {
    corroborate::init_tracing();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("usage: corroborate <query...>");
        return ExitCode::from(2);
    }

    match corroborate::run(&query, &EvidenceConfig::from_env()).await {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Evidence run failed");
            ExitCode::FAILURE
        }
    }
}
