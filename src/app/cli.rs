use std::future::Future;

use tokio::io::{BufWriter, Stdout};
use tracing::{error, warn};

use super::error::AppError;

/// Exit code for a failed run
pub const EXIT_FAILURE: i32 = 1;

/// Reusable CLI application runner that handles:
/// - Signal handling (SIGINT, SIGTERM, SIGHUP)
/// - Stdout buffering
/// - Exit codes (0 = success, 1 = error, 130 = SIGINT, 143 = SIGTERM, 129 = SIGHUP)
pub struct CliApp {
    name: String,
}

impl CliApp {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Race `main_fn` against termination signals and exit the process.
    ///
    /// `main_fn` gets a buffered stdout and is responsible for flushing it.
    pub async fn run<F, Fut>(self, main_fn: F) -> !
    where
        F: FnOnce(BufWriter<Stdout>) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        let code = self.run_to_exit_code(main_fn).await;
        std::process::exit(code);
    }

    /// Same as `run`, but returns the exit code instead of exiting
    pub async fn run_to_exit_code<F, Fut>(&self, main_fn: F) -> i32
    where
        F: FnOnce(BufWriter<Stdout>) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        let writer = BufWriter::new(tokio::io::stdout());

        tokio::select! {
            result = main_fn(writer) => exit_code(&self.name, result),
            code = wait_for_signal() => code,
        }
    }
}

fn exit_code(name: &str, result: Result<(), AppError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!(app = name, error = %e, "Run failed");
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

/// Wait for SIGINT, SIGTERM or SIGHUP (Ctrl+C elsewhere) and return 128 + signal number
async fn wait_for_signal() -> i32 {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigterm, mut sigint, mut sighup) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::hangup()),
        ) {
            (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
            _ => {
                warn!("Failed to install signal handlers, running without them");
                return std::future::pending().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                warn!("Received SIGTERM");
                143
            }
            _ = sigint.recv() => {
                warn!("Received SIGINT");
                130
            }
            _ = sighup.recv() => {
                warn!("Received SIGHUP");
                129
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Failed to install Ctrl+C handler, running without it");
            return std::future::pending().await;
        }
        warn!("Received Ctrl+C");
        130
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_app_new() {
        let app = CliApp::new("test-app");
        assert_eq!(app.name(), "test-app");
    }

    #[test]
    fn exit_code_for_results() {
        assert_eq!(exit_code("t", Ok(())), 0);
        assert_eq!(
            exit_code("t", Err(AppError::InvalidArguments("x".to_string()))),
            EXIT_FAILURE
        );
    }

    #[tokio::test]
    async fn run_to_exit_code_reports_main_result() {
        let app = CliApp::new("test-app");

        assert_eq!(app.run_to_exit_code(|_| async { Ok(()) }).await, 0);
        assert_eq!(
            app.run_to_exit_code(|_| async {
                Err(AppError::InvalidArguments("bad".to_string()))
            })
            .await,
            EXIT_FAILURE
        );
    }
}
