use clap::{Parser, Subcommand};
use sherullah_submit::core::ConfigProvider;
use sherullah_submit::utils::error::ErrorSeverity;
use sherullah_submit::utils::{logger, validation::Validate};
use sherullah_submit::{
    CliConfig, CorrectionForm, CorrectionValue, LocalFiles, NextStep, Preference,
    RegistrationForm, ReqwestTransport, SubmissionClient, SubmissionFlow, SubmissionOutcome,
    SubmitError, TomlConfig, UploadProgress,
};
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "sherullah-submit")]
#[command(about = "Submit registrations to the portal API with verification after network failures")]
struct Cli {
    #[command(flatten)]
    config: CliConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a new registration with audition files
    Register {
        #[arg(long)]
        full_name: String,

        #[arg(long)]
        its_number: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone_number: String,

        /// AZAAN, TAKHBIRA or BOTH; repeat or comma-separate
        #[arg(long, value_delimiter = ',', required = true)]
        preference: Vec<Preference>,

        /// Audition file (audio or video); repeat up to 6 times
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Print upload progress
        #[arg(long)]
        progress: bool,
    },
    /// Look up a registration by ITS number
    Status {
        #[arg(long)]
        its_number: String,
    },
    /// Show or answer a correction requested by an admin
    Correct {
        /// Token from the correction link
        #[arg(long)]
        token: String,

        /// New value when the correction is for a text field
        #[arg(long, conflicts_with = "files")]
        value: Option<String>,

        /// Replacement audition file; repeat for several
        #[arg(long = "file")]
        files: Vec<PathBuf>,

        /// Print upload progress
        #[arg(long)]
        progress: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.config.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(exit_code_for(&e));
        }
    };

    let verbose = cli.config.verbose || config.verbose_logging();
    if cli.config.json_logs || config.json_logging() {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("Starting sherullah-submit");

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(exit_code_for(&e));
    }

    let mut transport = ReqwestTransport::new();
    if let Some(token) = config.bearer_token() {
        transport = transport.with_bearer_token(token);
    }
    let client = SubmissionClient::new(transport, config);

    let result = match cli.command {
        Command::Register {
            full_name,
            its_number,
            email,
            phone_number,
            preference,
            files,
            progress,
        } => {
            register(
                &client,
                RegistrationDetails {
                    full_name,
                    its_number,
                    email,
                    phone_number,
                    preferences: preference,
                },
                &files,
                progress,
            )
            .await
        }
        Command::Status { its_number } => status(&client, &its_number).await,
        Command::Correct {
            token,
            value,
            files,
            progress,
        } => correct(&client, token, value, &files, progress).await,
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(
                "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(exit_code_for(&e));
        }
    }
}

struct RegistrationDetails {
    full_name: String,
    its_number: String,
    email: String,
    phone_number: String,
    preferences: Vec<Preference>,
}

async fn register(
    client: &SubmissionClient<ReqwestTransport, TomlConfig>,
    details: RegistrationDetails,
    files: &[PathBuf],
    show_progress: bool,
) -> Result<i32, SubmitError> {
    let media_files = LocalFiles::new(".").read_all(files).await?;

    let form = RegistrationForm {
        full_name: details.full_name,
        its_number: details.its_number,
        email: details.email,
        phone_number: details.phone_number,
        preferences: details.preferences,
        media_files,
    };
    form.validate()?;
    let request = form.into_request();

    let cancel = CancellationToken::new();
    let interrupt_token = cancel.clone();
    tokio::spawn(async move {
        if escalate_interrupts(tokio::signal::ctrl_c, interrupt_token).await {
            eprintln!("❌ Aborted. The server may still have received the registration; check it with `status`.");
            std::process::exit(130);
        }
    });

    let (progress_tx, printer) = progress_channel(show_progress);

    let mut flow = SubmissionFlow::new();
    let report = flow
        .run(
            client,
            &request,
            show_progress.then_some(&progress_tx),
            &cancel,
        )
        .await?;

    drop(progress_tx);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let notice = report.outcome.notice();
    tracing::info!(
        outcome = report.outcome.label(),
        polls = report.poll_count(),
        cancelled = report.cancelled,
        "Submission finished"
    );

    match report.outcome.next_step() {
        NextStep::ShowConfirmation => {
            println!("✅ {}: {}", notice.title, notice.message);
            Ok(0)
        }
        NextStep::ShowFieldErrors => {
            eprintln!("❌ {}: {}", notice.title, notice.message);
            Ok(1)
        }
        NextStep::RetryLater => {
            eprintln!("❌ {}: {}", notice.title, notice.message);
            Ok(2)
        }
    }
}

/// First interrupt cancels verification polling. The write cannot be recalled
/// once it is on the wire, so it keeps running until it completes or times out;
/// returns `true` when a second interrupt asks to abandon it.
async fn escalate_interrupts<F, Fut>(mut next_interrupt: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return false;
    }
    tracing::warn!(
        "Interrupted: verification will stop, an upload already in flight runs until it completes or times out"
    );
    eprintln!("⚠️  Stopping. Press Ctrl-C again to abandon an upload that is still in flight.");
    cancel.cancel();

    next_interrupt().await.is_ok()
}

fn progress_channel(show: bool) -> (watch::Sender<UploadProgress>, Option<JoinHandle<()>>) {
    let (tx, rx) = watch::channel(UploadProgress::default());
    let printer = show.then(|| tokio::spawn(print_progress(rx)));
    (tx, printer)
}

async fn print_progress(mut rx: watch::Receiver<UploadProgress>) {
    while rx.changed().await.is_ok() {
        let progress = *rx.borrow();
        let speed = progress
            .bytes_per_second()
            .map(|bps| format!("{:.2} KB/s", bps / 1024.0))
            .unwrap_or_default();
        let remaining = progress
            .remaining()
            .map(|d| format!(", {}s remaining", d.as_secs_f64().ceil() as u64))
            .unwrap_or_default();
        eprint!("\r📤 {:>3}% {}{}   ", progress.percent(), speed, remaining);
        if progress.is_complete() {
            eprintln!();
            break;
        }
    }
}

async fn status(
    client: &SubmissionClient<ReqwestTransport, TomlConfig>,
    its_number: &str,
) -> Result<i32, SubmitError> {
    match client.lookup_status(its_number).await? {
        Some(status) => {
            println!("👤 {} ({})", status.full_name, status.its_number);
            println!("📋 Registered for: {}", status.register_for);
            println!("🏷️  Status: {}", status.label());
            for duty in &status.duties {
                let pending = match duty.request_status.as_deref() {
                    Some("pending") => " (request pending)",
                    _ => "",
                };
                println!("   • {} {} {}{}", duty.date, duty.namaaz, duty.duty_type, pending);
            }
            Ok(0)
        }
        None => {
            println!("🔍 No registration found for ITS {}", its_number);
            Ok(1)
        }
    }
}

async fn correct(
    client: &SubmissionClient<ReqwestTransport, TomlConfig>,
    token: String,
    value: Option<String>,
    files: &[PathBuf],
    show_progress: bool,
) -> Result<i32, SubmitError> {
    let details = match client.fetch_correction(&token).await? {
        Some(details) => details,
        None => {
            println!("🔍 This correction link is invalid or has expired");
            return Ok(1);
        }
    };

    println!("📝 {}", details.admin_message());
    println!("✏️  Field: {}", details.field_label());
    if details.is_resolved() {
        println!("✅ This correction has already been submitted");
        return Ok(0);
    }

    let value = if !files.is_empty() {
        CorrectionValue::Files(LocalFiles::new(".").read_all(files).await?)
    } else if let Some(value) = value {
        CorrectionValue::Text(value)
    } else {
        let flag = if details.wants_files() { "--file" } else { "--value" };
        println!("💡 Pass {} to submit the correction", flag);
        return Ok(0);
    };

    let form = CorrectionForm::new(token, &details, value);
    form.validate()?;

    let (progress_tx, printer) = progress_channel(show_progress);
    let outcome = client
        .resolve_correction(form, show_progress.then_some(&progress_tx))
        .await?;

    drop(progress_tx);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    match &outcome {
        SubmissionOutcome::Success { .. } => {
            println!("✅ Correction Submitted: Thank you, your update has been saved.");
            Ok(0)
        }
        SubmissionOutcome::AlreadyExists { message } => {
            eprintln!("❌ Update failed: {}", message);
            Ok(1)
        }
        other => {
            eprintln!("❌ Update failed: {}", other.notice().message);
            Ok(match other.next_step() {
                NextStep::RetryLater => 2,
                _ => 1,
            })
        }
    }
}

/// Every error exits non-zero; severity picks which code.
fn exit_code_for(e: &SubmitError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[test]
    fn test_every_error_exits_non_zero() {
        let errors = [
            SubmitError::AlreadyInFlight,
            SubmitError::FormValidationError {
                field: "email".to_string(),
                reason: "cannot be empty".to_string(),
            },
            SubmitError::RequestBuildError {
                message: "invalid content type".to_string(),
            },
            SubmitError::TimeoutError(Duration::from_secs(20)),
            SubmitError::MissingConfigError {
                field: "api.base_url".to_string(),
            },
        ];
        for e in &errors {
            assert_ne!(exit_code_for(e), 0, "{} exits as success", e);
        }
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels_second_abandons() {
        let notify = Arc::new(Notify::new());
        let interrupts = {
            let notify = notify.clone();
            move || {
                let notify = notify.clone();
                async move {
                    notify.notified().await;
                    Ok::<(), std::io::Error>(())
                }
            }
        };
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(escalate_interrupts(interrupts, cancel.clone()));

        notify.notify_one();
        tokio::time::timeout(Duration::from_secs(1), cancel.cancelled())
            .await
            .unwrap();
        assert!(!handle.is_finished());

        notify.notify_one();
        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_signal_listener_does_not_cancel() {
        let cancel = CancellationToken::new();
        let interrupts = || async { Err::<(), _>(std::io::Error::other("no signal handler")) };

        assert!(!escalate_interrupts(interrupts, cancel.clone()).await);
        assert!(!cancel.is_cancelled());
    }
}
