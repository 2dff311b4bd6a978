pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::http::ReqwestTransport;
pub use config::{cli::LocalFiles, TomlConfig};
pub use crate::core::{
    flow::{NextStep, SubmissionFlow, UserNotice},
    progress::{ProgressSink, UploadProgress},
    recovery::SubmissionClient,
};
pub use domain::model::{
    Attachment, Confirmation, PollPolicy, PollResult, SubmissionOutcome, SubmissionReport,
    SubmissionRequest,
};
pub use domain::correction::{CorrectionDetails, CorrectionForm, CorrectionValue};
pub use domain::registration::{Preference, RegistrationForm};
pub use utils::error::{Result, SubmitError};
