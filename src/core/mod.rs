pub mod correction;
pub mod flow;
pub mod lookup;
pub mod poll;
pub mod progress;
pub mod recovery;

pub use crate::domain::model::{
    Attachment, Confirmation, PollPolicy, PollRecord, PollResult, SubmissionOutcome,
    SubmissionReport, SubmissionRequest, WriteAttempt,
};
pub use crate::domain::ports::{ConfigProvider, HttpResponse, HttpTransport};
pub use crate::utils::error::Result;
