//! Single preset run: one `TestCase` drives one `JobRun` from pre-checks
//! through submission and polling to a pass/fail verdict.
//!
//! Every failure is contained in the returned `TestOutcome`; nothing here
//! propagates an error to the caller.

mod job_run;
mod policy;
mod test_case;
mod types;

pub use job_run::{JobRun, JobRunError};
pub use policy::PollPolicy;
pub use test_case::{curate_error, TestCase};
pub use types::{FailureKind, TestFailure, TestOutcome};
