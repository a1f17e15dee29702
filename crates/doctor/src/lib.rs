//! Checks that a stored account can still authenticate and post.

pub mod harness;
pub mod report;

pub use {
    harness::{HarnessOptions, default_test_message, verify_account},
    report::{AccountSummary, ExpiryStatus, Failure, FailureCategory, PublishedPost, VerificationReport},
};
