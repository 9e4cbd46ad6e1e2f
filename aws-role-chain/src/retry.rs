/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Retry policies for STS clients.
//!
//! IAM is eventually consistent. When a remote service has just added a role to the trust policy
//! of an intermediary role, an `AssumeRole` call issued right after can be rejected with `401`,
//! `403` or `404` until the change has propagated. [`RetryPolicy::eventual_consistency`] retries
//! those status codes on top of the SDK's standard transient errors (throttling and `5xx`).

use aws_smithy_runtime::client::retries::classifiers::HttpStatusCodeClassifier;
use aws_smithy_types::retry::RetryConfig;
use std::borrow::Cow;
use std::time::Duration;

// TODO(trust-propagation): 401 is less obviously a propagation delay than 403 and 404 and may
// mask genuine authentication failures. Revisit once there is data on which codes IAM returns.
/// Status codes retried while a trust policy change propagates through IAM.
pub const EVENTUAL_CONSISTENCY_STATUS_CODES: &[u16] = &[401, 403, 404];

/// Maximum attempts, including the initial one, of an eventually consistent call.
pub const MAX_ATTEMPTS: u32 = 5;

/// Upper bound of the exponential backoff between two attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(20);

const STANDARD_MAX_ATTEMPTS: u32 = 3;

/// How an STS client retries failed calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    max_backoff: Duration,
    retryable_status_codes: Cow<'static, [u16]>,
}

impl RetryPolicy {
    /// The SDK's standard retry behavior: 3 attempts, only throttling and transient errors retried.
    pub fn standard() -> Self {
        Self {
            max_attempts: STANDARD_MAX_ATTEMPTS,
            max_backoff: MAX_BACKOFF,
            retryable_status_codes: Cow::Borrowed(&[]),
        }
    }

    /// The policy of every hop after the seed: 5 attempts, 20 second backoff ceiling, and
    /// [`EVENTUAL_CONSISTENCY_STATUS_CODES`] retried.
    pub fn eventual_consistency() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            max_backoff: MAX_BACKOFF,
            retryable_status_codes: Cow::Borrowed(EVENTUAL_CONSISTENCY_STATUS_CODES),
        }
    }

    /// Maximum number of attempts, including the initial one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound of the backoff between two attempts.
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Status codes retried in addition to the SDK's transient errors.
    pub fn retryable_status_codes(&self) -> &[u16] {
        &self.retryable_status_codes
    }

    /// The SDK retry configuration implementing this policy.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::standard()
            .with_max_attempts(self.max_attempts)
            .with_max_backoff(self.max_backoff)
    }

    /// The classifier retrying the additional status codes, if there are any.
    pub fn status_code_classifier(&self) -> Option<HttpStatusCodeClassifier> {
        if self.retryable_status_codes.is_empty() {
            None
        } else {
            Some(HttpStatusCodeClassifier::new_from_codes(
                self.retryable_status_codes.clone(),
            ))
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
