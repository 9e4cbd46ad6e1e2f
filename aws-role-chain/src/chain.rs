/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Sequential role assumption.
//!
//! [`assume_role_sequence`] walks an ordered list of [`RoleHop`]s. Every hop is assumed with a
//! client authenticated by the credentials of the hop before it:
//!
//! ```text
//! seed client ──AssumeRole(hop 0)──▶ creds 0 ──build client──AssumeRole(hop 1)──▶ creds 1 ─ … ─▶ creds N-1
//! ```
//!
//! Only the credentials of the last hop are returned. The first failing hop aborts the sequence.

use crate::policy::PolicyDocument;
use crate::retry::RetryPolicy;
use crate::sts::{
    AssumeRoleClient, AssumeRoleRequest, ClientFactory, ClientSettings, SharedAssumeRoleClient,
};
use crate::BoxError;
use aws_credential_types::Credentials;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_types::region::Region;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use tracing::Instrument;

/// Region of the clients built between hops.
///
/// STS role assumption does not depend on the region; the SDK only requires one to be set.
pub const PLACEHOLDER_REGION: &str = "us-east-1";

/// Name of the assumption sequence entry for the role in the customer account.
pub const TARGET_ROLE_NAME: &str = "Target-Role-Arn";

/// Name of the assumption sequence entry for the customer's organization role.
pub const ORG_ROLE_NAME: &str = "Org-Role-Arn";

/// A single role assumption of a sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct RoleHop {
    role_arn: String,
    session_name: String,
    policy: Option<PolicyDocument>,
}

impl RoleHop {
    /// Creates a hop assuming `role_arn` under `session_name`.
    pub fn new(role_arn: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            session_name: session_name.into(),
            policy: None,
        }
    }

    /// Scopes the assumed session down with an inline session policy.
    pub fn with_policy(mut self, policy: impl Into<Option<PolicyDocument>>) -> Self {
        self.policy = policy.into();
        self
    }

    /// The ARN of the role assumed by this hop.
    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    /// The role session name used by this hop.
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// The inline session policy of this hop.
    pub fn policy(&self) -> Option<&PolicyDocument> {
        self.policy.as_ref()
    }

    fn request(&self) -> AssumeRoleRequest {
        AssumeRoleRequest::new(&self.role_arn, &self.session_name).policy(self.policy.clone())
    }
}

/// A named role ARN of an [`AssumptionSequence`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRoleArn {
    /// Role name, compared against [`TARGET_ROLE_NAME`] and [`ORG_ROLE_NAME`].
    pub name: String,
    /// Role ARN.
    pub arn: String,
}

/// The ordered roles an operator must assume to reach a customer account.
///
/// The sequence is supplied by a remote authorization service as JSON:
/// ```json
/// {
///   "customerRoleSessionName": "customer-session",
///   "assumptionSequence": [
///     { "name": "SRE-Support-Role", "arn": "arn:aws:iam::111111111111:role/support" },
///     { "name": "Target-Role-Arn", "arn": "arn:aws:iam::222222222222:role/target" }
///   ]
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionSequence {
    /// Session name used for the roles in the customer's organization.
    pub customer_role_session_name: String,
    /// The roles to assume, in order.
    pub assumption_sequence: Vec<NamedRoleArn>,
}

impl AssumptionSequence {
    /// Converts the sequence into the hops of [`assume_role_sequence`].
    ///
    /// Roles named [`TARGET_ROLE_NAME`] or [`ORG_ROLE_NAME`] are assumed with the customer role
    /// session name; every other role with `email`. `policy` scopes the [`TARGET_ROLE_NAME`] hop.
    pub fn into_role_hops(self, email: &str, policy: Option<&PolicyDocument>) -> Vec<RoleHop> {
        let customer_session = self.customer_role_session_name;
        self.assumption_sequence
            .into_iter()
            .map(|role| match role.name.as_str() {
                TARGET_ROLE_NAME => {
                    RoleHop::new(role.arn, customer_session.as_str()).with_policy(policy.cloned())
                }
                ORG_ROLE_NAME => RoleHop::new(role.arn, customer_session.as_str()),
                _ => RoleHop::new(role.arn, email),
            })
            .collect()
    }
}

/// Assumes every hop of `hops` in order and returns the credentials of the last one.
///
/// `seed` must already be authenticated for the first hop. After every hop but the last, a new
/// client is built by `factory` from the hop's credentials. That client routes through
/// `proxy_url` when one is given and retries with [`RetryPolicy::eventual_consistency`]: the
/// trust policy of the next role may just have been updated and not be visible yet.
///
/// Fails with [`AssumeRoleSequenceError::EmptySequence`] before any call if `hops` is empty.
pub async fn assume_role_sequence(
    seed: SharedAssumeRoleClient,
    hops: &[RoleHop],
    proxy_url: Option<&str>,
    factory: &dyn ClientFactory,
) -> Result<Credentials, AssumeRoleSequenceError> {
    let span = tracing::info_span!("assume_role_sequence", hops = hops.len());
    async move {
        let (last, intermediate) = hops
            .split_last()
            .ok_or(AssumeRoleSequenceError::EmptySequence)?;
        let settings = ClientSettings::new(Region::from_static(PLACEHOLDER_REGION))
            .proxy_url(proxy_url.map(str::to_string))
            .retry_policy(RetryPolicy::eventual_consistency());

        let mut client = seed;
        for (hop_index, hop) in intermediate.iter().enumerate() {
            let credentials = assume_hop(&client, hop_index, hop).await?;
            client = factory.build_client(&credentials, &settings).map_err(|err| {
                tracing::warn!(
                    hop = hop_index,
                    error = %DisplayErrorContext(&*err),
                    "failed to build client for the next hop"
                );
                AssumeRoleSequenceError::ClientConstruction {
                    hop_index,
                    role_arn: hop.role_arn.clone(),
                    source: err,
                }
            })?;
        }
        let credentials = assume_hop(&client, intermediate.len(), last).await?;
        tracing::info!("assumed every role of the sequence");
        Ok(credentials)
    }
    .instrument(span)
    .await
}

async fn assume_hop(
    client: &SharedAssumeRoleClient,
    hop_index: usize,
    hop: &RoleHop,
) -> Result<Credentials, AssumeRoleSequenceError> {
    let span = tracing::info_span!("assume_role", hop = hop_index, role_arn = %hop.role_arn);
    match client.assume_role(hop.request()).instrument(span).await {
        Ok(credentials) => {
            tracing::debug!(hop = hop_index, creds = ?credentials, "assumed role");
            Ok(credentials)
        }
        Err(err) => {
            tracing::warn!(
                hop = hop_index,
                role_arn = %hop.role_arn,
                error = %DisplayErrorContext(&*err),
                "failed to assume role"
            );
            Err(AssumeRoleSequenceError::HopAssumption {
                hop_index,
                role_arn: hop.role_arn.clone(),
                source: err,
            })
        }
    }
}

/// Error returned by [`assume_role_sequence`].
#[derive(Debug)]
#[non_exhaustive]
pub enum AssumeRoleSequenceError {
    /// The sequence contained no hops. No call was made.
    EmptySequence,

    /// STS did not grant a hop, after retries if the failure was retryable.
    HopAssumption {
        /// Zero-based index of the failing hop.
        hop_index: usize,
        /// Role the hop tried to assume.
        role_arn: String,
        /// Underlying failure.
        source: BoxError,
    },

    /// The client for the hop after `hop_index` could not be built.
    ClientConstruction {
        /// Zero-based index of the hop whose credentials the client was built from.
        hop_index: usize,
        /// Role assumed by that hop.
        role_arn: String,
        /// Underlying failure.
        source: BoxError,
    },
}

impl AssumeRoleSequenceError {
    /// Index of the hop the error happened at, if any.
    pub fn hop_index(&self) -> Option<usize> {
        match self {
            AssumeRoleSequenceError::EmptySequence => None,
            AssumeRoleSequenceError::HopAssumption { hop_index, .. }
            | AssumeRoleSequenceError::ClientConstruction { hop_index, .. } => Some(*hop_index),
        }
    }
}

impl fmt::Display for AssumeRoleSequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssumeRoleSequenceError::EmptySequence => {
                write!(f, "role assumption sequence is empty")
            }
            AssumeRoleSequenceError::HopAssumption {
                hop_index,
                role_arn,
                ..
            } => write!(f, "failed to assume role `{role_arn}` at hop {hop_index}"),
            AssumeRoleSequenceError::ClientConstruction {
                hop_index,
                role_arn,
                ..
            } => write!(
                f,
                "failed to build an STS client from the credentials of `{role_arn}` (hop {hop_index})"
            ),
        }
    }
}

impl Error for AssumeRoleSequenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AssumeRoleSequenceError::EmptySequence => None,
            AssumeRoleSequenceError::HopAssumption { source, .. }
            | AssumeRoleSequenceError::ClientConstruction { source, .. } => Some(source.as_ref()),
        }
    }
}
