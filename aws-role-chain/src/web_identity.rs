/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Exchanges a federated identity token for the seed credentials of a role chain.
//!
//! The session is named after the `email` claim of the token, so that CloudTrail records which
//! operator assumed the role. See [`crate::token`] for why the token is not verified here.

use crate::sts::{AssumeRoleClient, WebIdentityRequest};
use crate::token::{email_from_token, ClaimExtractionError};
use crate::BoxError;
use aws_credential_types::Credentials;
use aws_smithy_types::error::display::DisplayErrorContext;
use std::error::Error;
use std::fmt;
use tracing::Instrument;

/// Assumes `role_arn` with `token` as web identity, under a session named after the token's email.
///
/// No call is made if the email cannot be read from the token. Nothing is retried.
pub async fn assume_role_with_jwt(
    client: &dyn AssumeRoleClient,
    token: &str,
    role_arn: &str,
) -> Result<Credentials, WebIdentityError> {
    let email = email_from_token(token)?;
    assume_role_with_session_name(client, token, role_arn, &email).await
}

/// Assumes `role_arn` with `token` as web identity, under a session named `session_name`.
///
/// For callers that already read the email claim of `token`.
pub async fn assume_role_with_session_name(
    client: &dyn AssumeRoleClient,
    token: &str,
    role_arn: &str,
    session_name: &str,
) -> Result<Credentials, WebIdentityError> {
    let span = tracing::info_span!(
        "assume_role_with_web_identity",
        role_arn = %role_arn,
        session_name = %session_name
    );
    async move {
        let request = WebIdentityRequest::new(role_arn, session_name, token);
        match client.assume_role_with_web_identity(request).await {
            Ok(credentials) => {
                tracing::info!(creds = ?credentials, "assumed role with web identity");
                Ok(credentials)
            }
            Err(err) => {
                tracing::warn!(
                    error = %DisplayErrorContext(&*err),
                    "failed to assume role with web identity"
                );
                Err(WebIdentityError::AssumeRole {
                    role_arn: role_arn.to_string(),
                    source: err,
                })
            }
        }
    }
    .instrument(span)
    .await
}

/// Error returned by [`assume_role_with_jwt`].
#[derive(Debug)]
#[non_exhaustive]
pub enum WebIdentityError {
    /// The session name could not be read from the token.
    ClaimExtraction(ClaimExtractionError),

    /// STS rejected the web identity, e.g. because the token expired or its issuer is not trusted.
    AssumeRole {
        /// The role that could not be assumed.
        role_arn: String,
        /// Underlying failure.
        source: BoxError,
    },
}

impl fmt::Display for WebIdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebIdentityError::ClaimExtraction(_) => {
                write!(f, "could not derive a session name from the identity token")
            }
            WebIdentityError::AssumeRole { role_arn, .. } => {
                write!(f, "failed to assume role `{role_arn}` with web identity")
            }
        }
    }
}

impl Error for WebIdentityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WebIdentityError::ClaimExtraction(err) => Some(err),
            WebIdentityError::AssumeRole { source, .. } => Some(source.as_ref()),
        }
    }
}

impl From<ClaimExtractionError> for WebIdentityError {
    fn from(err: ClaimExtractionError) -> Self {
        WebIdentityError::ClaimExtraction(err)
    }
}
