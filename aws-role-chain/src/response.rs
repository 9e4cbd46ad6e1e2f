/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Credentials as handed back to an operator.

use aws_credential_types::Credentials;
use aws_smithy_types::date_time::Format;
use aws_smithy_types::DateTime;
use aws_types::region::Region;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Temporary credentials together with the region they should be used in.
///
/// `Display` renders a human readable block; [`fmt_export`](Self::fmt_export) renders shell
/// `export` statements.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AwsCredentialsResponse {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    region: String,
    expiration: String,
}

impl AwsCredentialsResponse {
    /// Creates a response for `credentials` used in `region`.
    ///
    /// The expiration is rendered in RFC 3339. Credentials that never expire have an empty
    /// expiration.
    pub fn new(credentials: &Credentials, region: Region) -> Self {
        let expiration = credentials
            .expiry()
            .and_then(|expiry| DateTime::from(expiry).fmt(Format::DateTime).ok())
            .unwrap_or_default();
        Self {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().unwrap_or_default().to_string(),
            region: region.to_string(),
            expiration,
        }
    }

    /// The access key id.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// The session token.
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// The region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The expiration in RFC 3339, empty if the credentials do not expire.
    pub fn expiration(&self) -> &str {
        &self.expiration
    }

    /// Renders `export` statements for a POSIX shell.
    pub fn fmt_export(&self) -> String {
        [
            ("AWS_ACCESS_KEY_ID", &self.access_key_id),
            ("AWS_SECRET_ACCESS_KEY", &self.secret_access_key),
            ("AWS_SESSION_TOKEN", &self.session_token),
            ("AWS_DEFAULT_REGION", &self.region),
        ]
        .iter()
        .map(|(key, value)| format!("export {key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
    }
}

impl From<(&Credentials, Region)> for AwsCredentialsResponse {
    fn from((credentials, region): (&Credentials, Region)) -> Self {
        Self::new(credentials, region)
    }
}

impl fmt::Display for AwsCredentialsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Temporary Credentials:")?;
        writeln!(f, "  AccessKeyId: {}", self.access_key_id)?;
        writeln!(f, "  SecretAccessKey: {}", self.secret_access_key)?;
        writeln!(f, "  SessionToken: {}", self.session_token)?;
        writeln!(f, "  Region: {}", self.region)?;
        write!(f, "  Expires: {}", self.expiration)
    }
}

impl fmt::Debug for AwsCredentialsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentialsResponse")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("region", &self.region)
            .field("expiration", &self.expiration)
            .finish()
    }
}
