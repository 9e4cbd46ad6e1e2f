/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Credentials for isolated clusters.
//!
//! [`IsolatedCredentials::fetch`] runs the whole flow:
//! 1. the operator's identity token is exchanged for credentials of the initial role,
//! 2. those credentials seed [`assume_role_sequence`] over the roles of the [`AssumptionSequence`],
//! 3. the credentials of the last role are returned with the configured region.

use crate::chain::{
    assume_role_sequence, AssumeRoleSequenceError, AssumptionSequence, PLACEHOLDER_REGION,
};
use crate::config::ChainConfig;
use crate::policy::{PolicyDocument, PolicyError};
use crate::response::AwsCredentialsResponse;
use crate::sts::{ClientFactory, ClientSettings, SharedAssumeRoleClient};
use crate::token::email_from_token;
use crate::web_identity::{assume_role_with_session_name, WebIdentityError};
use crate::BoxError;
use aws_types::region::Region;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Fetches credentials for an isolated cluster.
#[derive(Clone, Debug)]
pub struct IsolatedCredentials {
    config: ChainConfig,
    client_factory: Arc<dyn ClientFactory>,
    web_identity_client: Option<SharedAssumeRoleClient>,
}

impl IsolatedCredentials {
    /// Creates a flow talking to STS through the AWS SDK.
    pub fn new(config: ChainConfig) -> Self {
        Self::builder(config).build()
    }

    /// Returns a builder allowing the STS clients of the flow to be replaced.
    pub fn builder(config: ChainConfig) -> Builder {
        Builder {
            config,
            client_factory: None,
            web_identity_client: None,
        }
    }

    /// The configuration of this flow.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Obtains credentials for the last role of `sequence`, starting from `token`.
    ///
    /// When `trusted_ips` is given, the session of the `Target-Role-Arn` role is restricted to
    /// those source addresses.
    pub async fn fetch(
        &self,
        token: &str,
        sequence: AssumptionSequence,
        trusted_ips: Option<&[String]>,
    ) -> Result<AwsCredentialsResponse, IsolatedCredentialsError> {
        let span = tracing::info_span!(
            "isolated_credentials",
            initial_role_arn = %self.config.initial_role_arn()
        );
        self.fetch_inner(token, sequence, trusted_ips)
            .instrument(span)
            .await
    }

    async fn fetch_inner(
        &self,
        token: &str,
        sequence: AssumptionSequence,
        trusted_ips: Option<&[String]>,
    ) -> Result<AwsCredentialsResponse, IsolatedCredentialsError> {
        let policy = trusted_ips
            .map(|ips| PolicyDocument::default().restricted_to_ips(ips.iter().cloned()))
            .transpose()?;
        let email = email_from_token(token).map_err(WebIdentityError::from)?;
        let settings = ClientSettings::new(Region::from_static(PLACEHOLDER_REGION))
            .proxy_url(self.config.proxy_url().map(str::to_string));

        let web_identity_client = match &self.web_identity_client {
            Some(client) => client.clone(),
            None => self
                .config
                .sdk_client_factory()
                .anonymous_client(&settings)
                .map_err(IsolatedCredentialsError::ClientConstruction)?,
        };
        let seed_credentials = assume_role_with_session_name(
            web_identity_client.as_ref(),
            token,
            self.config.initial_role_arn(),
            &email,
        )
        .await?;

        let seed_client = self
            .client_factory
            .build_client(&seed_credentials, &settings)
            .map_err(IsolatedCredentialsError::ClientConstruction)?;
        let hops = sequence.into_role_hops(&email, policy.as_ref());
        let credentials = assume_role_sequence(
            seed_client,
            &hops,
            self.config.proxy_url(),
            self.client_factory.as_ref(),
        )
        .await?;
        tracing::info!(
            creds = ?credentials,
            region = %self.config.region(),
            "fetched isolated credentials"
        );
        Ok(AwsCredentialsResponse::new(
            &credentials,
            self.config.region().clone(),
        ))
    }
}

/// Builder for [`IsolatedCredentials`].
#[derive(Debug)]
pub struct Builder {
    config: ChainConfig,
    client_factory: Option<Arc<dyn ClientFactory>>,
    web_identity_client: Option<SharedAssumeRoleClient>,
}

impl Builder {
    /// Replaces the factory building the authenticated clients of the flow.
    pub fn client_factory(mut self, client_factory: impl ClientFactory + 'static) -> Self {
        self.client_factory = Some(Arc::new(client_factory));
        self
    }

    /// Replaces the client performing `AssumeRoleWithWebIdentity`.
    pub fn web_identity_client(mut self, client: SharedAssumeRoleClient) -> Self {
        self.web_identity_client = Some(client);
        self
    }

    /// Builds the flow.
    pub fn build(self) -> IsolatedCredentials {
        let client_factory = self
            .client_factory
            .unwrap_or_else(|| Arc::new(self.config.sdk_client_factory().clone()));
        IsolatedCredentials {
            config: self.config,
            client_factory,
            web_identity_client: self.web_identity_client,
        }
    }
}

/// Error returned by [`IsolatedCredentials::fetch`].
#[derive(Debug)]
#[non_exhaustive]
pub enum IsolatedCredentialsError {
    /// The trusted IP list could not be turned into a session policy.
    Policy(PolicyError),

    /// The identity token could not be exchanged for the initial role.
    WebIdentity(WebIdentityError),

    /// An STS client could not be built.
    ClientConstruction(BoxError),

    /// A role of the assumption sequence could not be assumed.
    Sequence(AssumeRoleSequenceError),
}

impl fmt::Display for IsolatedCredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolatedCredentialsError::Policy(_) => {
                write!(f, "failed to build the source IP session policy")
            }
            IsolatedCredentialsError::WebIdentity(_) => {
                write!(f, "failed to assume the initial role")
            }
            IsolatedCredentialsError::ClientConstruction(_) => {
                write!(f, "failed to build an STS client")
            }
            IsolatedCredentialsError::Sequence(_) => {
                write!(f, "failed to assume the role sequence")
            }
        }
    }
}

impl Error for IsolatedCredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IsolatedCredentialsError::Policy(err) => Some(err),
            IsolatedCredentialsError::WebIdentity(err) => Some(err),
            IsolatedCredentialsError::ClientConstruction(err) => Some(err.as_ref()),
            IsolatedCredentialsError::Sequence(err) => Some(err),
        }
    }
}

impl From<PolicyError> for IsolatedCredentialsError {
    fn from(err: PolicyError) -> Self {
        IsolatedCredentialsError::Policy(err)
    }
}

impl From<WebIdentityError> for IsolatedCredentialsError {
    fn from(err: WebIdentityError) -> Self {
        IsolatedCredentialsError::WebIdentity(err)
    }
}

impl From<AssumeRoleSequenceError> for IsolatedCredentialsError {
    fn from(err: AssumeRoleSequenceError) -> Self {
        IsolatedCredentialsError::Sequence(err)
    }
}
