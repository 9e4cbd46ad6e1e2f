/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The STS operations the credential chain depends on.
//!
//! Nothing in this crate depends on a concrete SDK client. Role assumption goes through
//! [`AssumeRoleClient`], and the per-hop clients of a chain are produced by a [`ClientFactory`].
//! [`SdkClientFactory`] and the `AssumeRoleClient` implementation for [`aws_sdk_sts::Client`]
//! connect both to the AWS SDK; tests substitute fakes.

use crate::policy::PolicyDocument;
use crate::retry::RetryPolicy;
use crate::BoxError;
use aws_credential_types::Credentials;
use aws_types::region::Region;
use std::fmt;
use std::sync::Arc;

pub mod future;
mod sdk;

pub use sdk::SdkClientFactory;

/// Result type of the [`AssumeRoleClient`] operations.
pub type Result = std::result::Result<Credentials, BoxError>;

/// Input to an `AssumeRole` call.
#[derive(Clone, Debug, PartialEq)]
pub struct AssumeRoleRequest {
    role_arn: String,
    session_name: String,
    policy: Option<PolicyDocument>,
}

impl AssumeRoleRequest {
    /// Creates a request to assume `role_arn` with the given session name.
    pub fn new(role_arn: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            session_name: session_name.into(),
            policy: None,
        }
    }

    /// Sets an inline session policy that further scopes the assumed role's permissions.
    pub fn policy(mut self, policy: impl Into<Option<PolicyDocument>>) -> Self {
        self.policy = policy.into();
        self
    }

    /// The ARN of the role to assume.
    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    /// The role session name.
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// The inline session policy, if any.
    pub fn session_policy(&self) -> Option<&PolicyDocument> {
        self.policy.as_ref()
    }
}

/// Input to an `AssumeRoleWithWebIdentity` call.
#[derive(Clone, PartialEq, Eq)]
pub struct WebIdentityRequest {
    role_arn: String,
    session_name: String,
    web_identity_token: String,
}

impl WebIdentityRequest {
    /// Creates a request exchanging `web_identity_token` for credentials of `role_arn`.
    pub fn new(
        role_arn: impl Into<String>,
        session_name: impl Into<String>,
        web_identity_token: impl Into<String>,
    ) -> Self {
        Self {
            role_arn: role_arn.into(),
            session_name: session_name.into(),
            web_identity_token: web_identity_token.into(),
        }
    }

    /// The ARN of the role to assume.
    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    /// The role session name.
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// The raw identity token.
    pub fn web_identity_token(&self) -> &str {
        &self.web_identity_token
    }
}

impl fmt::Debug for WebIdentityRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebIdentityRequest")
            .field("role_arn", &self.role_arn)
            .field("session_name", &self.session_name)
            .field("web_identity_token", &"** redacted **")
            .finish()
    }
}

/// A client able to perform the two STS role assumption operations.
pub trait AssumeRoleClient: Send + Sync + fmt::Debug {
    /// Assumes a role using the credentials this client was built with.
    fn assume_role<'a>(&'a self, request: AssumeRoleRequest) -> future::AssumeRole<'a>;

    /// Exchanges a web identity token for credentials. Requires no credentials of its own.
    fn assume_role_with_web_identity<'a>(
        &'a self,
        request: WebIdentityRequest,
    ) -> future::AssumeRole<'a>;
}

/// Assume role client wrapper that may be shared.
///
/// Newtype wrapper around [`AssumeRoleClient`] that implements `Clone` using an internal `Arc`.
#[derive(Clone, Debug)]
pub struct SharedAssumeRoleClient(Arc<dyn AssumeRoleClient>);

impl SharedAssumeRoleClient {
    /// Create a new [`SharedAssumeRoleClient`] from [`AssumeRoleClient`].
    ///
    /// The given client will be wrapped in an internal `Arc`. If your
    /// client is already in an `Arc`, use `SharedAssumeRoleClient::from(client)` instead.
    pub fn new(client: impl AssumeRoleClient + 'static) -> Self {
        Self(Arc::new(client))
    }
}

impl AsRef<dyn AssumeRoleClient> for SharedAssumeRoleClient {
    fn as_ref(&self) -> &(dyn AssumeRoleClient + 'static) {
        self.0.as_ref()
    }
}

impl From<Arc<dyn AssumeRoleClient>> for SharedAssumeRoleClient {
    fn from(client: Arc<dyn AssumeRoleClient>) -> Self {
        SharedAssumeRoleClient(client)
    }
}

impl AssumeRoleClient for SharedAssumeRoleClient {
    fn assume_role<'a>(&'a self, request: AssumeRoleRequest) -> future::AssumeRole<'a> {
        self.0.assume_role(request)
    }

    fn assume_role_with_web_identity<'a>(
        &'a self,
        request: WebIdentityRequest,
    ) -> future::AssumeRole<'a> {
        self.0.assume_role_with_web_identity(request)
    }
}

/// Settings a [`ClientFactory`] applies to every client it builds.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientSettings {
    region: Region,
    proxy_url: Option<String>,
    retry_policy: RetryPolicy,
}

impl ClientSettings {
    /// Settings for `region` with no proxy and the SDK's standard retry policy.
    pub fn new(region: Region) -> Self {
        Self {
            region,
            proxy_url: None,
            retry_policy: RetryPolicy::standard(),
        }
    }

    /// Routes all HTTP traffic of built clients through `proxy_url`.
    pub fn proxy_url(mut self, proxy_url: impl Into<Option<String>>) -> Self {
        self.proxy_url = proxy_url.into();
        self
    }

    /// Sets the retry policy of built clients.
    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// The region built clients are configured with.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// The proxy URL, if any.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    /// The retry policy of built clients.
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

/// Builds an [`AssumeRoleClient`] authenticated with a given set of credentials.
pub trait ClientFactory: Send + Sync + fmt::Debug {
    /// Builds a client that signs its requests with `credentials`.
    fn build_client(
        &self,
        credentials: &Credentials,
        settings: &ClientSettings,
    ) -> std::result::Result<SharedAssumeRoleClient, BoxError>;
}

impl<T: ClientFactory + ?Sized> ClientFactory for Arc<T> {
    fn build_client(
        &self,
        credentials: &Credentials,
        settings: &ClientSettings,
    ) -> std::result::Result<SharedAssumeRoleClient, BoxError> {
        self.as_ref().build_client(credentials, settings)
    }
}

/// A [`ClientFactory`] implemented by a closure.
///
/// See [`client_factory_fn`] for more details.
#[derive(Copy, Clone)]
pub struct ClientFactoryFn<F> {
    f: F,
}

impl<F> fmt::Debug for ClientFactoryFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientFactoryFn")
    }
}

impl<F> ClientFactory for ClientFactoryFn<F>
where
    F: Fn(&Credentials, &ClientSettings) -> std::result::Result<SharedAssumeRoleClient, BoxError>
        + Send
        + Sync,
{
    fn build_client(
        &self,
        credentials: &Credentials,
        settings: &ClientSettings,
    ) -> std::result::Result<SharedAssumeRoleClient, BoxError> {
        (self.f)(credentials, settings)
    }
}

/// Returns a new [`ClientFactoryFn`] with the given closure.
///
/// # Example
///
/// ```
/// use aws_role_chain::sts::{client_factory_fn, SdkClientFactory, ClientFactory};
///
/// let sdk = SdkClientFactory::new();
/// let logging_factory = client_factory_fn(move |credentials, settings| {
///     println!("building client for {}", credentials.access_key_id());
///     sdk.build_client(credentials, settings)
/// });
/// ```
pub fn client_factory_fn<F>(f: F) -> ClientFactoryFn<F>
where
    F: Fn(&Credentials, &ClientSettings) -> std::result::Result<SharedAssumeRoleClient, BoxError>
        + Send
        + Sync,
{
    ClientFactoryFn { f }
}
