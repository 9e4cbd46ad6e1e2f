/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::{
    future, AssumeRoleClient, AssumeRoleRequest, ClientFactory, ClientSettings,
    SharedAssumeRoleClient, WebIdentityRequest,
};
use crate::BoxError;
use aws_credential_types::Credentials;
use aws_sdk_sts::config::BehaviorVersion;
use aws_sdk_sts::types::Credentials as StsCredentials;
use aws_smithy_async::rt::sleep::{AsyncSleep, SharedAsyncSleep};
use aws_smithy_async::time::{SharedTimeSource, TimeSource};
use aws_smithy_http_client::proxy::ProxyConfig;
use aws_smithy_http_client::{tls, Connector};
use aws_smithy_runtime::client::identity::IdentityCache;
use aws_smithy_runtime_api::client::http::{
    http_client_fn, HttpClient, SharedHttpClient, SharedHttpConnector,
};
use aws_smithy_types::error::display::DisplayErrorContext;
use std::time::SystemTime;
use tracing::Instrument;

impl AssumeRoleClient for aws_sdk_sts::Client {
    fn assume_role<'a>(&'a self, request: AssumeRoleRequest) -> future::AssumeRole<'a> {
        future::AssumeRole::new(
            async move {
                let output = aws_sdk_sts::Client::assume_role(self)
                    .role_arn(request.role_arn)
                    .role_session_name(request.session_name)
                    .set_policy(request.policy.map(|policy| policy.to_string()))
                    .send()
                    .await
                    .map_err(|err| {
                        tracing::warn!(error = %DisplayErrorContext(&err), "STS refused to grant assume role");
                        err
                    })?;
                into_credentials(output.credentials, "AssumeRole")
            }
            .in_current_span(),
        )
    }

    fn assume_role_with_web_identity<'a>(
        &'a self,
        request: WebIdentityRequest,
    ) -> future::AssumeRole<'a> {
        future::AssumeRole::new(
            async move {
                let output = aws_sdk_sts::Client::assume_role_with_web_identity(self)
                    .role_arn(request.role_arn)
                    .role_session_name(request.session_name)
                    .web_identity_token(request.web_identity_token)
                    .send()
                    .await
                    .map_err(|err| {
                        tracing::warn!(error = %DisplayErrorContext(&err), "STS returned an error assuming web identity role");
                        err
                    })?;
                into_credentials(output.credentials, "AssumeRoleWithWebIdentity")
            }
            .in_current_span(),
        )
    }
}

/// Convert STS credentials to [`Credentials`].
fn into_credentials(
    sts_credentials: Option<StsCredentials>,
    provider_name: &'static str,
) -> super::Result {
    let sts_credentials = sts_credentials.ok_or("STS credentials must be defined")?;
    let expiration = SystemTime::try_from(sts_credentials.expiration)
        .map_err(|_| "credential expiration time cannot be represented by a SystemTime")?;
    Ok(Credentials::new(
        sts_credentials.access_key_id,
        sts_credentials.secret_access_key,
        Some(sts_credentials.session_token),
        Some(expiration),
        provider_name,
    ))
}

/// [`ClientFactory`] producing [`aws_sdk_sts::Client`]s.
///
/// Built clients use the region, proxy, and retry policy of the [`ClientSettings`] they are
/// built with. They never cache identities: each client signs with exactly the credentials it was
/// built from.
///
/// The remaining options exist mostly as test seams:
/// ```no_run
/// use aws_role_chain::sts::SdkClientFactory;
///
/// let factory = SdkClientFactory::new().endpoint_url("http://localhost:4566");
/// ```
#[derive(Clone, Debug, Default)]
pub struct SdkClientFactory {
    sleep_impl: Option<SharedAsyncSleep>,
    time_source: Option<SharedTimeSource>,
    http_client: Option<SharedHttpClient>,
    endpoint_url: Option<String>,
}

impl SdkClientFactory {
    /// Creates a factory using the SDK's default sleep, time source, and HTTPS client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the sleep implementation used between retry attempts.
    pub fn sleep_impl(mut self, sleep_impl: impl AsyncSleep + 'static) -> Self {
        self.sleep_impl = Some(SharedAsyncSleep::new(sleep_impl));
        self
    }

    /// Overrides the time source used for request signing.
    pub fn time_source(mut self, time_source: impl TimeSource + 'static) -> Self {
        self.time_source = Some(SharedTimeSource::new(time_source));
        self
    }

    /// Overrides the HTTP client. When set, the proxy URL of [`ClientSettings`] is ignored.
    pub fn http_client(mut self, http_client: impl HttpClient + 'static) -> Self {
        self.http_client = Some(SharedHttpClient::new(http_client));
        self
    }

    /// Overrides the STS endpoint.
    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Builds an STS client without credentials, for `AssumeRoleWithWebIdentity`.
    pub fn anonymous_client(
        &self,
        settings: &ClientSettings,
    ) -> Result<SharedAssumeRoleClient, BoxError> {
        let config = self.sts_config(settings)?.build();
        Ok(SharedAssumeRoleClient::new(aws_sdk_sts::Client::from_conf(
            config,
        )))
    }

    fn sts_config(
        &self,
        settings: &ClientSettings,
    ) -> Result<aws_sdk_sts::config::Builder, BoxError> {
        let retry = settings.retry();
        let mut builder = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(settings.region().clone())
            .identity_cache(IdentityCache::no_cache())
            .retry_config(retry.retry_config());
        if let Some(classifier) = retry.status_code_classifier() {
            builder = builder.retry_classifier(classifier);
        }
        let http_client = match (&self.http_client, settings.proxy()) {
            (Some(http_client), _) => Some(http_client.clone()),
            (None, Some(proxy_url)) => Some(proxied_http_client(proxy_url)?),
            (None, None) => None,
        };
        builder.set_http_client(http_client);
        builder.set_sleep_impl(self.sleep_impl.clone());
        builder.set_time_source(self.time_source.clone());
        builder.set_endpoint_url(self.endpoint_url.clone());
        Ok(builder)
    }
}

impl ClientFactory for SdkClientFactory {
    fn build_client(
        &self,
        credentials: &Credentials,
        settings: &ClientSettings,
    ) -> Result<SharedAssumeRoleClient, BoxError> {
        tracing::debug!(
            access_key_id = credentials.access_key_id(),
            region = %settings.region(),
            proxy = settings.proxy().unwrap_or("none"),
            max_attempts = settings.retry().max_attempts(),
            "building STS client"
        );
        let config = self
            .sts_config(settings)?
            .credentials_provider(credentials.clone())
            .build();
        Ok(SharedAssumeRoleClient::new(aws_sdk_sts::Client::from_conf(
            config,
        )))
    }
}

/// An HTTPS client sending all traffic through `proxy_url`.
fn proxied_http_client(proxy_url: &str) -> Result<SharedHttpClient, BoxError> {
    let proxy_config = ProxyConfig::all(proxy_url)?;
    Ok(http_client_fn(move |settings, _components| {
        let connector = Connector::builder()
            .proxy_config(proxy_config.clone())
            .connector_settings(settings.clone())
            .tls_provider(tls::Provider::Rustls(
                tls::rustls_provider::CryptoMode::AwsLc,
            ))
            .build();
        SharedHttpConnector::new(connector)
    }))
}
