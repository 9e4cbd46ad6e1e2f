/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Configuration of the isolated credential flow.

use crate::sts::SdkClientFactory;
use aws_smithy_async::rt::sleep::AsyncSleep;
use aws_smithy_async::time::TimeSource;
use aws_smithy_runtime_api::client::http::HttpClient;
use aws_types::os_shim_internal::Env;
use aws_types::region::Region;

const PROXY_ENV_VARS: &[&str] = &["HTTPS_PROXY", "https_proxy"];
const REGION_ENV_VARS: &[&str] = &["AWS_REGION", "AWS_DEFAULT_REGION"];

/// Region reported with the credentials when neither the builder nor the environment sets one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Configuration shared by every step of [`IsolatedCredentials`](crate::isolated::IsolatedCredentials).
///
/// # Examples
/// ```rust
/// use aws_role_chain::config::ChainConfig;
/// use aws_types::region::Region;
///
/// let config = ChainConfig::builder("arn:aws:iam::123456789012:role/backplane-initial")
///     .proxy_url("http://squid.corp.example.com:3128")
///     .region(Region::new("eu-west-1"))
///     .build();
/// assert_eq!(config.proxy_url(), Some("http://squid.corp.example.com:3128"));
/// ```
#[derive(Clone, Debug)]
pub struct ChainConfig {
    initial_role_arn: String,
    proxy_url: Option<String>,
    region: Region,
    sdk_client_factory: SdkClientFactory,
}

impl ChainConfig {
    /// Returns a builder for the flow starting at `initial_role_arn`, the role assumed with the
    /// operator's web identity.
    pub fn builder(initial_role_arn: impl Into<String>) -> Builder {
        Builder {
            initial_role_arn: initial_role_arn.into(),
            proxy_url: None,
            region: None,
            env: Env::default(),
            sdk_client_factory: SdkClientFactory::new(),
        }
    }

    /// The role assumed with the operator's web identity.
    pub fn initial_role_arn(&self) -> &str {
        &self.initial_role_arn
    }

    /// The proxy every STS call is routed through, if any.
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    /// The region reported with the final credentials.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// The factory building the SDK clients of the flow.
    pub fn sdk_client_factory(&self) -> &SdkClientFactory {
        &self.sdk_client_factory
    }
}

/// Builder for [`ChainConfig`].
#[derive(Debug)]
pub struct Builder {
    initial_role_arn: String,
    proxy_url: Option<String>,
    region: Option<Region>,
    env: Env,
    sdk_client_factory: SdkClientFactory,
}

impl Builder {
    /// Routes every STS call through `proxy_url`.
    ///
    /// Defaults to `HTTPS_PROXY`, or `https_proxy`, when set.
    pub fn proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Sets or clears the proxy URL.
    pub fn set_proxy_url(&mut self, proxy_url: Option<String>) -> &mut Self {
        self.proxy_url = proxy_url;
        self
    }

    /// Sets the region reported with the final credentials.
    ///
    /// Defaults to `AWS_REGION`, then `AWS_DEFAULT_REGION`, then [`DEFAULT_REGION`].
    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Overrides the environment the defaults are read from.
    pub fn env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Overrides the STS endpoint.
    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.sdk_client_factory = self.sdk_client_factory.endpoint_url(endpoint_url);
        self
    }

    /// Overrides the sleep implementation used between retry attempts.
    pub fn sleep_impl(mut self, sleep_impl: impl AsyncSleep + 'static) -> Self {
        self.sdk_client_factory = self.sdk_client_factory.sleep_impl(sleep_impl);
        self
    }

    /// Overrides the time source used to sign requests.
    pub fn time_source(mut self, time_source: impl TimeSource + 'static) -> Self {
        self.sdk_client_factory = self.sdk_client_factory.time_source(time_source);
        self
    }

    /// Overrides the HTTP client. The proxy URL no longer applies once this is set.
    pub fn http_client(mut self, http_client: impl HttpClient + 'static) -> Self {
        self.sdk_client_factory = self.sdk_client_factory.http_client(http_client);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ChainConfig {
        let proxy_url = self
            .proxy_url
            .or_else(|| first_non_empty(&self.env, PROXY_ENV_VARS));
        let region = self
            .region
            .or_else(|| first_non_empty(&self.env, REGION_ENV_VARS).map(Region::new))
            .unwrap_or_else(|| Region::from_static(DEFAULT_REGION));
        ChainConfig {
            initial_role_arn: self.initial_role_arn,
            proxy_url,
            region,
            sdk_client_factory: self.sdk_client_factory,
        }
    }
}

fn first_non_empty(env: &Env, vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|var| env.get(var).ok())
        .find(|value| !value.trim().is_empty())
}
