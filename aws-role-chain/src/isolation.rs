/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Decides whether a cluster's credentials must go through the isolated role chain.
//!
//! A cluster is isolated when:
//! - its control plane is hosted (HyperShift), or
//! - it uses STS and its support role is anything but the legacy support role.
//!
//! Clusters that do not use STS are never isolated.

use crate::BoxError;
use aws_arn::ResourceName;
use aws_smithy_async::future::now_or_later::NowOrLater;
use aws_smithy_types::error::display::DisplayErrorContext;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::Instrument;

/// Resource of the support role of clusters set up before isolation existed.
pub const LEGACY_SUPPORT_ROLE_RESOURCE: &str = "role/RH-Technical-Support-Access";

/// The cluster attributes the isolation decision depends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterAttributes {
    cluster_id: String,
    hypershift_enabled: bool,
    sts_enabled: bool,
}

impl ClusterAttributes {
    /// Creates the attributes of cluster `cluster_id`.
    pub fn new(cluster_id: impl Into<String>, hypershift_enabled: bool, sts_enabled: bool) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            hypershift_enabled,
            sts_enabled,
        }
    }

    /// The cluster id, passed to the [`ClusterLookup`].
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// Returns true if the cluster has a hosted control plane.
    pub fn hypershift_enabled(&self) -> bool {
        self.hypershift_enabled
    }

    /// Returns true if the cluster authenticates to AWS through STS.
    pub fn sts_enabled(&self) -> bool {
        self.sts_enabled
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Future new-type returned by [`ClusterLookup::support_role_arn`].
#[derive(Debug)]
pub struct SupportRoleArn<'a>(
    NowOrLater<Result<String, BoxError>, BoxFuture<'a, Result<String, BoxError>>>,
);

impl<'a> SupportRoleArn<'a> {
    /// Creates a `SupportRoleArn` from a future.
    pub fn new(future: impl Future<Output = Result<String, BoxError>> + Send + 'a) -> Self {
        SupportRoleArn(NowOrLater::new(Box::pin(future)))
    }

    /// Creates a `SupportRoleArn` from a resolved result.
    pub fn ready(result: Result<String, BoxError>) -> Self {
        SupportRoleArn(NowOrLater::ready(result))
    }
}

impl Future for SupportRoleArn<'_> {
    type Output = Result<String, BoxError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

/// Looks up cluster configuration held by a remote service.
pub trait ClusterLookup: Send + Sync + fmt::Debug {
    /// Returns the ARN of the support jump role configured for `cluster_id`.
    fn support_role_arn<'a>(&'a self, cluster_id: &'a str) -> SupportRoleArn<'a>;
}

/// A [`ClusterLookup`] implemented by a closure.
///
/// See [`cluster_lookup_fn`] for more details.
#[derive(Copy, Clone)]
pub struct ClusterLookupFn<F> {
    f: F,
}

impl<F> fmt::Debug for ClusterLookupFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClusterLookupFn")
    }
}

impl<F, Fut> ClusterLookup for ClusterLookupFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
{
    fn support_role_arn<'a>(&'a self, cluster_id: &'a str) -> SupportRoleArn<'a> {
        SupportRoleArn::new((self.f)(cluster_id.to_string()))
    }
}

/// Returns a new [`ClusterLookupFn`] with the given closure.
///
/// # Example
///
/// ```
/// use aws_role_chain::isolation::cluster_lookup_fn;
///
/// let lookup = cluster_lookup_fn(|cluster_id: String| async move {
///     Ok::<_, aws_role_chain::BoxError>(format!("arn:aws:iam::123456789012:role/{cluster_id}-support"))
/// });
/// ```
pub fn cluster_lookup_fn<F, Fut>(f: F) -> ClusterLookupFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
{
    ClusterLookupFn { f }
}

/// Returns true if credentials for `cluster` must be obtained through the isolated role chain.
///
/// The support role is only looked up for non-hosted STS clusters. Lookup failures are returned
/// as-is, without retry.
pub async fn is_isolated(
    cluster: &ClusterAttributes,
    lookup: &dyn ClusterLookup,
) -> Result<bool, IsolationError> {
    let span = tracing::info_span!("isolation_decision", cluster_id = %cluster.cluster_id);
    async move {
        if cluster.hypershift_enabled {
            tracing::debug!("hosted control plane clusters are always isolated");
            return Ok(true);
        }
        if !cluster.sts_enabled {
            tracing::debug!("cluster does not use STS");
            return Ok(false);
        }

        let support_role_arn = lookup
            .support_role_arn(&cluster.cluster_id)
            .await
            .map_err(|err| {
                tracing::warn!(error = %DisplayErrorContext(&*err), "failed to look up support role");
                IsolationError::Lookup {
                    cluster_id: cluster.cluster_id.clone(),
                    source: err,
                }
            })?;
        let arn: ResourceName = support_role_arn.parse()?;
        let isolated = &*arn.resource != LEGACY_SUPPORT_ROLE_RESOURCE;
        tracing::debug!(support_role_arn = %support_role_arn, isolated, "decided isolation");
        Ok(isolated)
    }
    .instrument(span)
    .await
}

/// Error returned by [`is_isolated`].
#[derive(Debug)]
#[non_exhaustive]
pub enum IsolationError {
    /// The support role of the cluster could not be looked up.
    Lookup {
        /// The cluster that was looked up.
        cluster_id: String,
        /// Underlying failure.
        source: BoxError,
    },

    /// The support role is not a valid ARN.
    ArnParse(aws_arn::Error),
}

impl fmt::Display for IsolationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationError::Lookup { cluster_id, .. } => {
                write!(f, "failed to look up the support role of cluster `{cluster_id}`")
            }
            IsolationError::ArnParse(_) => write!(f, "support role ARN is invalid"),
        }
    }
}

impl Error for IsolationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IsolationError::Lookup { source, .. } => Some(source.as_ref()),
            IsolationError::ArnParse(err) => Some(err),
        }
    }
}

impl From<aws_arn::Error> for IsolationError {
    fn from(err: aws_arn::Error) -> Self {
        IsolationError::ArnParse(err)
    }
}
