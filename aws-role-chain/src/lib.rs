/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */
#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

//! Cross-account credential chaining through the AWS Security Token Service (STS).
//!
//! Temporary credentials for a customer account are obtained in three steps:
//!
//! 1. A federated identity token (a JWT) is exchanged for a first set of credentials with
//!    `AssumeRoleWithWebIdentity` ([`web_identity`]).
//! 2. Those credentials authenticate the first hop of an ordered sequence of `AssumeRole` calls.
//!    Each hop's credentials are used to build a fresh STS client for the next hop ([`chain`]).
//!    Clients built for intermediate hops tolerate IAM's eventual consistency by retrying
//!    `401`, `403` and `404` responses ([`retry`]).
//! 3. The final hop's credentials are wrapped into an [`AwsCredentialsResponse`](response::AwsCredentialsResponse).
//!
//! Whether a cluster needs the multi-hop flow at all is decided by [`isolation`].
//!
//! The whole flow for an isolated cluster is available through [`isolated::IsolatedCredentials`]:
//!
//! ```no_run
//! # async fn docs() -> Result<(), Box<dyn std::error::Error>> {
//! use aws_role_chain::config::ChainConfig;
//! use aws_role_chain::isolated::IsolatedCredentials;
//! use aws_role_chain::chain::AssumptionSequence;
//!
//! let config = ChainConfig::builder("arn:aws:iam::123456789012:role/backplane-initial")
//!     .proxy_url("http://squid.corp.example.com:3128")
//!     .build();
//! let sequence: AssumptionSequence = serde_json::from_str(r#"{
//!     "customerRoleSessionName": "customer-session",
//!     "assumptionSequence": [
//!         { "name": "SRE-Support-Role", "arn": "arn:aws:iam::111111111111:role/support" },
//!         { "name": "Target-Role-Arn", "arn": "arn:aws:iam::222222222222:role/target" }
//!     ]
//! }"#)?;
//! let credentials = IsolatedCredentials::new(config)
//!     .fetch("eyJhbGciOi...", sequence, None)
//!     .await?;
//! println!("{}", credentials.fmt_export());
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod isolated;
pub mod isolation;
pub mod policy;
pub mod response;
pub mod retry;
pub mod sts;
pub mod token;
pub mod web_identity;

/// Boxed error type used for the causes of errors returned by this crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
