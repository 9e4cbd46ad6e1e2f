/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! IAM policy documents used as inline session policies.
//!
//! A [`PolicyDocument`] is an immutable value. Building a restricted variant returns a new
//! document; the original is left untouched:
//!
//! ```rust
//! use aws_role_chain::policy::PolicyDocument;
//!
//! let base = PolicyDocument::new(PolicyDocument::VERSION, vec![]);
//! let restricted = base.restricted_to_ips(["203.0.113.0/24", "198.51.100.7"]).unwrap();
//! assert_eq!(restricted.statements().len(), 2);
//! assert!(base.statements().is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Condition key matched against the caller's source IP.
const SOURCE_IP_KEY: &str = "aws:SourceIp";

/// An IAM policy document: a version and an ordered list of statements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "Statement")]
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// The current IAM policy language version.
    pub const VERSION: &'static str = "2012-10-17";

    /// Creates a new policy document.
    pub fn new(version: impl Into<String>, statements: Vec<PolicyStatement>) -> Self {
        Self {
            version: version.into(),
            statements,
        }
    }

    /// Returns the policy language version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the statements of this document, in evaluation order.
    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    /// Returns a copy of this document whose statements deny every action to callers outside
    /// the given set of IP addresses or CIDR blocks, and allow everything otherwise.
    ///
    /// The resulting document always has exactly two statements: the `Deny` conditioned on
    /// `NotIpAddress`, followed by the catch-all `Allow`. Any statements in `self` are replaced.
    pub fn restricted_to_ips<I, S>(&self, addresses: I) -> Result<PolicyDocument, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let addresses: Vec<String> = addresses.into_iter().map(Into::into).collect();
        if addresses.is_empty() {
            return Err(PolicyError::EmptyIpList);
        }
        if let Some(blank) = addresses.iter().find(|addr| addr.trim().is_empty()) {
            return Err(PolicyError::InvalidIpAddress {
                address: blank.clone(),
            });
        }

        let deny_outside = PolicyStatement::new("IPRestriction", Effect::Deny, ["*"])
            .with_resource("*")
            .with_condition(Condition::not_ip_address(addresses));
        let allow_all = PolicyStatement::new("AllowAll", Effect::Allow, ["*"]).with_resource("*");

        Ok(PolicyDocument {
            version: self.version.clone(),
            statements: vec![deny_outside, allow_all],
        })
    }

    /// Like [`restricted_to_ips`](Self::restricted_to_ips) for a single address or CIDR block.
    pub fn restricted_to_ip(
        &self,
        address: impl Into<String>,
    ) -> Result<PolicyDocument, PolicyError> {
        self.restricted_to_ips([address.into()])
    }
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self::new(Self::VERSION, Vec::new())
    }
}

/// Renders the canonical JSON text of the document.
///
/// `Resource`, `Condition` and `Principal` are omitted when unset so that the text stays minimal
/// and diff-stable.
impl fmt::Display for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Whether a statement allows or denies its actions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// `"Allow"`
    Allow,
    /// `"Deny"`
    Deny,
}

/// A single statement of a [`PolicyDocument`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    #[serde(rename = "Sid")]
    sid: String,
    #[serde(rename = "Effect")]
    effect: Effect,
    #[serde(rename = "Action")]
    actions: Vec<String>,
    #[serde(rename = "Resource", default, skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    #[serde(
        rename = "Condition",
        default,
        skip_serializing_if = "Condition::is_unset"
    )]
    condition: Option<Condition>,
    #[serde(
        rename = "Principal",
        default,
        skip_serializing_if = "Principal::is_unset"
    )]
    principal: Option<Principal>,
}

impl PolicyStatement {
    /// Creates a statement with no resource, condition, or principal.
    pub fn new<I, S>(sid: impl Into<String>, effect: Effect, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sid: sid.into(),
            effect,
            actions: actions.into_iter().map(Into::into).collect(),
            resource: None,
            condition: None,
            principal: None,
        }
    }

    /// Sets the resource this statement applies to.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Sets the condition block of this statement.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Sets the principal of this statement.
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Statement identifier.
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Statement effect.
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Actions covered by this statement.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Resource covered by this statement, if any.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Condition block, if any.
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Principal, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

/// The condition block of a statement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(
        rename = "NotIpAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    not_ip_address: Option<IpAddressCondition>,
}

impl Condition {
    /// A condition that matches requests whose source IP is *not* in `addresses`.
    pub fn not_ip_address(addresses: Vec<String>) -> Self {
        Self {
            not_ip_address: Some(IpAddressCondition {
                source_ip: addresses,
            }),
        }
    }

    /// Source IPs listed under `NotIpAddress`, if any.
    pub fn not_ip_addresses(&self) -> Option<&[String]> {
        self.not_ip_address
            .as_ref()
            .map(|cond| cond.source_ip.as_slice())
    }

    fn is_unset(condition: &Option<Condition>) -> bool {
        condition
            .as_ref()
            .map_or(true, |cond| cond.not_ip_address.is_none())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct IpAddressCondition {
    #[serde(rename = "aws:SourceIp", default)]
    source_ip: Vec<String>,
}

/// The principal of a statement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(rename = "AWS", default)]
    aws: Vec<String>,
}

impl Principal {
    /// A principal made of AWS account or role ARNs.
    pub fn aws<I, S>(arns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aws: arns.into_iter().map(Into::into).collect(),
        }
    }

    /// ARNs listed under `AWS`.
    pub fn aws_arns(&self) -> &[String] {
        &self.aws
    }

    fn is_unset(principal: &Option<Principal>) -> bool {
        principal.as_ref().map_or(true, |p| p.aws.is_empty())
    }
}

/// Error building a [`PolicyDocument`].
#[derive(Debug)]
#[non_exhaustive]
pub enum PolicyError {
    /// No IP address was given to restrict to.
    EmptyIpList,
    /// An IP address entry was blank.
    InvalidIpAddress {
        /// The offending entry.
        address: String,
    },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::EmptyIpList => write!(
                f,
                "at least one IP address is required to restrict a policy by {SOURCE_IP_KEY}"
            ),
            PolicyError::InvalidIpAddress { address } => {
                write!(f, "`{address}` is not a valid IP address or CIDR block")
            }
        }
    }
}

impl Error for PolicyError {}
