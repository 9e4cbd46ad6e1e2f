/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Claim extraction from federated identity tokens.
//!
//! The token is **decoded, not verified**. This is intentional: the token's authenticity is
//! established by its upstream issuer, and STS itself rejects an invalid, expired, or untrusted
//! token during `AssumeRoleWithWebIdentity`. Claims read here only name the STS session and are
//! never used to make an authorization decision. Do not add signature verification without
//! revisiting those requirements.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;
use std::error::Error;
use std::fmt;

/// Claim holding the caller's email address.
pub const EMAIL_CLAIM: &str = "email";

/// Reads the `email` claim from a JWT.
pub fn email_from_token(token: &str) -> Result<String, ClaimExtractionError> {
    string_claim(token, EMAIL_CLAIM)
}

/// Reads a string claim from the payload of a JWT without verifying its signature.
pub fn string_claim(token: &str, claim: &str) -> Result<String, ClaimExtractionError> {
    let claims = decode_claims(token)?;
    match claims.get(claim) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
        Some(_) => Err(ClaimExtractionError::new(claim, ErrorKind::InvalidClaim, None)),
        None => Err(ClaimExtractionError::new(claim, ErrorKind::MissingClaim, None)),
    }
}

fn decode_claims(token: &str) -> Result<serde_json::Map<String, Value>, ClaimExtractionError> {
    let mut segments = token.trim().split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(header), Some(payload), Some(_signature))
            if !header.is_empty() && !payload.is_empty() =>
        {
            payload
        }
        _ => return Err(ClaimExtractionError::new("", ErrorKind::MalformedToken, None)),
    };
    // some issuers pad their segments even though RFC 7515 says not to
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| {
            ClaimExtractionError::new("", ErrorKind::MalformedToken, Some(err.into()))
        })?;
    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(ClaimExtractionError::new("", ErrorKind::MalformedToken, None)),
        Err(err) => Err(ClaimExtractionError::new(
            "",
            ErrorKind::MalformedToken,
            Some(err.into()),
        )),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ErrorKind {
    MalformedToken,
    MissingClaim,
    InvalidClaim,
}

/// A required claim could not be read from an identity token.
#[derive(Debug)]
pub struct ClaimExtractionError {
    claim: String,
    kind: ErrorKind,
    source: Option<crate::BoxError>,
}

impl ClaimExtractionError {
    fn new(claim: &str, kind: ErrorKind, source: Option<crate::BoxError>) -> Self {
        Self {
            claim: claim.to_string(),
            kind,
            source,
        }
    }

    /// Returns true if the token itself could not be decoded.
    pub fn is_malformed_token(&self) -> bool {
        self.kind == ErrorKind::MalformedToken
    }

    /// Returns true if the token was decoded but did not contain the claim.
    pub fn is_missing_claim(&self) -> bool {
        self.kind == ErrorKind::MissingClaim
    }
}

impl fmt::Display for ClaimExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::MalformedToken => write!(f, "identity token is not a well-formed JWT"),
            ErrorKind::MissingClaim => {
                write!(f, "identity token does not contain the `{}` claim", self.claim)
            }
            ErrorKind::InvalidClaim => write!(
                f,
                "identity token claim `{}` is not a non-empty string",
                self.claim
            ),
        }
    }
}

impl Error for ClaimExtractionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}
