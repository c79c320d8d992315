//! Endpoint identifiers.
//!
//! An [`Eid`] is only ever built through an [`EidFactory`], so holding one means the
//! string passed validation. The crate ships [`BaseEidFactory`] which understands the
//! `dtn`, `ipn`, `api` and `cla` schemes.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Self-referencing pseudo-identifier used by application agents before they know
/// the node's real identifier.
pub const API_ME: &str = "api:me";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EidError {
    #[error("malformed endpoint identifier {eid:?}: {reason}")]
    Format { eid: String, reason: String },
}

impl EidError {
    fn format(eid: &str, reason: impl Into<String>) -> Self {
        EidError::Format {
            eid: eid.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Eid(String);

impl Eid {
    /// The `api:me` pseudo-identifier.
    pub fn api_me() -> Self {
        Eid(API_ME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> &str {
        self.0.split_once(':').map(|(scheme, _)| scheme).unwrap_or("")
    }

    pub fn ssp(&self) -> &str {
        self.0.split_once(':').map(|(_, ssp)| ssp).unwrap_or("")
    }

    /// Path component of an `api:me` identifier (`""` or `"/..."`), `None` for any
    /// other identifier.
    pub fn api_path(&self) -> Option<&str> {
        if self.matches_str(API_ME) {
            Some(&self.0[API_ME.len()..])
        } else {
            None
        }
    }

    /// Identifier equivalence used for link-local and pseudo-identifier lookups.
    ///
    /// `self` matches `other` when both are equal or when `self` extends `other`
    /// with a `/`-separated path, so `cla:stcp:10.0.0.1:4556/app` matches
    /// `cla:stcp:10.0.0.1:4556`.
    pub fn matches(&self, other: &Eid) -> bool {
        self.matches_str(other.as_str())
    }

    fn matches_str(&self, other: &str) -> bool {
        match self.0.strip_prefix(other) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl Display for Eid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Eid {
    type Err = EidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BaseEidFactory.create(s)
    }
}

/// Builds validated identifiers from strings.
pub trait EidFactory: Send + Sync {
    fn create(&self, eid: &str) -> Result<Eid, EidError>;
}

/// Factory for the schemes the core itself relies on.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseEidFactory;

impl BaseEidFactory {
    fn check_scheme(eid: &str, scheme: &str) -> Result<(), EidError> {
        let mut chars = scheme.chars();
        match chars.next() {
            Some(first) if first.is_ascii_lowercase() => {}
            _ => return Err(EidError::format(eid, "scheme must start with a lowercase letter")),
        }
        if chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+-.".contains(c)) {
            Ok(())
        } else {
            Err(EidError::format(eid, "invalid character in scheme"))
        }
    }

    fn check_dtn(eid: &str, ssp: &str) -> Result<(), EidError> {
        if ssp == "none" {
            return Ok(());
        }
        let Some(authority_and_path) = ssp.strip_prefix("//") else {
            return Err(EidError::format(eid, "dtn identifier must be dtn:none or dtn://node"));
        };
        let node = authority_and_path
            .split('/')
            .next()
            .unwrap_or_default();
        if node.is_empty() {
            return Err(EidError::format(eid, "dtn identifier has an empty node name"));
        }
        Ok(())
    }

    fn check_ipn(eid: &str, ssp: &str) -> Result<(), EidError> {
        let numeric = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
        match ssp.split_once('.') {
            Some((node, service)) if numeric(node) && numeric(service) => Ok(()),
            _ => Err(EidError::format(eid, "ipn identifier must be ipn:<node>.<service>")),
        }
    }

    fn check_api(eid: &str, ssp: &str) -> Result<(), EidError> {
        if ssp == "me" || ssp.starts_with("me/") {
            Ok(())
        } else {
            Err(EidError::format(eid, "api identifier must be api:me[/path]"))
        }
    }

    fn check_cla(eid: &str, ssp: &str) -> Result<(), EidError> {
        match ssp.split_once(':') {
            Some((protocol, address)) if !protocol.is_empty() && !address.is_empty() => Ok(()),
            _ => Err(EidError::format(eid, "cla identifier must be cla:<protocol>:<address>")),
        }
    }
}

impl EidFactory for BaseEidFactory {
    fn create(&self, eid: &str) -> Result<Eid, EidError> {
        if eid.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(EidError::format(eid, "whitespace or control character"));
        }
        let Some((scheme, ssp)) = eid.split_once(':') else {
            return Err(EidError::format(eid, "missing scheme separator"));
        };
        Self::check_scheme(eid, scheme)?;
        if ssp.is_empty() {
            return Err(EidError::format(eid, "empty scheme-specific part"));
        }
        match scheme {
            "dtn" => Self::check_dtn(eid, ssp)?,
            "ipn" => Self::check_ipn(eid, ssp)?,
            "api" => Self::check_api(eid, ssp)?,
            "cla" => Self::check_cla(eid, ssp)?,
            other => return Err(EidError::format(eid, format!("unknown scheme {other:?}"))),
        }
        Ok(Eid(eid.to_string()))
    }
}
