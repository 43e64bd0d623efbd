//! ARN parsing
//!
//! ARNs have the shape `arn:partition:service:region:account-id:resource`. The resource
//! part may itself contain colons (`layer:name:version`, `secret:name-AbCdEf`), so only the
//! first five separators are significant.

use std::fmt;
use std::str::FromStr;

use crate::error::ArnError;

/// A parsed ARN
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    pub resource: String,
}

impl Arn {
    /// Parse a full six-segment ARN
    pub fn parse(s: &str) -> Result<Self, ArnError> {
        let parts: Vec<&str> = s.splitn(6, ':').collect();
        if parts.len() < 6 {
            return Err(ArnError::malformed(s, "expected 6 colon-delimited segments"));
        }
        if parts[0] != "arn" {
            return Err(ArnError::malformed(s, "must start with 'arn:'"));
        }
        if parts[2].is_empty() {
            return Err(ArnError::malformed(s, "empty service segment"));
        }

        Ok(Self {
            partition: parts[1].to_string(),
            service: parts[2].to_string(),
            region: parts[3].to_string(),
            account_id: parts[4].to_string(),
            resource: parts[5].to_string(),
        })
    }

    /// Return the service segment (the third colon-delimited field) without validating
    /// the rest of the ARN.
    pub fn service_segment(s: &str) -> Result<&str, ArnError> {
        s.split(':')
            .nth(2)
            .ok_or_else(|| ArnError::malformed(s, "missing service segment"))
    }
}

impl FromStr for Arn {
    type Err = ArnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}
