//! Macro invocation envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_SUCCESS: &str = "success";

/// Event delivered by CloudFormation for each transform request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroRequest {
    pub request_id: String,
    /// Template fragment, containing at least `Resources`
    pub fragment: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_id: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub template_parameter_values: Value,
}

impl MacroRequest {
    pub fn new(request_id: impl Into<String>, fragment: Value) -> Self {
        Self {
            request_id: request_id.into(),
            fragment,
            account_id: None,
            region: None,
            transform_id: None,
            params: Value::Null,
            template_parameter_values: Value::Null,
        }
    }
}

/// Response returned to CloudFormation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroResponse {
    pub status: String,
    pub request_id: String,
    pub fragment: Value,
}

impl MacroResponse {
    pub fn success(request_id: impl Into<String>, fragment: Value) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            request_id: request_id.into(),
            fragment,
        }
    }
}
