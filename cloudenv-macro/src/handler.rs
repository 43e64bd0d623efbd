//! Macro entry point

use serde::Serialize;
use tracing::{error, info};

use crate::error::TransformError;
use crate::request::{MacroRequest, MacroResponse};
use crate::transform::Transformer;

/// Diagnostic snapshot of the whole event, logged as `{"before": ...}` / `{"after": ...}`
#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Snapshot<'a> {
    Before(&'a MacroRequest),
    After(&'a MacroRequest),
}

impl Snapshot<'_> {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
    }
}

/// Handles one transform request per call
#[derive(Debug, Clone)]
pub struct MacroHandler {
    transformer: Transformer,
}

impl MacroHandler {
    pub fn new(transformer: Transformer) -> Self {
        Self { transformer }
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    pub fn handle(&self, request: MacroRequest) -> Result<MacroResponse, TransformError> {
        info!(
            request_id = %request.request_id,
            event = %Snapshot::Before(&request).to_json(),
            "Macro request received"
        );

        let fragment = match self.transformer.transform_fragment(&request.fragment) {
            Ok(fragment) => fragment,
            Err(e) => {
                error!(
                    request_id = %request.request_id,
                    resource = e.resource().unwrap_or_default(),
                    error = %e,
                    "Transform failed"
                );
                return Err(e);
            }
        };

        let after = MacroRequest { fragment, ..request };
        info!(
            request_id = %after.request_id,
            event = %Snapshot::After(&after).to_json(),
            "Macro request transformed"
        );

        Ok(MacroResponse::success(after.request_id, after.fragment))
    }
}
