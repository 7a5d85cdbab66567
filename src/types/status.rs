//! Evaluation status reporting.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use super::identifier::{Identifier, ids};

/// A status-code identifier with an optional nested cause code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode {
    value: Identifier,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    child: Option<Box<StatusCode>>,
}

impl StatusCode {
    pub fn new(value: impl Into<Identifier>) -> Self {
        StatusCode {
            value: value.into(),
            child: None,
        }
    }

    pub fn with_cause(mut self, cause: StatusCode) -> Self {
        self.child = Some(Box::new(cause));
        self
    }

    pub fn value(&self) -> &Identifier {
        &self.value
    }

    pub fn cause(&self) -> Option<&StatusCode> {
        self.child.as_deref()
    }

    pub fn is_ok(&self) -> bool {
        self.value.as_str() == ids::STATUS_OK
    }
}

/// Identifies the attribute requirement an attribute source could not meet,
/// so the caller can supply it and retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingAttributeDetail {
    pub category: Identifier,
    pub attribute_id: Identifier,
    pub data_type: Identifier,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issuer: Option<String>,
}

/// Structured data accompanying a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusDetail {
    MissingAttribute(MissingAttributeDetail),
}

/// `(code, message?, detail?)` — the status half of every evaluation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    code: StatusCode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    detail: Option<StatusDetail>,
}

impl Status {
    pub fn new(code: StatusCode, message: Option<String>, detail: Option<StatusDetail>) -> Self {
        Status {
            code,
            message,
            detail,
        }
    }

    pub fn ok() -> Self {
        Status::new(StatusCode::new(ids::STATUS_OK), None, None)
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Status::new(
            StatusCode::new(ids::STATUS_SYNTAX_ERROR),
            Some(message.into()),
            None,
        )
    }

    pub fn processing_error(message: impl Into<String>) -> Self {
        Status::new(
            StatusCode::new(ids::STATUS_PROCESSING_ERROR),
            Some(message.into()),
            None,
        )
    }

    pub fn missing_attribute(
        message: impl Into<String>,
        detail: MissingAttributeDetail,
    ) -> Self {
        Status::new(
            StatusCode::new(ids::STATUS_MISSING_ATTRIBUTE),
            Some(message.into()),
            Some(StatusDetail::MissingAttribute(detail)),
        )
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    pub fn code(&self) -> &StatusCode {
        &self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn detail(&self) -> Option<&StatusDetail> {
        self.detail.as_ref()
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::ok()
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        // the URN's last segment is the readable name
        let short = self
            .code
            .value()
            .as_str()
            .rsplit(':')
            .next()
            .unwrap_or_default();
        match &self.message {
            Some(message) => write!(f, "{short}: {message}"),
            None => write!(f, "{short}"),
        }
    }
}
