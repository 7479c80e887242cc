//! Component action ids
//!
//! Buttons on approval and report messages carry an id that comes back when
//! clicked. The id is a JSON array `["<action>","<subject>","<requester>"]`
//! so usernames containing `_`, `|` or spaces cannot be misread.

use std::fmt;
use thiserror::Error;

/// Upper bound on an encoded id, imposed by the chat platform
pub const MAX_ACTION_ID_LEN: usize = 100;

/// What a button does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Approve,
    Reject,
    ReportResolve,
    ReportDismiss,
}

impl ActionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::ReportResolve => "report_resolve",
            Self::ReportDismiss => "report_dismiss",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            "report_resolve" => Some(Self::ReportResolve),
            "report_dismiss" => Some(Self::ReportDismiss),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action id decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionIdError {
    #[error("action id is not a JSON string array")]
    Malformed,

    #[error("action id has {0} fields, expected 3")]
    FieldCount(usize),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("action id field {0} is empty")]
    EmptyField(&'static str),

    #[error("action id is {0} bytes, limit is {MAX_ACTION_ID_LEN}")]
    TooLong(usize),
}

/// A decoded button id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionId {
    pub kind: ActionKind,
    /// Game username the action applies to
    pub subject: String,
    /// Chat user who asked for it
    pub requester: String,
}

impl ActionId {
    pub fn new(kind: ActionKind, subject: impl Into<String>, requester: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            requester: requester.into(),
        }
    }

    /// Encode for use as a component id
    pub fn encode(&self) -> Result<String, ActionIdError> {
        self.validate()?;
        let encoded = serde_json::to_string(&[
            self.kind.as_str(),
            self.subject.as_str(),
            self.requester.as_str(),
        ])
        .map_err(|_| ActionIdError::Malformed)?;
        if encoded.len() > MAX_ACTION_ID_LEN {
            return Err(ActionIdError::TooLong(encoded.len()));
        }
        Ok(encoded)
    }

    /// Decode a component id, validating tag and field count
    pub fn parse(raw: &str) -> Result<Self, ActionIdError> {
        if raw.len() > MAX_ACTION_ID_LEN {
            return Err(ActionIdError::TooLong(raw.len()));
        }
        let fields: Vec<String> =
            serde_json::from_str(raw).map_err(|_| ActionIdError::Malformed)?;

        let [tag, subject, requester]: [String; 3] = fields
            .try_into()
            .map_err(|fields: Vec<String>| ActionIdError::FieldCount(fields.len()))?;

        let kind = ActionKind::parse(&tag).ok_or(ActionIdError::UnknownAction(tag))?;
        let id = Self {
            kind,
            subject,
            requester,
        };
        id.validate()?;
        Ok(id)
    }

    /// Bridge command this action triggers, as `(command, args)`
    pub fn command(&self) -> Option<(&'static str, Vec<String>)> {
        match self.kind {
            ActionKind::Approve => Some(("whitelist", vec![self.subject.clone()])),
            ActionKind::Reject | ActionKind::ReportResolve | ActionKind::ReportDismiss => None,
        }
    }

    fn validate(&self) -> Result<(), ActionIdError> {
        if self.subject.trim().is_empty() {
            return Err(ActionIdError::EmptyField("subject"));
        }
        if self.requester.trim().is_empty() {
            return Err(ActionIdError::EmptyField("requester"));
        }
        Ok(())
    }
}
