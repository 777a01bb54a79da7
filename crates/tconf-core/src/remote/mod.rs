//! Result objects exchanged between the controller and host-side runs.

pub mod protocol;

use serde::{Deserialize, Serialize};

use crate::context::RunContext;

/// A configuration value that failed its prompt's rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptError {
    pub key: String,
    pub prompt: String,
    pub message: String,
    pub current_value: Option<String>,
}

impl PromptError {
    pub fn new(
        key: impl Into<String>,
        prompt: impl Into<String>,
        message: impl Into<String>,
        current_value: Option<&str>,
    ) -> Self {
        Self {
            key: key.into(),
            prompt: prompt.into(),
            message: message.into(),
            current_value: current_value.map(str::to_string),
        }
    }
}

/// An error reported by a host, a check, a confirmation gate or a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteError {
    /// Connectivity or command failure. Always fatal.
    Host {
        message: String,
        host: Option<String>,
    },
    /// A yes/no gate. Fatal only when declined.
    Confirmation {
        message: String,
        host: Option<String>,
    },
    Validation {
        message: String,
        host: Option<String>,
        check: String,
        help: Vec<String>,
    },
    Prompt {
        error: PromptError,
    },
    PromptSet {
        errors: Vec<PromptError>,
    },
}

impl RemoteError {
    pub fn host(message: impl Into<String>, host: Option<String>) -> Self {
        RemoteError::Host {
            message: message.into(),
            host,
        }
    }

    pub fn confirmation(message: impl Into<String>, host: Option<String>) -> Self {
        RemoteError::Confirmation {
            message: message.into(),
            host,
        }
    }

    /// Wrap prompt errors, using the batch form when there is more than one.
    pub fn from_prompt_errors(mut errors: Vec<PromptError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop().map(|error| RemoteError::Prompt { error }),
            _ => Some(RemoteError::PromptSet { errors }),
        }
    }

    pub fn host_name(&self) -> Option<&str> {
        match self {
            RemoteError::Host { host, .. }
            | RemoteError::Confirmation { host, .. }
            | RemoteError::Validation { host, .. } => host.as_deref(),
            RemoteError::Prompt { .. } | RemoteError::PromptSet { .. } => None,
        }
    }

    pub fn check(&self) -> Option<&str> {
        match self {
            RemoteError::Validation { check, .. } => Some(check),
            _ => None,
        }
    }

    pub fn help(&self) -> &[String] {
        match self {
            RemoteError::Validation { help, .. } => help,
            _ => &[],
        }
    }

    /// The message as shown to the operator.
    pub fn message(&self) -> String {
        match self {
            RemoteError::Host { message, .. } | RemoteError::Confirmation { message, .. } => {
                message.clone()
            }
            RemoteError::Validation { message, check, .. } => format!("{message} ({check})"),
            RemoteError::Prompt { error } => format!("{}: {}", error.key, error.message),
            RemoteError::PromptSet { errors } => errors
                .iter()
                .map(|e| format!("{}: {}", e.key, e.message))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    /// Whether this error stops the run.
    ///
    /// Confirmations are never fatal under `--force`, are put to the operator
    /// in interactive runs, and count as declined otherwise.
    pub fn is_fatal(&self, ctx: &mut RunContext) -> bool {
        let RemoteError::Confirmation { message, .. } = self else {
            return true;
        };
        if ctx.force() {
            return false;
        }
        if !ctx.interactive() {
            return true;
        }
        let question = format!("{message} Do you want to continue?");
        match ctx.confirm(&question, false) {
            Ok(accepted) => !accepted,
            Err(err) => {
                tracing::warn!("confirmation could not be read: {err:#}");
                true
            }
        }
    }
}

/// Messages and errors produced by one host-side run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResult {
    pub messages: Vec<String>,
    pub errors: Vec<RemoteError>,
}

impl RemoteResult {
    pub fn from_errors(errors: Vec<RemoteError>) -> Self {
        Self {
            messages: Vec::new(),
            errors,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_check() {
        let err = RemoteError::Validation {
            message: "/opt is not writeable".to_string(),
            host: Some("db1".to_string()),
            check: "Writeable home directory".to_string(),
            help: vec![],
        };
        assert_eq!(err.message(), "/opt is not writeable (Writeable home directory)");
        assert_eq!(err.host_name(), Some("db1"));
    }

    #[test]
    fn prompt_errors_use_batch_form_when_many() {
        assert!(RemoteError::from_prompt_errors(vec![]).is_none());

        let one = PromptError::new("a", "A", "Value is missing", None);
        let single = RemoteError::from_prompt_errors(vec![one.clone()]).unwrap();
        assert!(matches!(single, RemoteError::Prompt { .. }));

        let many = RemoteError::from_prompt_errors(vec![one.clone(), one]).unwrap();
        assert!(matches!(many, RemoteError::PromptSet { ref errors } if errors.len() == 2));
    }

    #[test]
    fn errors_serialize_with_kind_tag() {
        let err = RemoteError::host("ssh failed", Some("db2".to_string()));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains(r#""kind":"host""#));

        let back: RemoteError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
