//! Property validators.

use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::error::ValidationFailure;

/// Accepts or rejects a raw answer, returning the value to store.
pub trait PropertyValidator: Send + Sync {
    fn validate(&self, value: &str) -> Result<String, ValidationFailure>;
}

pub type SharedValidator = Arc<dyn PropertyValidator>;

/// Accepts values matching a regular expression.
#[derive(Debug, Clone)]
pub struct RegexValidator {
    regex: Regex,
    message: String,
}

impl RegexValidator {
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            message: message.into(),
        })
    }
}

impl PropertyValidator for RegexValidator {
    fn validate(&self, value: &str) -> Result<String, ValidationFailure> {
        if self.regex.is_match(value) {
            Ok(value.to_string())
        } else {
            Err(ValidationFailure::new(self.message.clone()))
        }
    }
}

/// Accepts whole numbers within an inclusive range.
#[derive(Debug, Clone)]
pub struct IntegerRangeValidator {
    low: u64,
    high: u64,
    message: String,
}

impl IntegerRangeValidator {
    pub fn new(low: u64, high: u64, message: impl Into<String>) -> Self {
        Self {
            low: low.min(high),
            high: high.max(low),
            message: message.into(),
        }
    }
}

impl PropertyValidator for IntegerRangeValidator {
    fn validate(&self, value: &str) -> Result<String, ValidationFailure> {
        match value.parse::<u64>() {
            Ok(n) if (self.low..=self.high).contains(&n) => Ok(value.to_string()),
            _ => Err(ValidationFailure::new(self.message.clone())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

/// Accepts paths to an existing, readable (and optionally writable) entry.
#[derive(Debug, Clone)]
pub struct FileValidator {
    kind: FileKind,
    writable: bool,
    message: String,
}

impl FileValidator {
    pub fn new(kind: FileKind, writable: bool, message: impl Into<String>) -> Self {
        Self {
            kind,
            writable,
            message: message.into(),
        }
    }
}

impl PropertyValidator for FileValidator {
    fn validate(&self, value: &str) -> Result<String, ValidationFailure> {
        let path = Path::new(value);
        let kind_ok = match self.kind {
            FileKind::File => path.is_file(),
            FileKind::Directory => path.is_dir(),
        };
        let readable = match self.kind {
            FileKind::File => std::fs::File::open(path).is_ok(),
            FileKind::Directory => std::fs::read_dir(path).is_ok(),
        };
        let writable = !self.writable
            || std::fs::metadata(path)
                .map(|m| !m.permissions().readonly())
                .unwrap_or(false);

        if kind_ok && readable && writable {
            Ok(value.to_string())
        } else {
            Err(ValidationFailure::new(self.message.clone()))
        }
    }
}

/// Validator backed by a closure.
pub struct FnValidator<F>(pub F);

impl<F> PropertyValidator for FnValidator<F>
where
    F: Fn(&str) -> Result<String, ValidationFailure> + Send + Sync,
{
    fn validate(&self, value: &str) -> Result<String, ValidationFailure> {
        (self.0)(value)
    }
}

fn regex(pattern: &str, message: &str) -> SharedValidator {
    Arc::new(RegexValidator::new(pattern, message).expect("built-in validator pattern is valid"))
}

pub fn pv_integer() -> SharedValidator {
    regex(r"^[0-9]+$", "Value must be an integer")
}

pub fn pv_boolean() -> SharedValidator {
    regex(r"^(true|false)$", "Value must be true or false")
}

pub fn pv_identifier() -> SharedValidator {
    regex(
        r"^[A-Za-z0-9_]+$",
        "Value must consist only of letters, digits, and underscore (_)",
    )
}

pub fn pv_hostname() -> SharedValidator {
    regex(
        r"^[A-Za-z0-9_.\-]+$",
        "Value must consist only of letters, digits, underscore (_) and periods",
    )
}

pub fn pv_dbms_role() -> SharedValidator {
    regex(r"^(master|slave)$", "Value must be master or slave")
}

pub fn pv_dbms_type() -> SharedValidator {
    regex(
        r"^(mysql|postgresql)$",
        "Value must be a database (mysql, or postgresql)",
    )
}

pub fn pv_java_mem_size() -> SharedValidator {
    Arc::new(IntegerRangeValidator::new(
        128,
        2048,
        "Java heap size must be between 128 and 2048",
    ))
}

pub fn pv_repl_buffer_size() -> SharedValidator {
    Arc::new(IntegerRangeValidator::new(
        1,
        100,
        "Replication transaction buffer size must be between 1 and 100",
    ))
}

pub fn pv_readable_dir() -> SharedValidator {
    Arc::new(FileValidator::new(
        FileKind::Directory,
        false,
        "Value must be a readable directory",
    ))
}

pub fn pv_writable_dir() -> SharedValidator {
    Arc::new(FileValidator::new(
        FileKind::Directory,
        true,
        "Value must be a writable directory",
    ))
}
