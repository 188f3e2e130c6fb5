// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// A failed job shows exactly one summary line to the user. Every technical
// error is mapped to plain English with a clear suggestion; the severity
// drives how the caller presents it.

use crate::error::BlattwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user picked the wrong number or kind of files.
    ActionRequired,
    /// The file itself cannot be processed; retrying will not help.
    Permanent,
    /// Something in the environment went wrong; trying again may work.
    Transient,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

impl HumanError {
    /// Single-line form used as a job's error message.
    pub fn summary(&self) -> String {
        format!("{} {}", self.message, self.suggestion)
    }
}

/// Convert a `BlattwerkError` into a `HumanError`.
pub fn humanize_error(err: &BlattwerkError) -> HumanError {
    match err {
        BlattwerkError::InputValidation(detail) => HumanError {
            message: format!("These files can't be used for this tool ({detail})."),
            suggestion: "Check how many files you selected and that they are the right type.".into(),
            severity: Severity::ActionRequired,
        },

        BlattwerkError::Decode { name, .. } => HumanError {
            message: format!("We couldn't read \"{name}\"."),
            suggestion: "The file may be damaged or in an unusual format. Try opening it elsewhere first, or pick a different file.".into(),
            severity: Severity::Permanent,
        },

        BlattwerkError::Encode { name, .. } => HumanError {
            message: format!("We couldn't write \"{name}\"."),
            suggestion: "Try a different output format.".into(),
            severity: Severity::Permanent,
        },

        BlattwerkError::Compose(_) => HumanError {
            message: "The pages couldn't be put together.".into(),
            suggestion: "One of the PDFs may be damaged. Try re-saving it with another viewer and run the tool again.".into(),
            severity: Severity::Permanent,
        },

        BlattwerkError::Export(detail) => HumanError {
            message: "A result couldn't be saved.".into(),
            suggestion: format!("Check there is enough free space and try downloading again. ({detail})"),
            severity: Severity::Transient,
        },

        BlattwerkError::Task(_) => HumanError {
            message: "Processing stopped unexpectedly.".into(),
            suggestion: "Please try again.".into(),
            severity: Severity::Transient,
        },

        BlattwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "We don't have permission to use that file or folder.".into(),
                    suggestion: "Check the permissions, or pick a different location.".into(),
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                    severity: Severity::Transient,
                }
            }
        }

        BlattwerkError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read.".into(),
            suggestion: "Fix or delete the configuration file to go back to the defaults.".into(),
            severity: Severity::ActionRequired,
        },
    }
}
