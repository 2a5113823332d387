//! Diagnostics reported while analyzing an API.
//!
//! Nothing in the engine throws for a domain condition. Findings are
//! accumulated as [`Diagnostic`]s and travel alongside a value in a
//! [`Diagnosed`]. A [`DiagnosticCollector`] gathers them across calls the
//! same way a stage pipes sub-results into its own output.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Every diagnostic the crate can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    LroStatusUnionNonString,
    LroStatusPropertyInvalidType,
    LroStatusMissing,
    LroStatusMonitorInvalidResultProperty,
    PollingOperationReturnModel,
    PollingOperationNoStatusMonitor,
    PollingOperationNoLroSuccess,
    PollingOperationNoLroFailure,
    PollingOperationNoRefOrLink,
    InvalidFinalOperation,
    OperationLinkParameterInvalid,
    OperationLinkParameterInvalidTarget,
    RequestParameterInvalid,
    ResponsePropertyInvalid,
    InvalidFinalState,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::LroStatusUnionNonString => "lro-status-union-non-string",
            DiagnosticCode::LroStatusPropertyInvalidType => "lro-status-property-invalid-type",
            DiagnosticCode::LroStatusMissing => "lro-status-missing",
            DiagnosticCode::LroStatusMonitorInvalidResultProperty => {
                "lro-status-monitor-invalid-result-property"
            }
            DiagnosticCode::PollingOperationReturnModel => "polling-operation-return-model",
            DiagnosticCode::PollingOperationNoStatusMonitor => {
                "polling-operation-no-status-monitor"
            }
            DiagnosticCode::PollingOperationNoLroSuccess => "polling-operation-no-lro-success",
            DiagnosticCode::PollingOperationNoLroFailure => "polling-operation-no-lro-failure",
            DiagnosticCode::PollingOperationNoRefOrLink => "polling-operation-no-ref-or-link",
            DiagnosticCode::InvalidFinalOperation => "invalid-final-operation",
            DiagnosticCode::OperationLinkParameterInvalid => "operation-link-parameter-invalid",
            DiagnosticCode::OperationLinkParameterInvalidTarget => {
                "operation-link-parameter-invalid-target"
            }
            DiagnosticCode::RequestParameterInvalid => "request-parameter-invalid",
            DiagnosticCode::ResponsePropertyInvalid => "response-property-invalid",
            DiagnosticCode::InvalidFinalState => "invalid-final-state",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::LroStatusMonitorInvalidResultProperty
            | DiagnosticCode::PollingOperationNoStatusMonitor
            | DiagnosticCode::PollingOperationNoLroSuccess
            | DiagnosticCode::PollingOperationNoLroFailure
            | DiagnosticCode::PollingOperationNoRefOrLink
            | DiagnosticCode::InvalidFinalOperation => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding about the analyzed API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Name of the entity the finding is about
    pub target: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        code: DiagnosticCode,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity: code.severity(),
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{} {} ({}): {}", severity, self.code, self.target, self.message)
    }
}

/// Drop repeated diagnostics, keeping the first occurrence of each
pub fn dedupe(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut unique: Vec<Diagnostic> = Vec::with_capacity(diagnostics.len());
    for diagnostic in diagnostics {
        if !unique.contains(&diagnostic) {
            unique.push(diagnostic);
        }
    }
    unique
}

/// A value together with the diagnostics produced while computing it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosed<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Diagnosed<T> {
    pub fn new(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    /// A value with nothing to report
    pub fn clean(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Diagnosed<U> {
        Diagnosed {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        (self.value, self.diagnostics)
    }

    /// Drop the diagnostics, keeping only the value
    pub fn ignore_diagnostics(self) -> T {
        self.value
    }

    pub fn has(&self, code: DiagnosticCode) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

/// Accumulates diagnostics across several sub-computations
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Keep the diagnostics of a sub-result and hand back its value
    pub fn pipe<T>(&mut self, result: Diagnosed<T>) -> T {
        self.diagnostics.extend(result.diagnostics);
        result.value
    }

    /// Finish, attaching everything collected to `value`
    pub fn wrap<T>(self, value: T) -> Diagnosed<T> {
        Diagnosed {
            value,
            diagnostics: self.diagnostics,
        }
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_strings() {
        assert_eq!(DiagnosticCode::LroStatusMissing.as_str(), "lro-status-missing");
        assert_eq!(
            DiagnosticCode::LroStatusUnionNonString.to_string(),
            "lro-status-union-non-string"
        );
        let json = serde_json::to_string(&DiagnosticCode::LroStatusMonitorInvalidResultProperty)
            .unwrap();
        assert_eq!(json, "\"lro-status-monitor-invalid-result-property\"");
    }

    #[test]
    fn test_severity_defaults() {
        assert_eq!(DiagnosticCode::LroStatusMissing.severity(), Severity::Error);
        assert_eq!(
            DiagnosticCode::LroStatusMonitorInvalidResultProperty.severity(),
            Severity::Warning
        );
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::new(
            DiagnosticCode::LroStatusMissing,
            "OperationState",
            "Terminal long-running operation states are missing: Failed.",
        );
        assert_eq!(
            diag.to_string(),
            "error lro-status-missing (OperationState): Terminal long-running operation states are missing: Failed."
        );
        assert!(diag.is_error());
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let first = Diagnostic::new(DiagnosticCode::LroStatusMissing, "A", "missing");
        let second = Diagnostic::new(DiagnosticCode::InvalidFinalState, "B", "invalid");
        let deduped = dedupe(vec![first.clone(), second.clone(), first.clone()]);
        assert_eq!(deduped, vec![first, second]);
    }

    #[test]
    fn test_collector_pipe_and_wrap() {
        let mut collector = DiagnosticCollector::new();
        let inner = Diagnosed::new(
            5,
            vec![Diagnostic::new(DiagnosticCode::InvalidFinalState, "op", "bad")],
        );
        let value = collector.pipe(inner);
        assert_eq!(value, 5);
        let outer = collector.wrap(value * 2);
        assert_eq!(outer.value, 10);
        assert!(outer.has(DiagnosticCode::InvalidFinalState));
    }

    #[test]
    fn test_diagnosed_map() {
        let diagnosed = Diagnosed::clean(2).map(|v| v + 1);
        assert_eq!(diagnosed.into_parts(), (3, vec![]));
    }
}
