/* Structured generation diagnostics */

use std::fmt;

use serde_derive::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
  Warning,
  Error,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  pub severity: Severity,
  pub message: String,
  /* Offending descriptor, e.g. `UserDao::get_user` or `aggregate UserPermissions` */
  pub subject: String,
}

impl Diagnostic {
  pub fn error(subject: impl Into<String>, message: impl fmt::Display) -> Self {
    Self { severity: Severity::Error, message: message.to_string(), subject: subject.into() }
  }

  pub fn warning(subject: impl Into<String>, message: impl fmt::Display) -> Self {
    Self { severity: Severity::Warning, message: message.to_string(), subject: subject.into() }
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self.severity {
      Severity::Warning => "warning",
      Severity::Error => "error",
    };
    write!(f, "{}: {}: {}", label, self.subject, self.message)
  }
}

/* Receives diagnostics as generation proceeds */
pub trait DiagnosticSink {
  fn report(&mut self, diagnostic: Diagnostic);
}

/* Default sink: collects everything in report order */
#[derive(Serialize, Debug, Clone, Default)]
pub struct Diagnostics {
  entries: Vec<Diagnostic>,
}

impl Diagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn error_count(&self) -> usize {
    self.entries.iter().filter(|d| d.severity == Severity::Error).count()
  }

  pub fn warning_count(&self) -> usize {
    self.entries.iter().filter(|d| d.severity == Severity::Warning).count()
  }

  pub fn has_errors(&self) -> bool {
    self.error_count() > 0
  }

  pub fn into_vec(self) -> Vec<Diagnostic> {
    self.entries
  }
}

impl DiagnosticSink for Diagnostics {
  fn report(&mut self, diagnostic: Diagnostic) {
    self.entries.push(diagnostic);
  }
}
