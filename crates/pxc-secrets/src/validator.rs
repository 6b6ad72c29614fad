//! Credential audit utilities.

use crate::policy::GenerationPolicy;
use pxc_types::{Credential, CredentialKey, CredentialSet};
use serde::Serialize;

/// Outcome of auditing a single credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "findings", rename_all = "lowercase")]
pub enum AuditResult {
    /// Present and conforming to the current policy
    Ok,
    /// Required but not stored
    Missing,
    /// Present, but no longer matches the current policy
    Warning(Vec<String>),
}

/// Credential auditor.
pub struct CredentialAuditor;

impl CredentialAuditor {
    /// Audit one stored value against `policy`.
    ///
    /// Findings describe the problem without echoing the value.
    pub fn audit_credential(credential: &Credential, policy: &GenerationPolicy) -> AuditResult {
        let mut findings = Vec::new();

        let len = credential.len();
        if len < policy.min_length() {
            findings.push(format!(
                "length {} is below minLength {}",
                len,
                policy.min_length()
            ));
        }
        if len > policy.max_length() {
            findings.push(format!(
                "length {} is above maxLength {}",
                len,
                policy.max_length()
            ));
        }

        match credential.as_str() {
            Some(text) => {
                let foreign = text.chars().filter(|&c| !policy.allows(c)).count();
                if foreign > 0 {
                    findings.push(format!(
                        "{} character(s) outside the allowed alphabet",
                        foreign
                    ));
                }
            }
            None => findings.push("value is not valid UTF-8".to_string()),
        }

        if findings.is_empty() {
            AuditResult::Ok
        } else {
            AuditResult::Warning(findings)
        }
    }

    /// Audit every required key of `set`.
    ///
    /// Read-only: credentials that fail the audit are reported, never
    /// regenerated. Stored keys outside `required` are listed as extra.
    pub fn audit(
        set: &CredentialSet,
        required: &[CredentialKey],
        policy: &GenerationPolicy,
    ) -> AuditSummary {
        let mut summary = AuditSummary::default();

        for key in required {
            let result = match set.get(key) {
                Some(credential) => Self::audit_credential(credential, policy),
                None => AuditResult::Missing,
            };

            match result {
                AuditResult::Ok => summary.ok.push(key.clone()),
                AuditResult::Missing => summary.missing.push(key.clone()),
                AuditResult::Warning(findings) => summary.warnings.push((key.clone(), findings)),
            }
        }

        summary.extra = set
            .keys()
            .filter(|k| !required.contains(k))
            .cloned()
            .collect();

        summary
    }
}

/// Summary of an audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    /// Keys that conform to the policy
    pub ok: Vec<CredentialKey>,
    /// Required keys that are not stored
    pub missing: Vec<CredentialKey>,
    /// Keys with findings (key, findings)
    pub warnings: Vec<(CredentialKey, Vec<String>)>,
    /// Stored keys that are no longer required
    pub extra: Vec<CredentialKey>,
}

impl AuditSummary {
    /// Check if every required key is stored.
    pub fn is_all_valid(&self) -> bool {
        self.missing.is_empty()
    }

    /// Check if nothing was flagged at all.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.warnings.is_empty()
    }

    /// Get total count of audited keys.
    pub fn total(&self) -> usize {
        self.ok.len() + self.missing.len() + self.warnings.len()
    }

    /// Audit result for `key`, if it was audited.
    pub fn result(&self, key: &CredentialKey) -> Option<AuditResult> {
        if self.ok.contains(key) {
            return Some(AuditResult::Ok);
        }
        if self.missing.contains(key) {
            return Some(AuditResult::Missing);
        }
        self.warnings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, findings)| AuditResult::Warning(findings.clone()))
    }
}
