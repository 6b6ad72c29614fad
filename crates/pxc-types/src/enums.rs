//! Common enumerations used throughout the credential controller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{PxcError, Result};
use crate::identifiers::CredentialKey;

/// Log level enumeration for the logging system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// No logging
    None,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Detailed trace messages
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::None => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = PxcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(LogLevel::None),
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            _ => Err(PxcError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::None => write!(f, "NONE"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Trace => write!(f, "TRACE"),
        }
    }
}

/// Internal system accounts a cluster may require a credential for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemUser {
    /// Database superuser
    Root,
    /// State snapshot transfer and backup agent
    Xtrabackup,
    /// Read-only monitoring account
    Monitor,
    /// Asynchronous replication channel account
    Replication,
    /// Health-check account used by readiness checks
    ClusterCheck,
    /// Account the controller itself uses for administration
    Operator,
    /// ProxySQL administrator
    ProxyAdmin,
    /// PMM monitoring agent
    PmmServer,
}

impl SystemUser {
    /// Every system user, in resolution order.
    pub const ALL: [SystemUser; 8] = [
        SystemUser::Root,
        SystemUser::Xtrabackup,
        SystemUser::Monitor,
        SystemUser::Replication,
        SystemUser::ClusterCheck,
        SystemUser::Operator,
        SystemUser::ProxyAdmin,
        SystemUser::PmmServer,
    ];

    /// Name of the credential key holding this user's password.
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemUser::Root => "root",
            SystemUser::Xtrabackup => "xtrabackup",
            SystemUser::Monitor => "monitor",
            SystemUser::Replication => "replication",
            SystemUser::ClusterCheck => "clustercheck",
            SystemUser::Operator => "operator",
            SystemUser::ProxyAdmin => "proxyadmin",
            SystemUser::PmmServer => "pmmserver",
        }
    }

    /// Credential key for this user.
    pub fn key(&self) -> CredentialKey {
        CredentialKey::new(self.as_str())
            .unwrap_or_else(|_| unreachable!("system user names are valid credential keys"))
    }
}

impl FromStr for SystemUser {
    type Err = PxcError;

    fn from_str(s: &str) -> Result<Self> {
        SystemUser::ALL
            .iter()
            .copied()
            .find(|user| user.as_str() == s)
            .ok_or_else(|| PxcError::Validation(format!("Unknown system user: {}", s)))
    }
}

impl fmt::Display for SystemUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Convergence of a credential set, inferred fresh on every reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceState {
    /// No credential set is stored
    Absent,
    /// The set exists but lacks some required keys
    Partial,
    /// The set holds every required key
    Complete,
}

impl fmt::Display for ConvergenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceState::Absent => write!(f, "absent"),
            ConvergenceState::Partial => write!(f, "partial"),
            ConvergenceState::Complete => write!(f, "complete"),
        }
    }
}
