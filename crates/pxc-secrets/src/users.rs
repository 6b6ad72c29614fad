//! Resolution of the system accounts a cluster requires.

use pxc_types::{ClusterSpec, CredentialKey, SystemUser};

/// The parts of a cluster's topology that decide which accounts exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterTopology {
    /// ProxySQL is deployed in front of the database nodes
    pub proxysql: bool,
    /// The PMM monitoring agent runs alongside the nodes
    pub pmm: bool,
}

impl ClusterTopology {
    /// Derive the topology from a cluster specification.
    pub fn from_spec(spec: &ClusterSpec) -> Self {
        Self {
            proxysql: spec.proxysql.enabled,
            pmm: spec.pmm.enabled,
        }
    }

    /// Whether `user` is needed under this topology.
    pub fn requires(&self, user: SystemUser) -> bool {
        match user {
            SystemUser::ProxyAdmin => self.proxysql,
            SystemUser::PmmServer => self.pmm,
            SystemUser::Root
            | SystemUser::Xtrabackup
            | SystemUser::Monitor
            | SystemUser::Replication
            | SystemUser::ClusterCheck
            | SystemUser::Operator => true,
        }
    }

    /// System users needed under this topology, in a stable order.
    pub fn users(&self) -> Vec<SystemUser> {
        SystemUser::ALL.iter().copied().filter(|u| self.requires(*u)).collect()
    }
}

/// Credential keys that must exist for `topology`.
///
/// Enabling an optional component appends its key; the keys of the base
/// topology and their relative order never change.
pub fn required_keys(topology: &ClusterTopology) -> Vec<CredentialKey> {
    topology.users().iter().map(SystemUser::key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pxc_types::config::ComponentSpec;

    fn names(keys: &[CredentialKey]) -> Vec<&str> {
        keys.iter().map(CredentialKey::as_str).collect()
    }

    #[test]
    fn test_base_topology() {
        let keys = required_keys(&ClusterTopology::default());
        assert_eq!(
            names(&keys),
            vec!["root", "xtrabackup", "monitor", "replication", "clustercheck", "operator"]
        );
    }

    #[test]
    fn test_optional_components_append_keys() {
        let base = required_keys(&ClusterTopology::default());
        let full = required_keys(&ClusterTopology { proxysql: true, pmm: true });

        assert_eq!(&full[..base.len()], &base[..]);
        assert_eq!(names(&full[base.len()..]), vec!["proxyadmin", "pmmserver"]);
    }

    #[test]
    fn test_from_spec() {
        let spec = ClusterSpec {
            proxysql: ComponentSpec::enabled(),
            haproxy: ComponentSpec::enabled(),
            ..Default::default()
        };
        let topology = ClusterTopology::from_spec(&spec);
        assert!(topology.requires(SystemUser::ProxyAdmin));
        assert!(!topology.requires(SystemUser::PmmServer));
        assert!(names(&required_keys(&topology)).contains(&"proxyadmin"));
    }
}
