//! What kind of inventory does a descriptor refer to?
//!
//! Checked in this order, the first match wins:
//! 1. an existing path, a comma separated list of hosts, a connector (`@local`, `@docker/...`) or
//!    any descriptor when override data contains `ssh_hostname`
//! 2. a registered inventory function
//! 3. a name that resolves to an address, directly or through an ssh config alias
//!
//! Lists and connectors can never be valid function names, so checking them first is unambiguous.
//! Functions come before name resolution so a registered function keeps working even when a
//! domain of the same name starts to resolve.
use crate::function::{FunctionRegistry, InventoryFn};
use crate::ssh_config::SshConfig;
use crate::value::Data;
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};

/// Override data key naming an explicit connection target
pub const SSH_HOSTNAME_KEY: &str = "ssh_hostname";

pub enum InventorySource<'r> {
    /// inventory file, list of hosts or connector
    FilesOrHosts,
    Function {
        name: &'r str,
        function: &'r InventoryFn,
    },
    Unresolved,
}

impl std::fmt::Debug for InventorySource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventorySource::FilesOrHosts => f.write_str("FilesOrHosts"),
            InventorySource::Function { name, .. } => f.debug_tuple("Function").field(name).finish(),
            InventorySource::Unresolved => f.write_str("Unresolved"),
        }
    }
}

/// Name resolution used to decide if a descriptor is a single host
pub trait HostLookup {
    /// Does `name` resolve to at least one address?
    fn resolves(&self, name: &str) -> bool;

    /// The `HostName` configured for `name` in the ssh client config, if it differs from `name`
    fn ssh_alias(&self, name: &str) -> Option<String>;
}

/// [HostLookup] backed by the system resolver and the user's ssh config
#[derive(Debug, Default, derive_new::new)]
pub struct SystemLookup {
    /// defaults to `~/.ssh/config`
    ssh_config_path: Option<PathBuf>,
}

impl HostLookup for SystemLookup {
    fn resolves(&self, name: &str) -> bool {
        (name, 0)
            .to_socket_addrs()
            .map(|mut addrs| addrs.next().is_some())
            .unwrap_or(false)
    }

    fn ssh_alias(&self, name: &str) -> Option<String> {
        tracing::debug!(name, "Checking if name is an SSH alias");

        let Some(path) = self.ssh_config_path.clone().or_else(SshConfig::default_path) else {
            tracing::debug!("Could not load SSH config");
            return None;
        };

        let config = match SshConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "Could not load SSH config");
                return None;
            }
        };

        config
            .lookup(name)
            .swap_remove("hostname")
            .filter(|alias| alias != name)
    }
}

/// Does `name` resolve directly or via its ssh alias?
pub fn resolves_to_host(lookup: &dyn HostLookup, name: &str) -> bool {
    if lookup.resolves(name) {
        return true;
    }

    match lookup.ssh_alias(name) {
        Some(alias) => lookup.resolves(&alias),
        None => false,
    }
}

pub fn is_path_or_host_list_or_connector(inventory: &str, override_data: &Data) -> bool {
    Path::new(inventory).exists()
        || inventory.contains(',')
        || inventory.contains('@')
        || override_data.contains_key(SSH_HOSTNAME_KEY)
}

pub fn classify<'r>(
    inventory: &str,
    override_data: &Data,
    registry: &'r FunctionRegistry,
    lookup: &dyn HostLookup,
) -> InventorySource<'r> {
    if is_path_or_host_list_or_connector(inventory, override_data) {
        return InventorySource::FilesOrHosts;
    }

    if let Some((name, function)) = registry.resolve(inventory) {
        return InventorySource::Function { name, function };
    }

    if resolves_to_host(lookup, inventory) {
        return InventorySource::FilesOrHosts;
    }

    InventorySource::Unresolved
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::value::Value;

    /// Resolves a fixed set of names, aliases come from a fixed table
    #[derive(Default)]
    pub(crate) struct StaticLookup {
        pub resolvable: Vec<&'static str>,
        pub aliases: Vec<(&'static str, &'static str)>,
    }

    impl HostLookup for StaticLookup {
        fn resolves(&self, name: &str) -> bool {
            self.resolvable.iter().any(|candidate| *candidate == name)
        }

        fn ssh_alias(&self, name: &str) -> Option<String> {
            self.aliases
                .iter()
                .find(|(alias, _)| *alias == name)
                .map(|(_, target)| target.to_string())
        }
    }

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register("inventories.make", || Ok(Value::Object(Data::new())));
        registry.register("a,b", || Ok(Value::Object(Data::new())));
        registry
    }

    fn classify_with(inventory: &str, lookup: &StaticLookup) -> String {
        format!("{:?}", classify(inventory, &Data::new(), &registry(), lookup))
    }

    #[test]
    fn lists_and_connectors_are_hosts() {
        let lookup = StaticLookup::default();
        assert_eq!(classify_with("a,b", &lookup), "FilesOrHosts");
        assert_eq!(classify_with("@local", &lookup), "FilesOrHosts");
        assert_eq!(classify_with("@docker/ubuntu", &lookup), "FilesOrHosts");
    }

    #[test]
    fn existing_path_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.hcl");
        std::fs::write(&path, "").unwrap();

        let lookup = StaticLookup::default();
        assert_eq!(classify_with(path.to_str().unwrap(), &lookup), "FilesOrHosts");
    }

    #[test]
    fn ssh_hostname_override_forces_hosts() {
        let override_data: Data = [("ssh_hostname".to_string(), Value::from("10.0.0.1"))]
            .into_iter()
            .collect();
        let registry = registry();
        let source = classify("my-box", &override_data, &registry, &StaticLookup::default());
        assert!(matches!(source, InventorySource::FilesOrHosts));
    }

    #[test]
    fn functions_win_over_resolvable_names() {
        let lookup = StaticLookup {
            resolvable: vec!["inventories.make"],
            ..Default::default()
        };
        assert_eq!(
            classify_with("inventories:make", &lookup),
            r#"Function("inventories.make")"#
        );
    }

    #[test]
    fn resolvable_name_is_a_host() {
        let lookup = StaticLookup {
            resolvable: vec!["web.example.com"],
            ..Default::default()
        };
        assert_eq!(classify_with("web.example.com", &lookup), "FilesOrHosts");
    }

    #[test]
    fn ssh_alias_is_resolved_again() {
        let lookup = StaticLookup {
            resolvable: vec!["10.0.0.9"],
            aliases: vec![("box", "10.0.0.9"), ("ghost", "nowhere.invalid")],
        };
        assert_eq!(classify_with("box", &lookup), "FilesOrHosts");
        assert_eq!(classify_with("ghost", &lookup), "Unresolved");
    }

    #[test]
    fn unknown_descriptor_is_unresolved() {
        let lookup = StaticLookup::default();
        assert_eq!(classify_with("not-a-path-or-host", &lookup), "Unresolved");
    }

    #[test]
    fn system_lookup_reads_ssh_alias() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "Host box\n  HostName 127.0.0.1\nHost same\n  HostName same\n")
            .unwrap();

        let lookup = SystemLookup::new(Some(path));
        assert_eq!(lookup.ssh_alias("box"), Some("127.0.0.1".to_string()));
        assert_eq!(lookup.ssh_alias("same"), None);
        assert_eq!(lookup.ssh_alias("other"), None);
        assert!(lookup.resolves("127.0.0.1"));
    }

    #[test]
    fn system_lookup_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = SystemLookup::new(Some(dir.path().join("missing")));
        assert_eq!(lookup.ssh_alias("box"), None);
    }
}
