//! The assembled inventory: hosts, groups and their data
//!
//! Data precedence for a host, lowest first:
//! 1. data of the `all` group
//! 2. data of each other group containing the host, in group order
//! 3. data attached to the host itself (`["host", { ... }]`), later occurrences win
//! 4. override data
use crate::host::HostEntry;
use crate::value::{Data, Value};
use serde::ser::SerializeMap;

pub const ALL_GROUP: &str = "all";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub hosts: Vec<String>,
    pub data: Data,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    /// All groups, `all` first
    groups: indexmap::IndexMap<String, Group>,
    /// Data attached directly to hosts, keyed by host name
    host_data: indexmap::IndexMap<String, Data>,
    override_data: Data,
}

impl Inventory {
    /// Build an inventory from the `all` group and any number of named groups
    ///
    /// Group host lists are kept as given. Hosts referenced by named groups but missing from `all`
    /// are appended to `all`. Host identity is the name, [Inventory::hosts] lists each name once.
    pub fn new(
        (all_hosts, all_data): (Vec<HostEntry>, Data),
        groups: impl IntoIterator<Item = (String, (Vec<HostEntry>, Data))>,
        override_data: Data,
    ) -> Self {
        let mut host_data: indexmap::IndexMap<String, Data> = Default::default();
        let mut all = Group {
            hosts: Vec::with_capacity(all_hosts.len()),
            data: all_data,
        };

        for host in all_hosts {
            let (name, data) = host.into_parts();
            host_data.entry(name.clone()).or_default().extend(data);
            all.hosts.push(name);
        }

        let mut named_groups = indexmap::IndexMap::new();
        for (group_name, (hosts, data)) in groups {
            if group_name == ALL_GROUP {
                tracing::warn!("Ignoring named group `all`, it is always built from the `all` hosts");
                continue;
            }

            let mut group = Group {
                hosts: Vec::with_capacity(hosts.len()),
                data,
            };
            for host in hosts {
                let (name, data) = host.into_parts();
                let known = host_data.entry(name.clone()).or_insert_with(|| {
                    all.hosts.push(name.clone());
                    Data::new()
                });
                known.extend(data);
                group.hosts.push(name);
            }
            named_groups.insert(group_name, group);
        }

        let mut groups = indexmap::IndexMap::with_capacity(named_groups.len() + 1);
        groups.insert(ALL_GROUP.to_string(), all);
        groups.extend(named_groups);

        Self {
            groups,
            host_data,
            override_data,
        }
    }

    /// An inventory without any hosts
    pub fn empty() -> Self {
        Self::new((vec![], Data::new()), [], Data::new())
    }

    /// Host names in `all` order
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.host_data.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.host_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.host_data.is_empty()
    }

    pub fn contains_host(&self, name: &str) -> bool {
        self.host_data.contains_key(name)
    }

    /// All groups including `all`
    pub fn groups(&self) -> impl Iterator<Item = (&str, &Group)> {
        self.groups.iter().map(|(name, group)| (name.as_str(), group))
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn all(&self) -> &Group {
        &self.groups[ALL_GROUP]
    }

    pub fn override_data(&self) -> &Data {
        &self.override_data
    }

    /// Names of the groups a host is a member of, `all` excluded
    pub fn groups_for_host<'a>(&'a self, host: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.groups
            .iter()
            .skip(1)
            .filter(move |(_, group)| group.hosts.iter().any(|member| member == host))
            .map(|(name, _)| name.as_str())
    }

    /// Group data with override data applied on top
    pub fn get_group_data(&self, name: &str) -> Option<Data> {
        let mut data = self.groups.get(name)?.data.clone();
        data.extend(self.override_data.clone());
        Some(data)
    }

    /// Fully merged data of a host
    pub fn get_host_data(&self, name: &str) -> Option<Data> {
        let own_data = self.host_data.get(name)?;

        let mut data = self.all().data.clone();
        for group_name in self.groups_for_host(name) {
            data.extend(self.groups[group_name].data.clone());
        }
        data.extend(own_data.clone());
        data.extend(self.override_data.clone());

        Some(data)
    }

    /// Read-only view handed to group data files as the `inventory` variable
    ///
    /// ```hcl
    /// inventory = {
    ///   hosts  = ["a", "b"]
    ///   groups = { all = ["a", "b"], web = ["a"] }
    ///   data   = { all = {}, web = { port = 80 } }
    /// }
    /// ```
    pub fn snapshot(&self) -> hcl::Value {
        let groups: hcl::Map<String, hcl::Value> = self
            .groups
            .iter()
            .map(|(name, group)| (name.clone(), hcl::Value::from(group.hosts.clone())))
            .collect();

        let data: hcl::Map<String, hcl::Value> = self
            .groups
            .iter()
            .map(|(name, group)| (name.clone(), Value::Object(group.data.clone()).into()))
            .collect();

        hcl::Value::Object(
            [
                ("hosts".to_string(), hcl::Value::from(self.hosts().collect::<Vec<_>>())),
                ("groups".to_string(), hcl::Value::Object(groups)),
                ("data".to_string(), hcl::Value::Object(data)),
            ]
            .into_iter()
            .collect(),
        )
    }
}

impl serde::Serialize for Inventory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        struct Groups<'a>(&'a Inventory);
        struct GroupView<'a>(&'a Group, Data);
        struct Hosts<'a>(&'a Inventory);

        impl serde::Serialize for Groups<'_> {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut ser = serializer.serialize_map(Some(self.0.groups.len()))?;
                for (name, group) in &self.0.groups {
                    let data = self.0.get_group_data(name).unwrap_or_default();
                    ser.serialize_entry(name, &GroupView(group, data))?;
                }
                ser.end()
            }
        }

        impl serde::Serialize for GroupView<'_> {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut ser = serializer.serialize_map(Some(2))?;
                ser.serialize_entry("hosts", &self.0.hosts)?;
                ser.serialize_entry("data", &self.1)?;
                ser.end()
            }
        }

        impl serde::Serialize for Hosts<'_> {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut ser = serializer.serialize_map(Some(self.0.len()))?;
                for name in self.0.hosts() {
                    let data = self.0.get_host_data(name).unwrap_or_default();
                    ser.serialize_entry(name, &data)?;
                }
                ser.end()
            }
        }

        let mut ser = serializer.serialize_map(Some(2))?;
        ser.serialize_entry("groups", &Groups(self))?;
        ser.serialize_entry("hosts", &Hosts(self))?;
        ser.end()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data(pairs: &[(&str, i64)]) -> Data {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), Value::Integer(*value)))
            .collect()
    }

    fn hosts(names: &[&str]) -> Vec<HostEntry> {
        names.iter().map(|name| HostEntry::from(*name)).collect()
    }

    #[test]
    fn empty_inventory_has_all_group() {
        let inventory = Inventory::empty();
        assert!(inventory.is_empty());
        assert_eq!(inventory.all(), &Group::default());
        assert_eq!(inventory.groups().count(), 1);
    }

    #[test]
    fn all_collects_hosts_of_named_groups() {
        let inventory = Inventory::new(
            (hosts(&["a"]), Data::new()),
            [("web".to_string(), (hosts(&["b", "a", "b"]), Data::new()))],
            Data::new(),
        );

        assert_eq!(inventory.all().hosts, ["a", "b"]);
        assert_eq!(inventory.group("web").unwrap().hosts, ["b", "a", "b"]);
        assert_eq!(inventory.hosts().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn host_data_precedence() {
        let inventory = Inventory::new(
            (
                vec![HostEntry::WithData("a".into(), data(&[("own", 1)]))],
                data(&[("all", 1), ("group", 0), ("own", 0), ("override", 0)]),
            ),
            [
                ("one".to_string(), (hosts(&["a"]), data(&[("group", 1)]))),
                ("two".to_string(), (hosts(&["a"]), data(&[("group", 2)]))),
            ],
            data(&[("override", 1)]),
        );

        assert_eq!(
            inventory.get_host_data("a"),
            Some(data(&[("all", 1), ("group", 2), ("own", 1), ("override", 1)]))
        );
        assert_eq!(inventory.groups_for_host("a").collect::<Vec<_>>(), ["one", "two"]);
        assert_eq!(inventory.get_host_data("missing"), None);
    }

    #[test]
    fn later_host_data_wins() {
        let inventory = Inventory::new(
            (
                vec![HostEntry::WithData("a".into(), data(&[("n", 1), ("m", 1)]))],
                Data::new(),
            ),
            [(
                "web".to_string(),
                (
                    vec![HostEntry::WithData("a".into(), data(&[("n", 2)]))],
                    Data::new(),
                ),
            )],
            Data::new(),
        );

        assert_eq!(inventory.get_host_data("a"), Some(data(&[("n", 2), ("m", 1)])));
    }

    #[test]
    fn override_applies_to_group_data() {
        let inventory = Inventory::new(
            (hosts(&["a"]), Data::new()),
            [("web".to_string(), (hosts(&["a"]), data(&[("port", 80)])))],
            data(&[("port", 8080)]),
        );

        assert_eq!(inventory.get_group_data("web"), Some(data(&[("port", 8080)])));
        assert_eq!(inventory.group("web").unwrap().data, data(&[("port", 80)]));
    }

    #[test]
    fn snapshot_lists_hosts_and_groups() {
        let inventory = Inventory::new(
            (hosts(&["a", "b"]), Data::new()),
            [("web".to_string(), (hosts(&["a"]), data(&[("port", 80)])))],
            Data::new(),
        );

        assert_eq!(
            inventory.snapshot(),
            hcl::value!({
                hosts = ["a", "b"]
                groups = {
                    all = ["a", "b"]
                    web = ["a"]
                }
                data = {
                    all = {}
                    web = { port = 80 }
                }
            })
        );
    }
}
