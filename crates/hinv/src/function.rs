//! inventories produced by registered functions
//!
//! A resolver function returns an object of groups, in the same shapes a definition file uses:
//! ```text
//! { "web": [["h1", "h2"], { "port": 80 }], "db": ["d1"] }
//! ```
//! Functions are looked up by name, `module.function` and `module:function` are the same name.
use crate::host::{GroupEntry, HostEntry, ShapeError};
use crate::inventory::{Inventory, ALL_GROUP};
use crate::resolve::InventoryError;
use crate::value::{Data, Value};

pub type InventoryFn = Box<dyn Fn() -> anyhow::Result<Value>>;

#[derive(Default)]
pub struct FunctionRegistry {
    functions: indexmap::IndexMap<String, InventoryFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, reference: &str, function: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<Value> + 'static,
    {
        self.functions
            .insert(normalize_reference(reference), Box::new(function));
        self
    }

    /// Look up a function, `None` when nothing is registered under that name
    pub fn resolve(&self, reference: &str) -> Option<(&str, &InventoryFn)> {
        self.functions
            .get_key_value(normalize_reference(reference).as_str())
            .map(|(name, function)| (name.as_str(), function))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

fn normalize_reference(reference: &str) -> String {
    reference.replace(':', ".")
}

/// Call a resolver function and build the inventory from the groups it returns
pub fn make_inventory_from_func(
    name: &str,
    function: &InventoryFn,
    override_data: Data,
) -> Result<Inventory, InventoryError> {
    tracing::warn!("Loading inventory via import function is in alpha!");

    let groups = function().map_err(|source| InventoryError::FunctionFailed {
        name: name.to_string(),
        source,
    })?;

    let Value::Object(groups) = groups else {
        return Err(InventoryError::NotAnObject {
            name: name.to_string(),
        });
    };

    let mut all_hosts: indexmap::IndexSet<String> = Default::default();
    let mut all_data = Data::new();
    let mut groups_with_data = Vec::with_capacity(groups.len());

    for (group_name, value) in groups {
        let (hosts, data) = parse_group(name, &group_name, &value)?.into_parts();
        let hosts = first_host_data_wins(hosts);

        all_hosts.extend(hosts.iter().map(|host| host.name().to_string()));

        if group_name == ALL_GROUP {
            all_data.extend(data);
            continue;
        }

        groups_with_data.push((group_name, (hosts, data)));
    }

    Ok(Inventory::new(
        (all_hosts.into_iter().map(HostEntry::Bare).collect(), all_data),
        groups_with_data,
        override_data,
    ))
}

/// Within one group list the first data given for a host name is kept, later data is dropped
fn first_host_data_wins(hosts: Vec<HostEntry>) -> Vec<HostEntry> {
    let mut with_data = std::collections::HashSet::new();

    hosts
        .into_iter()
        .map(|host| match host {
            HostEntry::WithData(host_name, data) => {
                if with_data.insert(host_name.clone()) {
                    HostEntry::WithData(host_name, data)
                } else {
                    tracing::debug!(host = %host_name, "Ignoring repeated host data in group");
                    HostEntry::Bare(host_name)
                }
            }
            bare => bare,
        })
        .collect()
}

fn parse_group(name: &str, group_name: &str, value: &Value) -> Result<GroupEntry, InventoryError> {
    // `[[hosts...], data]` where data is not an object
    if let Value::Array(items) = value {
        if let [first @ Value::Array(_), data] = items.as_slice() {
            if !matches!(data, Value::Object(_)) && HostEntry::try_from(first).is_err() {
                return Err(InventoryError::GroupData {
                    name: name.to_string(),
                    group: group_name.to_string(),
                });
            }
        }
    }

    match GroupEntry::from_value(value) {
        Ok(Some(group)) => Ok(group),
        Ok(None) => Err(InventoryError::InvalidGroup {
            name: name.to_string(),
            group: group_name.to_string(),
        }),
        Err(ShapeError::Host(host)) => Err(InventoryError::InvalidHost {
            name: name.to_string(),
            host: host.to_string(),
        }),
    }
}
