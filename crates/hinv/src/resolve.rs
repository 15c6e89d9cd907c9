//! Turn an inventory descriptor into an [Inventory]
//!
//! See [crate::source] for how descriptors are classified. File and host list descriptors are
//! assembled in two phases:
//! 1. groups are read from the definition file (or the host list) and a provisional inventory is
//!    built from them
//! 2. group data files are evaluated with the provisional inventory as `inventory` variable, their
//!    data is merged into the groups and the final inventory is built
use crate::definition::{self, Groups};
use crate::function::{self, FunctionRegistry};
use crate::group_data::{self, GroupData};
use crate::hcl_document::LoadError;
use crate::host::{GroupEntry, HostEntry};
use crate::inventory::{Inventory, ALL_GROUP};
use crate::source::{self, HostLookup, InventorySource};
use crate::value::Data;
use std::path::{Path, PathBuf};

pub const GROUP_DATA_DIR: &str = "group_data";

#[derive(thiserror::Error, Debug)]
pub enum InventoryError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Failed to load inventory function: {name}")]
    FunctionFailed {
        name: String,
        source: anyhow::Error,
    },
    #[error("Inventory function {name} did not return an object")]
    NotAnObject { name: String },
    #[error("Inventory function {name} group is neither a list of hosts nor a [hosts, data] pair: {group}")]
    InvalidGroup { name: String, group: String },
    #[error("Inventory function {name} group contains non-object data: {group}")]
    GroupData { name: String, group: String },
    #[error("Inventory function {name} invalid host: {host}")]
    InvalidHost { name: String, host: String },
}

/// Caller supplied settings for one resolution
#[derive(Debug, Default, Clone)]
pub struct ResolveOptions {
    /// Highest precedence data, applied on top of everything else
    pub override_data: Data,
    /// `<cwd>/group_data` is searched first when set
    pub cwd: Option<PathBuf>,
    /// Searched after the built-in group data directories, later ones win
    pub group_data_directories: Vec<PathBuf>,
}

impl ResolveOptions {
    pub fn with_override_data(mut self, override_data: Data) -> Self {
        self.override_data = override_data;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_group_data_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.group_data_directories.push(directory.into());
        self
    }
}

#[derive(derive_new::new)]
pub struct Resolver<'a> {
    registry: &'a FunctionRegistry,
    lookup: &'a dyn HostLookup,
}

impl Resolver<'_> {
    #[tracing::instrument(level = "debug", skip(self, options))]
    pub fn make_inventory(
        &self,
        inventory: &str,
        options: &ResolveOptions,
    ) -> Result<Inventory, InventoryError> {
        let source =
            source::classify(inventory, &options.override_data, self.registry, self.lookup);
        tracing::debug!(?source, "inventory classified");

        match source {
            InventorySource::FilesOrHosts => make_inventory_from_files(inventory, options),
            InventorySource::Function { name, function } => {
                function::make_inventory_from_func(name, function, options.override_data.clone())
            }
            InventorySource::Unresolved => {
                tracing::warn!(
                    inventory,
                    "Inventory is neither an inventory file, a (list of) hosts or connectors nor refers to an inventory function"
                );
                Ok(Inventory::empty())
            }
        }
    }
}

/// Build an inventory from a definition file, or from a comma separated list of hosts when no such
/// file exists
pub fn make_inventory_from_files(
    inventory: &str,
    options: &ResolveOptions,
) -> Result<Inventory, InventoryError> {
    let inventory_path = Path::new(inventory);
    let mut file_groupname = None;

    let mut groups: Groups = if inventory_path.exists() {
        // every host of `inventories/dev.hcl` is also in the group `dev`
        file_groupname = inventory_path
            .file_stem()
            .and_then(|name| name.to_str())
            .map(str::to_string);

        definition::load_groups(inventory_path)?
    } else {
        let hosts = inventory.split(',').map(HostEntry::from).collect();
        [(ALL_GROUP.to_string(), GroupEntry::Hosts(hosts))]
            .into_iter()
            .collect()
    };

    let (all_hosts, all_data) = match groups.shift_remove(ALL_GROUP) {
        Some(all) => all.into_parts(),
        None => (collect_all_hosts(&groups), Data::new()),
    };

    groups.insert(
        ALL_GROUP.to_string(),
        GroupEntry::WithData(all_hosts.clone(), all_data.clone()),
    );

    if let Some(file_groupname) = file_groupname {
        if !groups.contains_key(&file_groupname) {
            groups.insert(file_groupname, GroupEntry::Hosts(all_hosts.clone()));
        }
    }

    tracing::debug!("Creating provisional inventory...");
    let provisional = Inventory::new(
        (all_hosts, all_data),
        groups
            .iter()
            .filter(|(name, _)| name.as_str() != ALL_GROUP)
            .map(|(name, group)| (name.clone(), group.clone().into_parts())),
        Data::new(),
    );

    let folders = group_data_folders(inventory_path, options)?;
    let mut group_data = collect_group_data(&folders, &provisional)?;

    let mut groups: indexmap::IndexMap<String, (Vec<HostEntry>, Data)> = groups
        .into_iter()
        .map(|(name, group)| {
            let (hosts, mut data) = group.into_parts();
            if let Some(extra) = group_data.shift_remove(&name) {
                data.extend(extra);
            }
            (name, (hosts, data))
        })
        .collect();

    // data for groups without hosts, connectors may put hosts into them later
    for (name, data) in group_data {
        groups.insert(name, (vec![], data));
    }

    // `all` was re-inserted above, it is always present here
    let all = groups.shift_remove(ALL_GROUP).unwrap_or_default();

    Ok(Inventory::new(all, groups, options.override_data.clone()))
}

/// Hosts of all groups by name, in first seen order
fn collect_all_hosts(groups: &Groups) -> Vec<HostEntry> {
    let mut names: indexmap::IndexSet<&str> = Default::default();
    for group in groups.values() {
        names.extend(group.hosts().iter().map(HostEntry::name));
    }

    names.into_iter().map(HostEntry::from).collect()
}

/// `<cwd>/group_data`, `<inventory dir>/group_data` and any extra directories, in that order
fn group_data_folders(
    inventory_path: &Path,
    options: &ResolveOptions,
) -> Result<Vec<PathBuf>, LoadError> {
    let mut folders = vec![];

    let cwd = options.cwd.as_deref().map(absolute).transpose()?;
    if let Some(cwd) = &cwd {
        folders.push(cwd.join(GROUP_DATA_DIR));
    }

    let inventory_dir = absolute(inventory_path.parent().unwrap_or(Path::new("")))?;
    if cwd.as_ref() != Some(&inventory_dir) {
        folders.push(inventory_dir.join(GROUP_DATA_DIR));
    }

    folders.extend(options.group_data_directories.iter().cloned());
    Ok(folders)
}

fn collect_group_data(folders: &[PathBuf], provisional: &Inventory) -> Result<GroupData, LoadError> {
    let mut collected = GroupData::new();

    for folder in folders {
        for (group_name, data) in group_data::get_group_data(folder, provisional)? {
            tracing::debug!(group = %group_name, ?data, "Adding data to group");
            collected.entry(group_name).or_default().extend(data);
        }
    }

    Ok(collected)
}

/// Absolute form of `path` without resolving symlinks, the empty path is the current directory
fn absolute(path: &Path) -> Result<PathBuf, LoadError> {
    let io_error = |err| LoadError::Io {
        path: path.to_path_buf(),
        source: err,
    };

    if path.as_os_str().is_empty() {
        return std::env::current_dir().map_err(io_error);
    }

    std::path::absolute(path).map_err(io_error)
}
