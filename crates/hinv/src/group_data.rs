//! group data files
//!
//! Each `<group>.hcl` file in a `group_data` directory provides data for the group `<group>`.
//! Data files can look at the inventory that is being assembled through the `inventory` variable
//! (see [Inventory::snapshot]):
//! ```hcl
//! # group_data/web.hcl
//! upstreams = [for host in inventory.groups.app : "${host}:8080"]
//! ```
use crate::hcl_document::{HclDocument, LoadError};
use crate::inventory::Inventory;
use crate::value::Data;
use std::path::{Path, PathBuf};

pub const DATA_FILE_EXTENSION: &str = ".hcl";

/// Variable holding the provisional inventory, data files cannot bind it themselves
pub const INVENTORY_VAR: &str = "inventory";

/// Data per group name, in file name order
pub type GroupData = indexmap::IndexMap<String, Data>;

/// Load group data from a single file or from all files of a directory
///
/// A path that does not exist yields no data.
pub fn get_group_data(dir_or_file: &Path, inventory: &Inventory) -> Result<GroupData, LoadError> {
    tracing::debug!(path = %dir_or_file.display(), "Checking possible group_data");

    let mut group_data = GroupData::new();
    if !dir_or_file.exists() {
        return Ok(group_data);
    }

    let files = if dir_or_file.is_file() {
        vec![dir_or_file.to_path_buf()]
    } else {
        list_files(dir_or_file)?
    };

    let mut context = hcl::eval::Context::new();
    context.declare_var(INVENTORY_VAR, inventory.snapshot());

    for file in files {
        let Some(group_name) = file
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(DATA_FILE_EXTENSION))
        else {
            continue;
        };

        tracing::debug!(path = %file.display(), group = group_name, "Looking for group data");
        let document = HclDocument::load_file(&file)?;
        document.ensure_unbound(INVENTORY_VAR)?;
        let data = document.evaluate_exported(&context)?;

        group_data.insert(group_name.to_string(), data);
    }

    Ok(group_data)
}

/// Regular files of a directory sorted by name
fn list_files(dir_path: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let io_error = |err| LoadError::Io {
        path: dir_path.to_path_buf(),
        source: err,
    };

    let mut files = vec![];
    for dir_entry in std::fs::read_dir(dir_path).map_err(io_error)? {
        let file_path = dir_entry.map_err(io_error)?.path();
        if file_path.is_file() {
            files.push(file_path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::host::HostEntry;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn inventory() -> Inventory {
        Inventory::new(
            (vec![HostEntry::from("a"), HostEntry::from("b")], Data::new()),
            [(
                "app".to_string(),
                (vec![HostEntry::from("b")], Data::new()),
            )],
            Data::new(),
        )
    }

    #[test]
    fn missing_path_has_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let data = get_group_data(&dir.path().join("group_data"), &inventory()).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn directory_files_become_groups() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "web.hcl", "port = 80\n__internal = 1");
        write(dir.path(), "all.hcl", "user = \"deploy\"");
        write(dir.path(), "notes.txt", "not = data");
        std::fs::create_dir(dir.path().join("nested.hcl")).unwrap();

        let data = get_group_data(dir.path(), &inventory()).unwrap();

        assert_eq!(data.keys().collect::<Vec<_>>(), ["all", "web"]);
        assert_eq!(
            data["web"],
            [("port".to_string(), Value::Integer(80))]
                .into_iter()
                .collect::<Data>()
        );
    }

    #[test]
    fn single_file_is_a_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "db.hcl", "port = 5432");

        let data = get_group_data(&file, &inventory()).unwrap();
        assert_eq!(data.keys().collect::<Vec<_>>(), ["db"]);
    }

    #[test]
    fn data_files_see_the_inventory() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "web.hcl",
            r#"upstreams = [for host in inventory.groups.app : "${host}:8080"]"#,
        );
        let data = get_group_data(dir.path(), &inventory()).unwrap();
        assert_eq!(data["web"]["upstreams"], Value::from(vec!["b:8080"]));
    }

    #[test]
    fn data_files_cannot_bind_inventory() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "web.hcl",
            "x = inventory.hosts\ninventory = { hosts = [\"z\"] }",
        );

        let err = get_group_data(dir.path(), &inventory()).expect_err("must error");
        assert!(matches!(err, LoadError::ReservedName { name, .. } if name == "inventory"));
    }

    #[test]
    fn broken_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "web.hcl", "port = ");

        let err = get_group_data(dir.path(), &inventory()).expect_err("must error");
        assert!(matches!(err, LoadError::HclParseFailed { .. }));
    }
}
