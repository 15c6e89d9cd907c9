//! groups from an inventory definition file
//!
//! Every exported root attribute that looks like a group becomes one:
//! ```hcl
//! _domain = "example.com"
//!
//! web = ["web-1.${_domain}", "web-2.${_domain}"]
//! db  = [["db-1.${_domain}"], { postgres_version = 16 }]
//! ```
//! `_domain` is a private helper and is not a group.
use crate::hcl_document::{Bindings, HclDocument, LoadError};
use crate::host::GroupEntry;
use crate::value::Value;
use std::path::Path;

/// Groups in definition order
pub type Groups = indexmap::IndexMap<String, GroupEntry>;

/// Load a definition file and extract its groups
pub fn load_groups(file_path: &Path) -> Result<Groups, LoadError> {
    let document = HclDocument::load_file(file_path)?;
    groups_from_document(&document)
}

pub fn groups_from_document(document: &HclDocument) -> Result<Groups, LoadError> {
    let bindings = document.evaluate_exported(&hcl::eval::Context::new())?;
    Ok(groups_from_bindings(bindings))
}

/// Keep the bindings that are valid inventory groups
///
/// Invalid bindings are logged and skipped, they never fail the whole file.
pub fn groups_from_bindings(bindings: Bindings) -> Groups {
    bindings
        .into_iter()
        .filter_map(|(name, value)| {
            let group = as_inventory_group(&name, &value)?;
            Some((name, group))
        })
        .collect()
}

fn as_inventory_group(name: &str, value: &Value) -> Option<GroupEntry> {
    if name.starts_with("__") {
        return None;
    }

    if name.starts_with('_') {
        tracing::debug!(
            name,
            "Ignoring variable in inventory file since it starts with a leading underscore"
        );
        return None;
    }

    match GroupEntry::from_value(value) {
        Ok(Some(group)) => Some(group),
        Ok(None) => {
            tracing::debug!(
                name,
                kind = value.kind(),
                "Ignoring variable in inventory file since it is not a list"
            );
            None
        }
        Err(err) => {
            tracing::warn!(
                group = name,
                error = %err,
                "Ignoring host group. Host groups may only contain strings (host) or [string, object] pairs (host, data)."
            );
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hcl_document;
    use crate::host::HostEntry;
    use pretty_assertions::assert_eq;

    fn groups(hcl: &str) -> Groups {
        groups_from_document(&hcl_document!(hcl)).unwrap()
    }

    #[test]
    fn lists_and_pairs_are_groups() {
        let groups = groups(
            r#"
            web = ["web-1", ["web-2", { port = 2222 }]]
            db = [["db-1"], { role = "primary" }]
            "#,
        );

        assert_eq!(groups.keys().collect::<Vec<_>>(), ["web", "db"]);
        assert_eq!(
            groups["web"].hosts().iter().map(HostEntry::name).collect::<Vec<_>>(),
            ["web-1", "web-2"]
        );
        assert!(matches!(groups["db"], GroupEntry::WithData(..)));
    }

    #[test]
    fn private_and_non_list_bindings_are_skipped() {
        let groups = groups(
            r#"
            _private = ["a"]
            __reserved = ["b"]
            port = 22
            name = "c"
            web = ["d"]
            "#,
        );

        assert_eq!(groups.keys().collect::<Vec<_>>(), ["web"]);
    }

    #[test]
    fn invalid_group_is_excluded_entirely() {
        let groups = groups(
            r#"
            broken = ["a", 1]
            nested = [["a", "b", "c"]]
            web = ["d"]
            "#,
        );

        assert_eq!(groups.keys().collect::<Vec<_>>(), ["web"]);
    }

    #[test]
    fn helpers_can_build_groups() {
        let groups = groups(
            r#"
            _domain = "example.com"
            web = [for n in [1, 2] : "web-${n}.${_domain}"]
            "#,
        );

        assert_eq!(
            groups["web"],
            GroupEntry::Hosts(vec![
                "web-1.example.com".into(),
                "web-2.example.com".into()
            ])
        );
    }

    #[test]
    fn export_list_limits_groups() {
        let groups = groups(
            r#"
            __export__ = ["db"]
            web = ["a"]
            db = ["b"]
            "#,
        );

        assert_eq!(groups.keys().collect::<Vec<_>>(), ["db"]);
    }
}
