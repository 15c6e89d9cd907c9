//! # hinv - host inventory resolution
//!
//! Turns an inventory descriptor into a set of hosts, the groups they belong to and the data
//! attached to each of them.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `hinv` works internally.
//!
//! ### Descriptors
//!
//! An inventory descriptor is a single string. It can be
//! - a path to an inventory definition file: `inventories/prod.hcl`
//! - a comma separated list of hosts: `10.0.0.1,10.0.0.2`
//! - a connector: `@local`, `@docker/ubuntu`
//! - the name of a registered inventory function: `inventories.make_hosts`
//! - a single resolvable host name, or an ssh alias of one: `web.example.com`
//!
//! [source::classify] decides which one it is, see there for the order of checks. Anything else
//! results in an empty inventory and a warning.
//!
//! ### Definition files
//!
//! Definition files are HCL documents ([hcl_document::HclDocument]). Only top level attributes
//! count, blocks are skipped with a warning. Every attribute whose value is a list of hosts is a
//! group:
//! ```hcl
//! web = ["web1", ["web2", { port = 8080 }]]
//! db  = [["db1"], { engine = "postgres" }]
//!
//! # not a list: ignored
//! region = "eu-central"
//!
//! # leading underscore: private helper, never a group
//! _prefix = "app"
//! app     = ["${_prefix}1", "${_prefix}2"]
//! ```
//! See [host] for the accepted host and group shapes. Attributes may reference each other in any
//! order, reference loops are reported.
//!
//! ### Two phases
//!
//! see [resolve::make_inventory_from_files]
//!
//! Files and host lists are assembled in two phases. First the groups of the definition file (or the
//! host list) form a provisional [inventory::Inventory]. The implicit `all` group holds every host and
//! the file name (without extension) becomes a group of all hosts too, unless the file defines it.
//!
//! Then `group_data` directories are searched ([group_data]). Each `<group>.hcl` file is evaluated
//! with the provisional inventory available as the `inventory` variable:
//! ```hcl
//! # group_data/web.hcl
//! db_hosts = inventory.groups.db
//! ```
//! Its bindings are merged into the data of `<group>`, files found later win. The final inventory is
//! built from the merged groups.
//!
//! ### Data precedence
//!
//! [inventory::Inventory::get_host_data] merges, lowest first: the data of `all`, the data of each
//! group containing the host (in group order), the host's own data and the override data given by
//! the caller.
//!
//! ### Inventory functions
//!
//! see [function]
//!
//! A program embedding `hinv` can register functions producing inventories in a
//! [function::FunctionRegistry] and hand it to [resolve::Resolver].
//!
pub mod definition;
pub mod function;
pub mod group_data;
pub mod hcl_document;
pub mod host;
pub mod inventory;
pub mod resolve;
pub mod source;
pub mod ssh_config;
pub mod value;

pub use inventory::Inventory;
pub use resolve::{InventoryError, ResolveOptions, Resolver};
