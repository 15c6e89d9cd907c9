//! host and group entries as they appear in definition files
//!
//! A host is written either as a bare name or as a `[name, { data }]` pair:
//! ```hcl
//! web = ["web-1", ["web-2", { ssh_port = 2222 }]]
//! ```
//! A group is either a list of hosts or a `[[hosts...], { data }]` pair:
//! ```hcl
//! db = [["db-1", "db-2"], { postgres_version = 16 }]
//! ```
use crate::value::{Data, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum HostEntry {
    Bare(String),
    WithData(String, Data),
}

impl HostEntry {
    pub fn name(&self) -> &str {
        match self {
            HostEntry::Bare(name) | HostEntry::WithData(name, _) => name,
        }
    }

    pub fn data(&self) -> Option<&Data> {
        match self {
            HostEntry::Bare(_) => None,
            HostEntry::WithData(_, data) => Some(data),
        }
    }

    pub fn into_parts(self) -> (String, Data) {
        match self {
            HostEntry::Bare(name) => (name, Data::new()),
            HostEntry::WithData(name, data) => (name, data),
        }
    }
}

impl From<&str> for HostEntry {
    fn from(value: &str) -> Self {
        HostEntry::Bare(value.to_string())
    }
}

impl From<String> for HostEntry {
    fn from(value: String) -> Self {
        HostEntry::Bare(value)
    }
}

impl From<(String, Data)> for HostEntry {
    fn from((name, data): (String, Data)) -> Self {
        HostEntry::WithData(name, data)
    }
}

impl TryFrom<&Value> for HostEntry {
    type Error = ShapeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(HostEntry::Bare(name.clone())),
            Value::Array(pair) => match pair.as_slice() {
                [Value::String(name), Value::Object(data)] => {
                    Ok(HostEntry::WithData(name.clone(), data.clone()))
                }
                _ => Err(ShapeError::Host(value.clone())),
            },
            _ => Err(ShapeError::Host(value.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupEntry {
    Hosts(Vec<HostEntry>),
    WithData(Vec<HostEntry>, Data),
}

impl GroupEntry {
    pub fn hosts(&self) -> &[HostEntry] {
        match self {
            GroupEntry::Hosts(hosts) | GroupEntry::WithData(hosts, _) => hosts,
        }
    }

    pub fn into_parts(self) -> (Vec<HostEntry>, Data) {
        match self {
            GroupEntry::Hosts(hosts) => (hosts, Data::new()),
            GroupEntry::WithData(hosts, data) => (hosts, data),
        }
    }

    /// Interpret a value as a group
    ///
    /// Returns `Ok(None)` when the value is not a list at all, which means it was never meant to be
    /// a group. A list that contains something other than hosts is an error.
    pub fn from_value(value: &Value) -> Result<Option<Self>, ShapeError> {
        let Value::Array(items) = value else {
            return Ok(None);
        };

        if let [Value::Array(hosts), Value::Object(data)] = items.as_slice() {
            return Ok(Some(GroupEntry::WithData(
                parse_hosts(hosts)?,
                data.clone(),
            )));
        }

        parse_hosts(items).map(|hosts| Some(GroupEntry::Hosts(hosts)))
    }
}

impl From<Vec<HostEntry>> for GroupEntry {
    fn from(value: Vec<HostEntry>) -> Self {
        GroupEntry::Hosts(value)
    }
}

fn parse_hosts(items: &[Value]) -> Result<Vec<HostEntry>, ShapeError> {
    items.iter().map(HostEntry::try_from).collect()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("invalid host {0}, expected a string or a [string, object] pair")]
    Host(Value),
}
