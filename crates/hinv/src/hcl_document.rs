//! a single hcl definition file ([HclDocument]) and its evaluation into [Bindings]
//!
//! [HclDocument] tracks
//! - the source path
//! - the root attributes, in file order
//!
//! Root blocks carry no meaning for inventories and are skipped when the document is created.
use crate::value::{UnsupportedValue, Value};
use hcl::eval::{Context, ErrorKind, Evaluate};
use std::path::{Path, PathBuf};

/// Evaluated root attributes of a document, in file order
pub type Bindings = indexmap::IndexMap<String, Value>;

pub type Source = Option<PathBuf>;

/// Name of the binding listing the exported names of a document
pub const EXPORT_LIST: &str = "__export__";

#[derive(Default, Debug)]
pub struct HclDocument {
    source: Source,
    attributes: indexmap::IndexMap<hcl::Identifier, hcl::Expression>,
}

impl HclDocument {
    /// Creates a document from an already parsed body
    pub fn new(body: hcl::Body, source: impl Into<Source>) -> Self {
        let mut document = Self {
            source: source.into(),
            attributes: Default::default(),
        };

        for structure in body.into_inner() {
            match structure {
                hcl::Structure::Attribute(attribute) => {
                    document.attributes.insert(attribute.key, attribute.expr);
                }
                hcl::Structure::Block(block) => {
                    tracing::warn!(
                        source = %document.origin(),
                        block = %block.identifier,
                        "Ignoring block, only top-level attributes are read"
                    );
                }
            }
        }

        document
    }

    pub fn parse(contents: &str, source: impl Into<Source>) -> Result<Self, LoadError> {
        let source = source.into();
        let body = hcl_edit::parser::parse_body(contents).map_err(|err| {
            LoadError::HclParseFailed {
                origin: origin(&source),
                source: err,
            }
        })?;

        Ok(Self::new(body.into(), source))
    }

    pub fn load_file(file_path: &Path) -> Result<Self, LoadError> {
        let io_error = |err| LoadError::Io {
            path: file_path.to_path_buf(),
            source: err,
        };

        let file_path = file_path.canonicalize().map_err(io_error)?;
        tracing::info!(path=%file_path.display(), "loading file");

        let file_contents = std::fs::read_to_string(&file_path).map_err(io_error)?;
        Self::parse(&file_contents, file_path)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Names of all root attributes, in file order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|ident| ident.as_str())
    }

    /// Fails when the document binds `name` itself, e.g. a variable provided by the context
    pub fn ensure_unbound(&self, name: &str) -> Result<(), LoadError> {
        if self.attributes.contains_key(name) {
            return Err(LoadError::ReservedName {
                origin: self.origin(),
                name: name.to_string(),
            });
        }

        Ok(())
    }

    /// Evaluate every root attribute
    ///
    /// `context` provides variables and functions from outside the document. Attributes may refer to
    /// each other in any order; when an expression hits an undefined variable that names another
    /// attribute of this document, that attribute is evaluated first.
    pub fn evaluate(&self, context: &Context<'_>) -> Result<Bindings, LoadError> {
        let mut context = context.clone();
        let mut evaluated: indexmap::IndexMap<hcl::Identifier, hcl::Value> = Default::default();

        for name in self.attributes.keys() {
            self.evaluate_attribute(name, &mut context, &mut evaluated)?;
        }

        // report in file order, not evaluation order
        self.attributes
            .keys()
            .map(|name| {
                let value = evaluated.swap_remove(name).unwrap_or_default();
                let value = Value::try_from(value).map_err(|err| LoadError::UnsupportedValue {
                    origin: self.origin(),
                    name: name.to_string(),
                    source: err,
                })?;
                Ok((name.to_string(), value))
            })
            .collect()
    }

    /// Evaluate and keep only the bindings the document exports
    ///
    /// When the document defines `__export__`, only the names listed there are kept. Names starting
    /// with `__` are never exported.
    pub fn evaluate_exported(&self, context: &Context<'_>) -> Result<Bindings, LoadError> {
        let mut bindings = self.evaluate(context)?;

        if let Some(export) = bindings.get(EXPORT_LIST) {
            let names = export
                .as_array()
                .and_then(|names| names.iter().map(Value::as_str).collect::<Option<Vec<_>>>())
                .ok_or_else(|| LoadError::InvalidExportList {
                    origin: self.origin(),
                })?;

            let names: std::collections::HashSet<String> =
                names.into_iter().map(str::to_string).collect();
            bindings.retain(|name, _| names.contains(name));
        }

        bindings.retain(|name, _| !name.starts_with("__"));
        Ok(bindings)
    }

    fn evaluate_attribute(
        &self,
        name: &hcl::Identifier,
        context: &mut Context<'_>,
        evaluated: &mut indexmap::IndexMap<hcl::Identifier, hcl::Value>,
    ) -> Result<(), LoadError> {
        let mut stack = vec![name.clone()];

        while let Some(current) = stack.last().cloned() {
            if evaluated.contains_key(&current) {
                stack.pop();
                continue;
            }

            let error = match self.attributes[&current].evaluate(context) {
                Ok(value) => {
                    tracing::trace!(name = %current, "attribute evaluated");
                    context.declare_var(current.clone(), value.clone());
                    evaluated.insert(current, value);
                    stack.pop();
                    continue;
                }
                Err(error) => error,
            };

            let ErrorKind::UndefinedVar(var) = error.kind() else {
                return Err(self.evaluation_error(&current, error));
            };

            if !self.attributes.contains_key(var) {
                // unknown identifier
                return Err(self.evaluation_error(&current, error));
            }

            if stack.contains(var) {
                let chain = stack
                    .iter()
                    .skip_while(|ident| *ident != var)
                    .chain(std::iter::once(var))
                    .map(|ident| ident.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ");

                return Err(LoadError::ReferenceCycle {
                    origin: self.origin(),
                    name: var.to_string(),
                    chain,
                });
            }

            stack.push(var.clone());
        }

        Ok(())
    }

    fn evaluation_error(&self, name: &hcl::Identifier, error: hcl::eval::Error) -> LoadError {
        LoadError::Evaluation {
            origin: self.origin(),
            name: name.to_string(),
            source: error,
        }
    }

    fn origin(&self) -> String {
        origin(&self.source)
    }
}

fn origin(source: &Source) -> String {
    match source {
        Some(path) => path.display().to_string(),
        None => "<inline>".to_string(),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("IO error for {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unable to parse hcl file {origin}")]
    HclParseFailed {
        origin: String,
        source: hcl_edit::parser::Error,
    },
    #[error("Failed to evaluate `{name}` in {origin}")]
    Evaluation {
        origin: String,
        name: String,
        source: hcl::eval::Error,
    },
    #[error("Reference loop at `{name}` in {origin}: {chain}")]
    ReferenceCycle {
        origin: String,
        name: String,
        chain: String,
    },
    #[error("`{name}` in {origin} has an unsupported value")]
    UnsupportedValue {
        origin: String,
        name: String,
        source: UnsupportedValue,
    },
    #[error("`{name}` in {origin} is reserved and cannot be bound")]
    ReservedName { origin: String, name: String },
    #[error("`__export__` in {origin} must be an array of strings")]
    InvalidExportList { origin: String },
}

/// Utility macro to create [HclDocument]s
///
/// Create from a single document
/// ```
/// # use hinv::hcl_document;
/// hcl_document!("attribute = 42");
/// ```
///
/// Create with a source path
/// ```
/// # use hinv::hcl_document;
/// hcl_document!("inventories/production.hcl" => "web = [\"web-1\"]");
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use hinv::hcl_document;
/// hcl_document!("not = valid = hcl");
/// ```
#[macro_export]
macro_rules! hcl_document {
    // single document without source
    { $expr:expr } => {
        $crate::hcl_document::HclDocument::parse($expr, None::<::std::path::PathBuf>).expect("body must parse")
    };
    // single document with source
    { $source:expr => $expr:expr } => {
        $crate::hcl_document::HclDocument::parse(
            $expr,
            Some(::std::path::PathBuf::from($source)),
        )
        .expect("body must parse")
    };
}
