//! Change-Tracking Wrapper
//!
//! [`Wrapper`] owns a JSON object returned by (or destined for) the Galaxy
//! API and exposes a fixed set of its keys as attributes. Every write goes
//! through [`Wrapper::set`] or [`Wrapper::get_mut`], which mark the wrapper
//! as modified ("tainted").
//!
//! # Example
//!
//! ```
//! use galaxy_objects::wrappers::Wrapper;
//! use serde_json::json;
//!
//! const ATTRS: &[&str] = &["a", "b"];
//!
//! let mut w = Wrapper::new("Mock", ATTRS, json!({"a": 1, "b": [2, 3]})).unwrap();
//! assert_eq!(w.get("a").unwrap(), &json!(1));
//! assert!(!w.is_modified());
//!
//! w.set("a", 222).unwrap();
//! assert!(w.is_modified());
//! assert!(w.get("foo").is_err());
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Name of the read-only back-reference to the owning wrapper.
pub const PARENT_ATTR: &str = "parent";

static NULL: Value = Value::Null;

/// A JSON object with an attribute allow-list and a dirty flag.
pub struct Wrapper {
    /// Type name used in error messages
    kind: &'static str,
    /// Keys exposed as attributes
    attrs: &'static [&'static str],
    /// The backing record
    wrapped: Map<String, Value>,
    /// Non-owning link to the object this one belongs to
    parent: Option<Weak<Wrapper>>,
    /// Set once any attribute has been written
    modified: bool,
}

impl Wrapper {
    /// Wraps `record`, which must be a JSON object.
    pub fn new(kind: &'static str, attrs: &'static [&'static str], record: Value) -> Result<Self> {
        match record {
            Value::Object(map) => Ok(Self::from_map(kind, attrs, map)),
            other => Err(Error::NotAMapping(json_type_name(&other))),
        }
    }

    /// Wraps an already-unpacked JSON object.
    pub fn from_map(
        kind: &'static str,
        attrs: &'static [&'static str],
        wrapped: Map<String, Value>,
    ) -> Self {
        Self {
            kind,
            attrs,
            wrapped,
            parent: None,
            modified: false,
        }
    }

    /// Attaches a back-reference to the wrapper this one belongs to.
    ///
    /// The parent is held weakly: dropping the last `Arc` of the parent
    /// makes [`Wrapper::parent`] return `None`.
    pub fn with_parent(mut self, parent: &Arc<Wrapper>) -> Self {
        self.parent = Some(Arc::downgrade(parent));
        self
    }

    /// Rebuilds a wrapper from the text produced by [`Wrapper::to_json`].
    pub fn from_json(kind: &'static str, attrs: &'static [&'static str], text: &str) -> Result<Self> {
        let record: Value = serde_json::from_str(text)?;
        Self::new(kind, attrs, record)
    }

    /// Serializes the backing record.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.wrapped)?)
    }

    /// Reads a declared attribute. Declared keys missing from the record
    /// read as `null`.
    pub fn get(&self, attr: &str) -> Result<&Value> {
        if attr == PARENT_ATTR {
            // the parent is a wrapper, not JSON: use `parent()`
            return Err(self.no_attribute(attr));
        }
        self.check_declared(attr)?;
        Ok(self.wrapped.get(attr).unwrap_or(&NULL))
    }

    /// Mutable access to a declared attribute, typically a list or object.
    ///
    /// Marks the wrapper as modified.
    pub fn get_mut(&mut self, attr: &str) -> Result<&mut Value> {
        if attr == PARENT_ATTR {
            return Err(Error::ReadOnlyAttribute(attr.to_string()));
        }
        self.check_declared(attr)?;
        self.modified = true;
        Ok(self.wrapped.entry(attr.to_string()).or_insert(Value::Null))
    }

    /// Writes a declared attribute and marks the wrapper as modified, even
    /// if the new value equals the old one.
    pub fn set(&mut self, attr: &str, value: impl Into<Value>) -> Result<()> {
        if attr == PARENT_ATTR {
            return Err(Error::ReadOnlyAttribute(attr.to_string()));
        }
        self.check_declared(attr)?;
        self.wrapped.insert(attr.to_string(), value.into());
        self.modified = true;
        Ok(())
    }

    /// Returns true once any attribute has been written.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Marks the wrapper as modified without changing any value.
    pub fn touch(&mut self) {
        self.modified = true;
    }

    /// Returns the owning wrapper, if one was attached and is still alive.
    pub fn parent(&self) -> Option<Arc<Wrapper>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// The backing record.
    pub fn wrapped(&self) -> &Map<String, Value> {
        &self.wrapped
    }

    /// Consumes the wrapper, returning the backing record.
    pub fn into_wrapped(self) -> Map<String, Value> {
        self.wrapped
    }

    /// The declared attribute names.
    pub fn attrs(&self) -> &'static [&'static str] {
        self.attrs
    }

    /// The type name reported in errors.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Server-side identifier, if this wrapper is mapped to one.
    pub fn id(&self) -> Option<&str> {
        self.wrapped.get("id").and_then(Value::as_str)
    }

    /// True while the wrapper carries a server-side id.
    pub fn is_mapped(&self) -> bool {
        self.id().is_some()
    }

    /// Returns the id or a [`Error::NotMapped`] naming this object.
    pub fn require_id(&self) -> Result<&str> {
        self.id().ok_or_else(|| Error::NotMapped(self.kind.to_string()))
    }

    /// Detaches the wrapper from its server-side object.
    pub fn unmap(&mut self) {
        self.wrapped.insert("id".to_string(), Value::Null);
    }

    /// Records the server-side id. Not a user edit, so no taint.
    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        self.set_untracked("id", Value::String(id.into()));
    }

    /// Writes any key without touching the dirty flag; used when
    /// refreshing from the server.
    pub(crate) fn set_untracked(&mut self, key: &str, value: Value) {
        self.wrapped.insert(key.to_string(), value);
    }

    /// Unchecked read used by typed accessors.
    pub(crate) fn field(&self, key: &str) -> Option<&Value> {
        self.wrapped.get(key).filter(|v| !v.is_null())
    }

    pub(crate) fn field_str(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    pub(crate) fn field_bool(&self, key: &str) -> bool {
        self.field(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn check_declared(&self, attr: &str) -> Result<()> {
        if self.attrs.contains(&attr) {
            Ok(())
        } else {
            Err(self.no_attribute(attr))
        }
    }

    fn no_attribute(&self, attr: &str) -> Error {
        Error::AttributeAccess {
            kind: self.kind.to_string(),
            attr: attr.to_string(),
        }
    }
}

/// Deep copy of the backing record with a clean dirty flag.
impl Clone for Wrapper {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            attrs: self.attrs,
            wrapped: self.wrapped.clone(),
            parent: self.parent.clone(),
            modified: false,
        }
    }
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.kind)
            .field("wrapped", &self.wrapped)
            .field("modified", &self.modified)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// Common surface of the typed Galaxy objects.
pub trait Wrapped {
    /// The underlying change-tracking wrapper.
    fn wrapper(&self) -> &Wrapper;

    fn id(&self) -> Option<&str> {
        self.wrapper().id()
    }

    fn name(&self) -> Option<&str> {
        self.wrapper().field_str("name")
    }

    fn is_mapped(&self) -> bool {
        self.wrapper().is_mapped()
    }

    fn require_id(&self) -> Result<&str> {
        self.wrapper().require_id()
    }

    fn is_modified(&self) -> bool {
        self.wrapper().is_modified()
    }

    fn wrapped(&self) -> &Map<String, Value> {
        self.wrapper().wrapped()
    }

    fn to_json(&self) -> Result<String> {
        self.wrapper().to_json()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
