//! The durable, accumulating program image.
//!
//! A namespace tree rooted at the global namespace. Containers are
//! namespaces and types; nested types hang off their declaring type. The
//! image also carries the session's using-directives and the ordered list
//! of committed type declarations.

use std::fmt;
use std::sync::Arc;

use cinder_eval::TypeInfo;
use indexmap::IndexMap;
use tracing::info;

use crate::stdlib;
use crate::undo::{UndoEntry, UndoLog};

/// Path of a container from the global namespace, one segment per level.
pub type ContainerPath = Vec<String>;

/// Something a (qualified) name can denote in the image.
#[derive(Debug, Clone)]
pub enum Entity {
    Namespace(ContainerPath),
    Type(Arc<TypeInfo>),
}

#[derive(Debug, Default)]
pub struct Namespace {
    namespaces: IndexMap<String, Namespace>,
    types: IndexMap<String, Arc<TypeInfo>>,
}

impl Namespace {
    pub(crate) fn insert_type(&mut self, info: Arc<TypeInfo>) {
        self.types.insert(info.name.clone(), info);
    }

    pub(crate) fn namespace_entry(&mut self, name: &str) -> &mut Namespace {
        self.namespaces.entry(name.to_string()).or_default()
    }

    fn has_child(&self, name: &str) -> bool {
        self.namespaces.contains_key(name) || self.types.contains_key(name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Usings
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum UsingTarget {
    Namespace(ContainerPath),
    Type(Arc<TypeInfo>),
}

/// A resolved using-directive.
#[derive(Debug, Clone)]
pub struct UsingEntry {
    pub alias: Option<String>,
    pub target: UsingTarget,
    /// Target as written, dotted.
    pub target_name: String,
}

impl UsingEntry {
    fn same_directive(&self, other: &UsingEntry) -> bool {
        self.alias == other.alias && self.target_name == other.target_name
    }
}

impl fmt::Display for UsingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "using {alias} = {};", self.target_name),
            None => write!(f, "using {};", self.target_name),
        }
    }
}

/// Why a container could not be declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclareError {
    /// The parent already has a child with this name.
    Duplicate(String),
    /// A path segment names a type where a namespace was required.
    NotANamespace(String),
    /// The parent container does not exist.
    MissingParent,
}

/// What a successful unit adds to the image on commit.
#[derive(Debug, Default)]
pub struct CommitSet {
    pub usings: Vec<UsingEntry>,
    pub types: Vec<Arc<TypeInfo>>,
}

// ══════════════════════════════════════════════════════════════════════════════
// ProgramImage
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ProgramImage {
    root: Namespace,
    usings: Vec<UsingEntry>,
    declared: Vec<Arc<TypeInfo>>,
}

impl ProgramImage {
    /// An image holding only the built-in `System` namespace.
    pub fn new() -> Self {
        let mut root = Namespace::default();
        stdlib::install(&mut root);
        Self {
            root,
            usings: Vec::new(),
            declared: Vec::new(),
        }
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    /// Resolve an absolute path. The empty path is the global namespace.
    pub fn lookup(&self, path: &[String]) -> Option<Entity> {
        let mut current = Entity::Namespace(Vec::new());
        for segment in path {
            current = self.child(&current, segment)?;
        }
        Some(current)
    }

    /// Resolve `name` directly inside `parent`.
    pub fn child(&self, parent: &Entity, name: &str) -> Option<Entity> {
        match parent {
            Entity::Namespace(path) => {
                let ns = self.namespace(path)?;
                if let Some(info) = ns.types.get(name) {
                    return Some(Entity::Type(Arc::clone(info)));
                }
                if ns.namespaces.contains_key(name) {
                    let mut child = path.clone();
                    child.push(name.to_string());
                    return Some(Entity::Namespace(child));
                }
                None
            }
            Entity::Type(info) => info.nested_type(name).map(Entity::Type),
        }
    }

    pub fn namespace(&self, path: &[String]) -> Option<&Namespace> {
        let mut ns = &self.root;
        for segment in path {
            ns = ns.namespaces.get(segment)?;
        }
        Some(ns)
    }

    fn namespace_mut(&mut self, path: &[String]) -> Option<&mut Namespace> {
        let mut ns = &mut self.root;
        for segment in path {
            ns = ns.namespaces.get_mut(segment)?;
        }
        Some(ns)
    }

    /// `true` if the dotted name denotes a namespace or type.
    pub fn contains(&self, dotted: &str) -> bool {
        let path: Vec<String> = dotted.split('.').map(str::to_string).collect();
        self.lookup(&path).is_some()
    }

    // ── Speculative edits ─────────────────────────────────────────────────────

    /// Make sure every namespace along `path` exists, logging each one
    /// created.
    pub fn declare_namespace(
        &mut self,
        path: &[String],
        undo: &mut UndoLog,
    ) -> Result<(), DeclareError> {
        for depth in 0..path.len() {
            let parent = &path[..depth];
            let name = &path[depth];
            let ns = self
                .namespace_mut(parent)
                .ok_or(DeclareError::MissingParent)?;
            if ns.types.contains_key(name) {
                return Err(DeclareError::NotANamespace(name.clone()));
            }
            if !ns.namespaces.contains_key(name) {
                ns.namespaces.insert(name.clone(), Namespace::default());
                undo.record(UndoEntry::ContainerAdded {
                    parent: parent.to_vec(),
                    child: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Add `info` under the container at `parent`, logging the addition.
    pub fn declare_type(
        &mut self,
        parent: &[String],
        info: Arc<TypeInfo>,
        undo: &mut UndoLog,
    ) -> Result<(), DeclareError> {
        let name = info.name.clone();
        match self.lookup(parent) {
            Some(Entity::Namespace(_)) => {
                let ns = self
                    .namespace_mut(parent)
                    .ok_or(DeclareError::MissingParent)?;
                if ns.has_child(&name) {
                    return Err(DeclareError::Duplicate(name));
                }
                ns.types.insert(name.clone(), info);
            }
            Some(Entity::Type(outer)) => {
                if outer.nested_type(&name).is_some() {
                    return Err(DeclareError::Duplicate(name));
                }
                outer.members_mut().nested.push(info);
            }
            None => return Err(DeclareError::MissingParent),
        }
        undo.record(UndoEntry::ContainerAdded {
            parent: parent.to_vec(),
            child: name,
        });
        Ok(())
    }

    /// Remove `child` from the container at `parent`. Removed types have
    /// their members cleared.
    pub fn remove_child(&mut self, parent: &[String], child: &str) {
        match self.lookup(parent) {
            Some(Entity::Namespace(_)) => {
                if let Some(ns) = self.namespace_mut(parent) {
                    if let Some(info) = ns.types.shift_remove(child) {
                        info.clear_members();
                    } else {
                        ns.namespaces.shift_remove(child);
                    }
                }
            }
            Some(Entity::Type(outer)) => {
                let removed = {
                    let mut members = outer.members_mut();
                    let index = members.nested.iter().position(|t| t.name == child);
                    index.map(|i| members.nested.remove(i))
                };
                if let Some(info) = removed {
                    info.clear_members();
                }
            }
            None => {}
        }
    }

    // ── Commit ────────────────────────────────────────────────────────────────

    /// Merge a fully successful unit into the image.
    pub fn commit(&mut self, set: CommitSet) {
        let mut added_usings = 0;
        for using in set.usings {
            if !self.usings.iter().any(|u| u.same_directive(&using)) {
                self.usings.push(using);
                added_usings += 1;
            }
        }
        let added_types = set.types.len();
        self.declared.extend(set.types);
        if added_usings + added_types > 0 {
            info!(usings = added_usings, types = added_types, "committed to program image");
        }
    }

    pub fn usings(&self) -> &[UsingEntry] {
        &self.usings
    }

    /// Using-directive text in the order the directives were committed.
    pub fn active_usings(&self) -> Vec<String> {
        self.usings.iter().map(ToString::to_string).collect()
    }

    /// Full names of committed types in declaration order.
    pub fn declared_types(&self) -> Vec<String> {
        self.declared.iter().map(|t| t.full_name.clone()).collect()
    }
}

impl Default for ProgramImage {
    fn default() -> Self {
        Self::new()
    }
}
