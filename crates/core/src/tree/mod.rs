//! Package tree: every package node owns the types declared directly in it
//! and its child packages, keyed by segment name.
//!
//! The tree is append-only. The scan owns it exclusively while building it;
//! afterwards it is published behind an `Arc` and only read.

mod handle;

pub use handle::{ResolutionState, TypeHandle};

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PackageNode {
    name: String,
    types: BTreeMap<String, Arc<TypeHandle>>,
    children: BTreeMap<String, PackageNode>,
}

impl PackageNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Segment name; empty for the root
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_handle(&self, name: &str) -> Option<&Arc<TypeHandle>> {
        self.types.get(name)
    }

    /// Types declared directly in this package, ordered by simple name
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeHandle>> {
        self.types.values()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn child(&self, name: &str) -> Option<&PackageNode> {
        self.children.get(name)
    }

    pub fn children(&self) -> impl Iterator<Item = &PackageNode> {
        self.children.values()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.children.is_empty()
    }

    fn absorb(&mut self, older: PackageNode) {
        for (name, handle) in older.types {
            self.types.entry(name).or_insert(handle);
        }
        for (name, child) in older.children {
            match self.children.get_mut(&name) {
                Some(existing) => existing.absorb(child),
                None => {
                    self.children.insert(name, child);
                }
            }
        }
    }

    fn count_types(&self) -> usize {
        self.types.len() + self.children.values().map(PackageNode::count_types).sum::<usize>()
    }

    fn count_packages(&self) -> usize {
        self.children
            .values()
            .map(|c| 1 + c.count_packages())
            .sum::<usize>()
    }

    fn collect_packages(&self, path: &mut Vec<String>, out: &mut Vec<String>) {
        if !self.types.is_empty() && !path.is_empty() {
            out.push(path.join("."));
        }
        for child in self.children.values() {
            path.push(child.name.clone());
            child.collect_packages(path, out);
            path.pop();
        }
    }
}

/// Hierarchical index of packages and their types. The root is the unnamed
/// package.
#[derive(Debug, Clone, Default)]
pub struct PackageTree {
    root: PackageNode,
}

impl PackageTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &PackageNode {
        &self.root
    }

    /// Register `type_name` in the package named by `package`, creating
    /// intermediate packages as needed. Adding the same type twice keeps the
    /// first handle.
    pub fn add_type<S: AsRef<str>>(&mut self, package: &[S], type_name: &str) -> Arc<TypeHandle> {
        self.insert_type(package, type_name).0
    }

    /// Like [`add_type`](Self::add_type), also reporting whether the type was
    /// new to the tree
    fn insert_type<S: AsRef<str>>(
        &mut self,
        package: &[S],
        type_name: &str,
    ) -> (Arc<TypeHandle>, bool) {
        let mut node = &mut self.root;
        for segment in package {
            let segment = segment.as_ref();
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| PackageNode::named(segment));
        }

        match node.types.entry(type_name.to_string()) {
            Entry::Occupied(existing) => (existing.get().clone(), false),
            Entry::Vacant(slot) => {
                let fqn = if package.is_empty() {
                    type_name.to_string()
                } else {
                    let mut fqn = package
                        .iter()
                        .map(AsRef::as_ref)
                        .collect::<Vec<&str>>()
                        .join(".");
                    fqn.push('.');
                    fqn.push_str(type_name);
                    fqn
                };
                (slot.insert(Arc::new(TypeHandle::new(fqn))).clone(), true)
            }
        }
    }

    /// Register a type by binary name, e.g. `java.lang.String` or
    /// `java/lang/String`.
    pub fn add_binary_name(&mut self, binary_name: &str) -> Option<Arc<TypeHandle>> {
        let (package, type_name) = split_binary_name(binary_name)?;
        Some(self.add_type(&package, type_name))
    }

    /// Register a type by binary name; `true` if it was not in the tree yet.
    /// Empty names are ignored.
    pub fn insert_binary_name(&mut self, binary_name: &str) -> bool {
        split_binary_name(binary_name)
            .is_some_and(|(package, type_name)| self.insert_type(&package, type_name).1)
    }

    /// Find the package node for `package`. Never creates nodes.
    pub fn lookup<S: AsRef<str>>(&self, package: &[S]) -> Option<&PackageNode> {
        let mut node = &self.root;
        for segment in package {
            node = node.children.get(segment.as_ref())?;
        }
        Some(node)
    }

    /// Find a package node by dotted name; the empty string is the root.
    pub fn lookup_dotted(&self, package: &str) -> Option<&PackageNode> {
        let segments: Vec<&str> = package.split('.').filter(|s| !s.is_empty()).collect();
        self.lookup(&segments)
    }

    /// Find a type by fully-qualified name
    pub fn find_type(&self, fqn: &str) -> Option<&Arc<TypeHandle>> {
        let (package, name) = match fqn.rfind('.') {
            Some(idx) => (&fqn[..idx], &fqn[idx + 1..]),
            None => ("", fqn),
        };
        self.lookup_dotted(package)?.type_handle(name)
    }

    /// Union `older` into this tree. Entries already present here win.
    pub fn absorb(&mut self, older: PackageTree) {
        self.root.absorb(older.root);
    }

    pub fn type_count(&self) -> usize {
        self.root.count_types()
    }

    /// Number of named packages, including ones that only contain packages
    pub fn package_count(&self) -> usize {
        self.root.count_packages()
    }

    /// Dotted names of all packages that declare at least one type, sorted
    pub fn packages(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.collect_packages(&mut Vec::new(), &mut out);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// All fully-qualified type names, sorted by package then name
    pub fn type_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            names.extend(node.types.values().map(|h| h.fqn().to_string()));
            stack.extend(node.children.values());
        }
        names.sort();
        names
    }
}

fn split_binary_name(binary_name: &str) -> Option<(Vec<&str>, &str)> {
    let mut segments: Vec<&str> = binary_name
        .split(['.', '/'])
        .filter(|s| !s.is_empty())
        .collect();
    let type_name = segments.pop()?;
    Some((segments, type_name))
}
