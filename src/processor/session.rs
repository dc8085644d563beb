//! Directive resolution over a merged tree.
//!
//! A session walks the tree once from the root. Every node is processed at
//! most once (`seen`); a node whose processing is still on the call stack
//! (`in_progress`) and is reached again means the configuration refers to
//! itself, which is reported instead of recursing. Reference lookups process
//! the node they land on and write the result back in place, so a reference
//! may point at a part of the tree the walk has not reached yet.
//!
//! A `$ref` to a map or sequence may name a container that is still mid-walk.
//! That is only a cycle when the container holds the `$ref` itself; otherwise
//! the `$ref` stands for the container while it finishes (`pending`).

use super::interpolate;
use super::{OVERLAY_KEY, REF_KEY, UNDERLAY_KEY, descend};
use crate::error::{ConfError, ErrorCode, Result};
use crate::tree::{Node, NodeId, Tree};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Names tried by a `$ref` and the fallback used when none resolves.
struct RefSpec {
    names: Vec<String>,
    default: Option<NodeId>,
}

pub(super) struct Session {
    tree: Tree,
    root: NodeId,
    seen: HashSet<NodeId>,
    in_progress: HashSet<NodeId>,
    /// What a processed directive node turned into, for nodes reached twice.
    aliases: HashMap<NodeId, Option<NodeId>>,
    /// Container targets of `$ref` nodes that are still being processed.
    pending: HashMap<NodeId, NodeId>,
    ref_cache: HashMap<String, Option<NodeId>>,
}

impl Session {
    pub fn new(value: Value) -> Self {
        let mut tree = Tree::new();
        let root = tree.insert(value);
        Self {
            tree,
            root,
            seen: HashSet::new(),
            in_progress: HashSet::new(),
            aliases: HashMap::new(),
            pending: HashMap::new(),
            ref_cache: HashMap::new(),
        }
    }

    /// Resolve every directive and return the resulting tree.
    pub fn run(mut self) -> Result<Value> {
        let resolved = self.process(self.root, &[])?;
        Ok(resolved
            .map(|id| self.tree.to_value(id))
            .unwrap_or(Value::Null))
    }

    /// Process a node, returning what should stand in its place
    /// (`None` when it resolves to nothing).
    fn process(&mut self, id: NodeId, path: &[String]) -> Result<Option<NodeId>> {
        if self.in_progress.contains(&id) {
            return match self.pending.get(&id) {
                Some(&target) => Ok(Some(target)),
                None => Err(ConfError::reference_cycle(path)),
            };
        }
        if self.seen.contains(&id) {
            return Ok(self.aliases.get(&id).copied().unwrap_or(Some(id)));
        }

        self.seen.insert(id);
        self.in_progress.insert(id);
        let result = self.process_node(id, path);
        self.in_progress.remove(&id);
        self.pending.remove(&id);

        let resolved = result?;
        if resolved != Some(id) {
            self.aliases.insert(id, resolved);
        }
        Ok(resolved)
    }

    fn process_node(&mut self, id: NodeId, path: &[String]) -> Result<Option<NodeId>> {
        match self.tree.node(id) {
            Node::Scalar(Value::String(raw)) => {
                let raw = raw.clone();
                let expanded = interpolate::expand(&raw, |name| self.interpolate(name, id, path))?;
                self.tree.set(id, Node::Scalar(Value::String(expanded)));
                Ok(Some(id))
            }
            Node::Scalar(_) => Ok(Some(id)),
            Node::Seq(items) => {
                for index in 0..items.len() {
                    self.process_child(id, &index.to_string(), path)?;
                }
                Ok(Some(id))
            }
            Node::Map(entries) => {
                if let Some(&spec) = entries.get(REF_KEY) {
                    return self.resolve_ref(id, spec, path);
                }
                let underlay = entries.contains_key(UNDERLAY_KEY);
                let overlay = entries.contains_key(OVERLAY_KEY);

                if underlay {
                    self.apply_layering(id, UNDERLAY_KEY, path)?;
                }
                if overlay {
                    self.apply_layering(id, OVERLAY_KEY, path)?;
                }

                let keys: Vec<String> = self
                    .tree
                    .entries(id)
                    .map(|entries| entries.keys().cloned().collect())
                    .unwrap_or_default();
                for key in keys {
                    self.process_child(id, &key, path)?;
                }
                Ok(Some(id))
            }
        }
    }

    /// Process the child of `parent` at `segment` and store the result back.
    fn process_child(&mut self, parent: NodeId, segment: &str, path: &[String]) -> Result<()> {
        let Some(child) = self.slot(parent, segment) else {
            return Ok(());
        };
        let resolved = self.process(child, &descend(path, segment))?;
        self.write_back(parent, segment, resolved);
        Ok(())
    }

    /// `$ref: name`, `$ref: {name, default}` or `$ref: {firstDefined, default}`.
    fn resolve_ref(&mut self, id: NodeId, spec: NodeId, path: &[String]) -> Result<Option<NodeId>> {
        let spec = self.ref_spec(spec, path)?;

        for name in &spec.names {
            if let Some(found) = self.resolve_name(name, id, path)?
                && !self.tree.is_null(found)
            {
                return Ok(Some(found));
            }
        }

        match spec.default {
            Some(default) => {
                let default_path = descend(&descend(path, REF_KEY), "default");
                let resolved = self.process(default, &default_path)?;
                Ok(resolved.filter(|&id| !self.tree.is_null(id)))
            }
            None => Ok(None),
        }
    }

    fn ref_spec(&self, spec: NodeId, path: &[String]) -> Result<RefSpec> {
        match self.tree.node(spec) {
            Node::Scalar(Value::String(name)) => Ok(RefSpec {
                names: vec![name.clone()],
                default: None,
            }),
            Node::Map(fields) => {
                let names = if let Some(&name) = fields.get("name") {
                    match self.tree.node(name) {
                        Node::Scalar(Value::String(name)) => vec![name.clone()],
                        _ => return Err(ConfError::malformed_ref(path, "name", "must be a string")),
                    }
                } else if let Some(&list) = fields.get("firstDefined") {
                    let Node::Seq(items) = self.tree.node(list) else {
                        return Err(ConfError::malformed_ref(
                            path,
                            "firstDefined",
                            "must be a list of names",
                        ));
                    };
                    items
                        .iter()
                        .map(|&item| match self.tree.node(item) {
                            Node::Scalar(Value::String(name)) => Ok(name.clone()),
                            _ => Err(ConfError::malformed_ref(
                                path,
                                "firstDefined",
                                "must contain only strings",
                            )),
                        })
                        .collect::<Result<Vec<_>>>()?
                } else {
                    return Err(ConfError::malformed_ref(
                        path,
                        REF_KEY,
                        "must have name or firstDefined",
                    ));
                };

                Ok(RefSpec {
                    names,
                    default: fields.get("default").copied(),
                })
            }
            _ => Err(ConfError::malformed_ref(
                path,
                REF_KEY,
                "must be a name or a map with name or firstDefined",
            )),
        }
    }

    /// Merge the sections named by `$underlay` (beneath) or `$overlay` (above)
    /// into the node `id`, in place.
    fn apply_layering(&mut self, id: NodeId, key: &str, path: &[String]) -> Result<()> {
        let Some(spec) = self.slot(id, key) else {
            return Ok(());
        };
        let names = self.section_names(spec, key, path)?;

        // The key stays until the sections are resolved, so a lookup
        // passing through this node is reported as a cycle.
        let mut sections = None;
        for name in &names {
            let section = self.resolve_name(name, id, path)?;
            sections = self.tree.merge(sections, section);
        }
        if let Node::Map(entries) = self.tree.node_mut(id) {
            entries.shift_remove(key);
        }

        let merged = if key == UNDERLAY_KEY {
            self.merge_resolved(sections, Some(id), path)?
        } else {
            self.merge_resolved(Some(id), sections, path)?
        };
        if let Some(merged) = merged
            && merged != id
        {
            let node = self.tree.node(merged).clone();
            self.tree.set(id, node);
        }
        Ok(())
    }

    /// [`Tree::merge`] for layering. Directive children met on either side
    /// are processed first, so a `$ref` child merges as the value it stands
    /// for rather than as a `$ref` map.
    fn merge_resolved(
        &mut self,
        base: Option<NodeId>,
        top: Option<NodeId>,
        path: &[String],
    ) -> Result<Option<NodeId>> {
        let base = self.settle(base, path)?;
        let top = self.settle(top, path)?;

        let maps = match (base, top) {
            (Some(b), Some(t)) => match (self.tree.node(b), self.tree.node(t)) {
                (Node::Map(b), Node::Map(t)) => Some((b.clone(), t.clone())),
                _ => None,
            },
            _ => None,
        };
        let Some((mut entries, overlay)) = maps else {
            return Ok(self.tree.merge(base, top));
        };

        for (key, child) in overlay {
            let child_path = descend(path, key.as_str());
            match self.merge_resolved(entries.get(&key).copied(), Some(child), &child_path)? {
                Some(merged) => {
                    entries.insert(key, merged);
                }
                None => {
                    entries.shift_remove(&key);
                }
            }
        }
        Ok(Some(self.tree.alloc(Node::Map(entries))))
    }

    /// Process a directive node that is not already on the stack.
    fn settle(&mut self, id: Option<NodeId>, path: &[String]) -> Result<Option<NodeId>> {
        match id {
            Some(id) if self.is_directive(id) && !self.in_progress.contains(&id) => {
                self.process(id, path)
            }
            other => Ok(other),
        }
    }

    fn section_names(&self, spec: NodeId, key: &str, path: &[String]) -> Result<Vec<String>> {
        let code = if key == UNDERLAY_KEY {
            ErrorCode::MalformedUnderlay
        } else {
            ErrorCode::MalformedOverlay
        };
        let malformed = |found: &str| ConfError::malformed_layering(code, key, path, found);

        match self.tree.node(spec) {
            Node::Scalar(Value::String(name)) => Ok(vec![name.clone()]),
            Node::Seq(items) => items
                .iter()
                .map(|&item| match self.tree.node(item) {
                    Node::Scalar(Value::String(name)) => Ok(name.clone()),
                    _ => Err(malformed("a list with non-string entries")),
                })
                .collect(),
            Node::Map(_) => Err(malformed("a map")),
            Node::Scalar(_) => Err(malformed("a non-string scalar")),
        }
    }

    /// Value of `${name}` inside a string.
    fn interpolate(&mut self, name: &str, id: NodeId, path: &[String]) -> Result<String> {
        // The root is always mid-walk here, so render it as it stands.
        let found = if name.is_empty() {
            Some(self.root)
        } else {
            self.resolve_name(name, id, path)?
        };

        Ok(match found.map(|id| (id, self.tree.node(id))) {
            None | Some((_, Node::Scalar(Value::Null))) => String::new(),
            Some((_, Node::Scalar(Value::String(s)))) => s.clone(),
            Some((_, Node::Scalar(other))) => other.to_string(),
            Some((id, _)) => self.tree.to_value(id).to_string(),
        })
    }

    /// Look up an absolute dotted name on behalf of the node `origin`,
    /// processing the node it lands on.
    fn resolve_name(
        &mut self,
        name: &str,
        origin: NodeId,
        path: &[String],
    ) -> Result<Option<NodeId>> {
        let found = match self.ref_cache.get(name).copied() {
            Some(cached) => {
                trace!(name, "Reference cache hit");
                cached
            }
            None => self.lookup(name, path)?,
        };

        if let Some(found) = found
            && self.is_container(found)
        {
            self.claim(found, origin, name, path)?;
        }
        Ok(found)
    }

    /// Take a container as the value of `origin`, processing it if the walk
    /// has not reached it yet.
    fn claim(
        &mut self,
        target: NodeId,
        origin: NodeId,
        name: &str,
        path: &[String],
    ) -> Result<()> {
        let done = self.seen.contains(&target) && !self.in_progress.contains(&target);
        if !done && self.reaches(target, origin) {
            return Err(ConfError::reference_cycle(path));
        }
        if self.tree.entries(origin).is_some_and(|e| e.contains_key(REF_KEY)) {
            self.pending.insert(origin, target);
        }
        if !self.seen.contains(&target) {
            let crumbs: Vec<String> = name.split('.').map(String::from).collect();
            self.process(target, &crumbs)?;
        }
        Ok(())
    }

    /// Whether `to` is `from` or one of its descendants.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut visited = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            match self.tree.node(id) {
                Node::Map(entries) => stack.extend(entries.values().copied()),
                Node::Seq(items) => stack.extend(items.iter().copied()),
                Node::Scalar(_) => {}
            }
        }
        false
    }

    /// Walk a dotted name from the root. Directives met on the way and a
    /// scalar at the end are processed; a container at the end is returned
    /// as found.
    fn lookup(&mut self, name: &str, path: &[String]) -> Result<Option<NodeId>> {
        trace!(name, at = %path.join("."), "Resolving reference");

        let segments: Vec<&str> = name.split('.').collect();
        let mut crumbs: Vec<String> = Vec::with_capacity(segments.len());
        let mut parent = self.root;
        // Lookups through a node whose directives are still being applied
        // may see it incomplete and must not be cached.
        let mut settled = true;

        for (i, segment) in segments.iter().enumerate() {
            if self.in_progress.contains(&parent) && self.is_directive(parent) {
                settled = false;
            }
            let Some(child) = self.child(parent, segment, name, path)? else {
                return Ok(self.remember(name, None, settled));
            };
            crumbs.push(segment.to_string());

            let last = i + 1 == segments.len();
            parent = if last && self.is_container(child) {
                child
            } else if last || self.is_directive(child) {
                let resolved = self.process(child, &crumbs)?;
                self.write_back(parent, segment, resolved);
                match resolved {
                    Some(resolved) => resolved,
                    None => return Ok(self.remember(name, None, settled)),
                }
            } else {
                child
            };
        }

        Ok(self.remember(name, Some(parent), settled))
    }

    fn remember(&mut self, name: &str, found: Option<NodeId>, settled: bool) -> Option<NodeId> {
        if settled {
            self.ref_cache.insert(name.to_string(), found);
        }
        found
    }

    /// Index into `parent` for a reference lookup.
    fn child(
        &self,
        parent: NodeId,
        segment: &str,
        name: &str,
        path: &[String],
    ) -> Result<Option<NodeId>> {
        match self.tree.node(parent) {
            Node::Map(entries) => Ok(entries.get(segment).copied()),
            Node::Seq(items) => {
                let index = parse_index(segment)
                    .ok_or_else(|| ConfError::invalid_index(path, name, segment))?;
                items
                    .get(index)
                    .copied()
                    .map(Some)
                    .ok_or_else(|| ConfError::index_out_of_range(path, name, index, items.len()))
            }
            Node::Scalar(_) => Ok(None),
        }
    }

    /// Child of `parent` at `segment`, without validation.
    fn slot(&self, parent: NodeId, segment: &str) -> Option<NodeId> {
        match self.tree.node(parent) {
            Node::Map(entries) => entries.get(segment).copied(),
            Node::Seq(items) => parse_index(segment).and_then(|i| items.get(i).copied()),
            Node::Scalar(_) => None,
        }
    }

    /// Store a processed child. An absent result removes a map key; in a
    /// sequence it leaves `null` so later indexes do not shift.
    fn write_back(&mut self, parent: NodeId, segment: &str, resolved: Option<NodeId>) {
        let in_seq = matches!(self.tree.node(parent), Node::Seq(_));
        let resolved = match resolved {
            None if in_seq => Some(self.tree.alloc(Node::Scalar(Value::Null))),
            other => other,
        };

        match self.tree.node_mut(parent) {
            Node::Map(entries) => match resolved {
                Some(id) => {
                    entries.insert(segment.to_string(), id);
                }
                None => {
                    entries.shift_remove(segment);
                }
            },
            Node::Seq(items) => {
                if let Some(index) = parse_index(segment)
                    && let Some(item) = items.get_mut(index)
                    && let Some(id) = resolved
                {
                    *item = id;
                }
            }
            Node::Scalar(_) => {}
        }
    }

    /// A map without directive keys, or a sequence.
    fn is_container(&self, id: NodeId) -> bool {
        match self.tree.node(id) {
            Node::Map(_) => !self.is_directive(id),
            Node::Seq(_) => true,
            Node::Scalar(_) => false,
        }
    }

    fn is_directive(&self, id: NodeId) -> bool {
        self.tree.entries(id).is_some_and(|entries| {
            entries.contains_key(REF_KEY)
                || entries.contains_key(UNDERLAY_KEY)
                || entries.contains_key(OVERLAY_KEY)
        })
    }
}

/// Base-10 sequence index; signs and other characters are rejected.
fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}
