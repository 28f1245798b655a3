//! Dependency passes over the extensions' require lists.
//!
//! Both passes rebuild one extension's list at a time: the old list is taken
//! out of the extension, entries are appended to a `settled` list in their
//! final order, and the result is put back. Entries in `settled` never move
//! again.

use std::collections::HashSet;

use anyhow::Result;
use tracing::debug;

use crate::diag::spec_error;
use crate::model::{ExtensionId, Registry, TypeCategory, TypeId};

/// Closure pass: pull every struct that a required struct uses as a member
/// type into the same extension, unless another extension already owns it.
///
/// A pulled-in struct is claimed by the extension and placed in front of the
/// entry that needed it, after its own dependencies. A member struct owned by
/// an extension other than this one or the one it depends on is an error.
pub fn add_implicitly_required_types(registry: &mut Registry) -> Result<()> {
    for index in 0..registry.extensions.len() {
        let ext = ExtensionId(index);
        let old = std::mem::take(&mut registry.extensions[index].require.types);
        let mut settled = Vec::with_capacity(old.len());
        for &id in &old {
            if registry.get(id).category() == TypeCategory::Struct {
                let mut visiting = HashSet::from([id]);
                claim_member_structs(registry, ext, id, &mut settled, &mut visiting)?;
            }
            settled.push(id);
        }
        if settled.len() != old.len() {
            debug!(
                extension = %registry.extension(ext).name,
                added = settled.len() - old.len(),
                "added implicitly required structs"
            );
        }
        registry.extensions[index].require.types = settled;
    }
    Ok(())
}

/// Depth-first over the member structs of `id`. `visiting` holds the structs
/// on the current path and stops pointer cycles.
fn claim_member_structs(
    registry: &mut Registry,
    ext: ExtensionId,
    id: TypeId,
    settled: &mut Vec<TypeId>,
    visiting: &mut HashSet<TypeId>,
) -> Result<()> {
    for dep in registry.member_structs(id) {
        if !visiting.insert(dep) {
            continue;
        }
        claim_member_structs(registry, ext, dep, settled, visiting)?;
        visiting.remove(&dep);

        let depends = registry.extension(ext).depends;
        let entry = registry.get(dep);
        if let Some(owner) = entry
            .required_by
            .iter()
            .find(|owner| **owner != ext && Some(**owner) != depends)
        {
            let user = registry.get(id);
            return Err(spec_error(
                user.line,
                format!(
                    "struct <{}> uses struct <{}>, which is required by extension <{}>, \
                     but extension <{}> does not depend on it",
                    user.name,
                    entry.name,
                    registry.extension(*owner).name,
                    registry.extension(ext).name
                ),
            ));
        }

        if entry.required_by.is_empty() {
            registry.get_mut(dep).required_by.insert(ext);
            settled.push(dep);
        }
    }
    Ok(())
}

/// Ordering pass: within each extension, move every struct behind the
/// structs it uses as member types.
///
/// Entries keep their relative order unless a dependency has to be pulled
/// forward. A member struct missing from the extension's list must be
/// emitted by the extension it depends on.
pub fn sort_structs(registry: &mut Registry) -> Result<()> {
    for index in 0..registry.extensions.len() {
        let ext = ExtensionId(index);
        let old = std::mem::take(&mut registry.extensions[index].require.types);
        let mut order = Ordering {
            registry,
            ext,
            pending: &old,
            settled: Vec::with_capacity(old.len()),
            placed: HashSet::new(),
            in_progress: HashSet::new(),
        };
        for &id in &old {
            order.place(id)?;
        }
        let settled = order.settled;
        registry.extensions[index].require.types = settled;
    }
    Ok(())
}

struct Ordering<'r> {
    registry: &'r Registry,
    ext: ExtensionId,
    /// The list before this pass.
    pending: &'r [TypeId],
    settled: Vec<TypeId>,
    placed: HashSet<TypeId>,
    in_progress: HashSet<TypeId>,
}

impl Ordering<'_> {
    fn place(&mut self, id: TypeId) -> Result<()> {
        if self.placed.contains(&id) {
            return Ok(());
        }
        if self.registry.get(id).category() == TypeCategory::Struct {
            self.in_progress.insert(id);
            for dep in self.registry.member_structs(id) {
                if self.placed.contains(&dep) || self.in_progress.contains(&dep) {
                    continue;
                }
                if self.pending.contains(&dep) {
                    self.place(dep)?;
                } else {
                    self.check_owned_by_dependency(id, dep)?;
                }
            }
            self.in_progress.remove(&id);
        }
        self.settled.push(id);
        self.placed.insert(id);
        Ok(())
    }

    fn check_owned_by_dependency(&self, user: TypeId, dep: TypeId) -> Result<()> {
        let registry = self.registry;
        let ext = registry.extension(self.ext);
        let provided = ext
            .depends
            .is_some_and(|d| registry.extension(d).require.types.contains(&dep));
        if provided {
            return Ok(());
        }
        let user = registry.get(user);
        Err(spec_error(
            user.line,
            format!(
                "struct <{}> uses struct <{}>, which is required neither by extension <{}> \
                 nor by the extension it depends on",
                user.name,
                registry.get(dep).name,
                ext.name
            ),
        ))
    }
}
