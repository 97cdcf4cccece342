//! Merging of declared and discovered dependency sets
//!
//! Pure functions only; the orchestrating side lives in the parent module.

use apkforge_types::{Dependencies, DiscoveredDependencies};
use std::collections::HashSet;

/// Characters that start the version constraint of a dependency entry
const VERSION_OPERATORS: [char; 4] = ['=', '<', '>', '~'];

/// Name part of a dependency entry, without any version constraint
///
/// `so:libc.so.6=6` yields `so:libc.so.6`, `foo>=1.2` yields `foo`.
#[must_use]
pub fn unversioned_name(dep: &str) -> &str {
    dep.find(VERSION_OPERATORS).map_or(dep, |pos| &dep[..pos])
}

/// Drop runtime entries satisfied by one of the `provided` entries
///
/// Both sides are compared by unversioned name. Order of the surviving
/// entries is preserved.
#[must_use]
pub fn remove_self_provided(runtime: &[String], provided: &[String]) -> Vec<String> {
    let provided: HashSet<&str> = provided.iter().map(|p| unversioned_name(p)).collect();
    runtime
        .iter()
        .filter(|dep| !provided.contains(unversioned_name(dep)))
        .cloned()
        .collect()
}

/// Sort and remove duplicate entries
#[must_use]
pub fn dedup(mut entries: Vec<String>) -> Vec<String> {
    entries.sort();
    entries.dedup();
    entries
}

/// Compute the final dependency sets embedded in `.PKGINFO`
///
/// Every input list is normalized first so padded entries compare equal
/// to their trimmed form. Discovered runtime entries are then filtered
/// against the discovered vendored set. Declared runtime entries skip that
/// filter so a package can insist on a dependency it also bundles. The
/// merged runtime set is finally filtered against the merged provides set,
/// which applies to declared entries as well.
#[must_use]
pub fn resolve(declared: &Dependencies, discovered: &DiscoveredDependencies) -> Dependencies {
    let vendored = normalize(&discovered.vendored);
    let unvendored = remove_self_provided(&normalize(&discovered.runtime), &vendored);

    let runtime = dedup(
        normalize(&declared.runtime)
            .into_iter()
            .chain(unvendored)
            .collect(),
    );

    let provides = normalize(
        &[declared.provides.as_slice(), discovered.provides.as_slice()].concat(),
    );

    let runtime = remove_self_provided(&runtime, &provides);

    Dependencies {
        runtime,
        provides,
        replaces: normalize(&declared.replaces),
        vendored,
        provider_priority: declared.provider_priority,
    }
}

/// Canonical form of a dependency list: trimmed, no blanks, sorted, unique
#[must_use]
pub fn normalize(entries: &[String]) -> Vec<String> {
    dedup(
        entries
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect(),
    )
}
