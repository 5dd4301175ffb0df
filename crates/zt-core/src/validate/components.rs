use super::ValidationResult;
use std::collections::{HashMap, HashSet};
use zt_schema::{Component, ZarfManifest};

/// Naming, duplicate, redundancy and emptiness rules per component.
pub fn check(manifest: &ZarfManifest, result: &mut ValidationResult) {
    if manifest.components.is_empty() {
        result.warn("Package has no components defined");
        return;
    }

    let mut names = HashSet::new();
    for component in &manifest.components {
        let name = &component.name;
        if !names.insert(name.as_str()) {
            result.error(format!("Duplicate component name: {name}"));
        }
        if !name.follows_convention() {
            result.warn(format!(
                "Component name '{name}' doesn't follow naming conventions (lowercase, hyphens, no spaces)"
            ));
        }
        if component.required && component.default {
            result.warn(format!(
                "Component '{name}' is both required and default (redundant)"
            ));
        }
        if component.is_empty() {
            result.warn(format!(
                "Component '{name}' appears to be empty (no files, charts, manifests, images, etc.)"
            ));
        }
    }
}

type Graph<'m> = HashMap<&'m str, &'m Component>;

/// Missing targets, self-dependencies and cycles in `depsWith`.
///
/// Cycle detection runs a fresh search for every edge, so one cycle is
/// reported once per edge that enters it.
pub fn check_dependencies(manifest: &ZarfManifest, result: &mut ValidationResult) {
    let graph: Graph<'_> = manifest
        .components
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();

    for component in &manifest.components {
        let name = component.name.as_str();
        for dep in &component.deps_with {
            if !graph.contains_key(dep.as_str()) {
                result.error(format!(
                    "Component '{name}' depends on non-existent component '{dep}'"
                ));
            }
            let mut visited = HashSet::new();
            if has_cycle(name, dep.as_str(), &graph, &mut visited) {
                result.error(format!(
                    "Circular dependency detected between '{name}' and '{dep}'"
                ));
            }
        }
        for dep in &component.deps_with {
            if dep == name {
                result.error(format!("Component '{name}' cannot depend on itself"));
            }
        }
    }
}

/// Depth-first search from `current` that succeeds on reaching `start`
/// again after at least one step.
fn has_cycle<'m>(
    start: &str,
    current: &'m str,
    graph: &Graph<'m>,
    visited: &mut HashSet<&'m str>,
) -> bool {
    if current == start && !visited.is_empty() {
        return true;
    }
    if !visited.insert(current) {
        return false;
    }
    graph.get(current).copied().is_some_and(|component| {
        component
            .deps_with
            .iter()
            .any(|dep| has_cycle(start, dep.as_str(), graph, visited))
    })
}
