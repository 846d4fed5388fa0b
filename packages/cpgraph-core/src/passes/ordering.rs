//! Dependency ordering for registered passes
//!
//! Works purely on [`PassDescriptor`] tables. Hard dependencies must be
//! in the registered set (the executor auto-registers them beforehand),
//! soft dependencies only count when present, and `execute_before` is
//! folded in as a reverse dependency. Late passes are held back until no
//! normal pass is ready; ties break by registration order so the schedule
//! is deterministic.

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use rustc_hash::FxHashSet;
use tracing::debug;

use super::PassDescriptor;
use crate::shared::models::{CpgError, Result};

/// Compute a total execution order over `passes` (indices into the input
/// slice, in registration order).
pub fn order_passes(passes: &[&PassDescriptor]) -> Result<Vec<usize>> {
    sanity_check(passes)?;

    let ids: Vec<&str> = passes.iter().map(|d| d.id).collect();
    let index_of = |id: &str| ids.iter().position(|i| *i == id);

    // deps[i] holds the indices that must complete before pass i
    let mut deps: Vec<FxHashSet<usize>> = vec![FxHashSet::default(); passes.len()];
    for (i, desc) in passes.iter().enumerate() {
        for dep in desc.hard_depends_on {
            match index_of(dep) {
                Some(j) => {
                    deps[i].insert(j);
                }
                None => {
                    return Err(CpgError::configuration(format!(
                        "pass '{}' requires '{dep}', which is not registered",
                        desc.id
                    )))
                }
            }
        }
        for dep in desc.soft_depends_on {
            if let Some(j) = index_of(dep) {
                deps[i].insert(j);
            }
        }
        for target in desc.execute_before {
            if let Some(j) = index_of(target) {
                deps[j].insert(i);
            }
        }
    }
    if let Some(first) = passes.iter().position(|d| d.execute_first) {
        for (i, d) in deps.iter_mut().enumerate() {
            if i != first {
                d.insert(first);
            }
        }
    }
    if let Some(last) = passes.iter().position(|d| d.execute_last) {
        let all: Vec<usize> = (0..passes.len()).filter(|&i| i != last).collect();
        deps[last].extend(all);
    }

    let mut order = Vec::with_capacity(passes.len());
    let mut done: FxHashSet<usize> = FxHashSet::default();
    let mut remaining: Vec<usize> = (0..passes.len()).collect();

    while !remaining.is_empty() {
        let ready: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| deps[i].iter().all(|d| done.contains(d)))
            .collect();
        // late passes wait until nothing normal can run
        let next = ready
            .iter()
            .copied()
            .find(|&i| !passes[i].execute_late)
            .or_else(|| ready.first().copied());
        match next {
            Some(i) => {
                order.push(i);
                done.insert(i);
                remaining.retain(|&r| r != i);
            }
            None => {
                return Err(CpgError::DependencyCycle {
                    cycle: describe_cycle(passes, &deps, &remaining),
                })
            }
        }
    }

    debug!(order = ?order.iter().map(|&i| passes[i].id).collect::<Vec<_>>(), "pass schedule");
    Ok(order)
}

/// Sanity checks mirroring what the ordering relies on.
fn sanity_check(passes: &[&PassDescriptor]) -> Result<()> {
    let firsts: Vec<&str> = passes.iter().filter(|d| d.execute_first).map(|d| d.id).collect();
    if firsts.len() > 1 {
        return Err(CpgError::configuration(format!(
            "more than one pass wants to run first: {firsts:?}"
        )));
    }
    let lasts: Vec<&str> = passes.iter().filter(|d| d.execute_last).map(|d| d.id).collect();
    if lasts.len() > 1 {
        return Err(CpgError::configuration(format!(
            "more than one pass wants to run last: {lasts:?}"
        )));
    }
    for d in passes {
        if d.execute_first && !d.hard_depends_on.is_empty() {
            return Err(CpgError::configuration(format!(
                "pass '{}' wants to run first but has hard dependencies",
                d.id
            )));
        }
        if d.execute_last && !d.execute_before.is_empty() {
            return Err(CpgError::configuration(format!(
                "pass '{}' wants to run last but also before {:?}",
                d.id, d.execute_before
            )));
        }
    }
    Ok(())
}

/// Name the members of (one of) the dependency cycles blocking progress.
fn describe_cycle(
    passes: &[&PassDescriptor],
    deps: &[FxHashSet<usize>],
    remaining: &[usize],
) -> Vec<String> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<_> = remaining.iter().map(|&i| graph.add_node(i)).collect();
    for (slot, &i) in remaining.iter().enumerate() {
        for &d in &deps[i] {
            if let Some(dslot) = remaining.iter().position(|&r| r == d) {
                graph.add_edge(nodes[dslot], nodes[slot], ());
            }
        }
    }
    for scc in tarjan_scc(&graph) {
        if scc.len() > 1 {
            return scc
                .into_iter()
                .map(|n| passes[graph[n]].id.to_string())
                .collect();
        }
    }
    // degenerate: a pass depending on itself
    remaining
        .iter()
        .filter(|&&i| deps[i].contains(&i))
        .map(|&i| passes[i].id.to_string())
        .collect()
}
