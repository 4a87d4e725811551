//! Dependency layering of aspects.

use std::collections::HashMap;

use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    Visiting,
    Done(usize),
}

/// Level of each node: 1 with no dependencies, otherwise one more than the
/// deepest dependency (longest-path layering).
///
/// `nodes` pairs each name with the names it depends on.
pub fn levels(nodes: &[(&str, &[&str])]) -> Result<Vec<usize>, CompileError> {
    let mut index = HashMap::with_capacity(nodes.len());
    for (i, (name, _)) in nodes.iter().enumerate() {
        if index.insert(*name, i).is_some() {
            return Err(CompileError::DuplicateAspect(name.to_string()));
        }
    }

    let mut state = vec![Visit::Unvisited; nodes.len()];
    let mut path = Vec::new();
    for i in 0..nodes.len() {
        visit(i, nodes, &index, &mut state, &mut path)?;
    }

    Ok(state
        .into_iter()
        .map(|s| match s {
            Visit::Done(level) => level,
            // Every node was visited above.
            _ => 1,
        })
        .collect())
}

fn visit(
    node: usize,
    nodes: &[(&str, &[&str])],
    index: &HashMap<&str, usize>,
    state: &mut [Visit],
    path: &mut Vec<usize>,
) -> Result<usize, CompileError> {
    match state[node] {
        Visit::Done(level) => return Ok(level),
        Visit::Visiting => {
            let start = path.iter().position(|n| *n == node).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..]
                .iter()
                .map(|n| nodes[*n].0.to_string())
                .collect();
            cycle.push(nodes[node].0.to_string());
            return Err(CompileError::AspectCycle(cycle));
        }
        Visit::Unvisited => {}
    }

    state[node] = Visit::Visiting;
    path.push(node);
    let (name, deps) = nodes[node];
    let mut level = 1;
    for dep in deps.iter() {
        let Some(&target) = index.get(dep) else {
            return Err(CompileError::UnknownAspectDependency {
                aspect: name.to_string(),
                dependency: dep.to_string(),
            });
        };
        level = level.max(visit(target, nodes, index, state, path)? + 1);
    }
    path.pop();
    state[node] = Visit::Done(level);
    Ok(level)
}

/// Group node indices into layers by ascending level. Within a layer nodes
/// keep their registration order.
pub fn layers(nodes: &[(&str, &[&str])]) -> Result<Vec<Vec<usize>>, CompileError> {
    let levels = levels(nodes)?;
    let depth = levels.iter().copied().max().unwrap_or(0);
    let mut layers = vec![Vec::new(); depth];
    for (node, level) in levels.into_iter().enumerate() {
        layers[level - 1].push(node);
    }
    Ok(layers)
}
