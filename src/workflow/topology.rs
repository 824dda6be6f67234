//! Cycle detection and topological ordering over a workflow's `after` sets.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::error::{Result, WorkflowError};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    OnPath,
    Done,
}

/// Depth-first traversal with three coloring states. A back-edge to an
/// on-path node fails with `CircularDependency` naming the cycle-closing
/// step.
pub fn detect_cycle(after: &HashMap<String, Vec<String>>) -> Result<()> {
    let mut colors: HashMap<&str, Color> = after.keys().map(|k| (k.as_str(), Color::Unvisited)).collect();

    // Sorted for deterministic traversal order (affects only which node is
    // reported as the cycle-closer when multiple cycles exist).
    let mut names: Vec<&str> = after.keys().map(|s| s.as_str()).collect();
    names.sort();

    for name in names {
        if colors[name] == Color::Unvisited {
            visit(name, after, &mut colors)?;
        }
    }
    Ok(())
}

fn visit<'a>(
    node: &'a str,
    after: &'a HashMap<String, Vec<String>>,
    colors: &mut HashMap<&'a str, Color>,
) -> Result<()> {
    colors.insert(node, Color::OnPath);

    if let Some(deps) = after.get(node) {
        for dep in deps {
            match colors.get(dep.as_str()) {
                Some(Color::OnPath) => {
                    return Err(WorkflowError::CircularDependency {
                        step: node.to_string(),
                    });
                }
                Some(Color::Done) => continue,
                _ => visit(dep, after, colors)?,
            }
        }
    }

    colors.insert(node, Color::Done);
    Ok(())
}

/// Kahn's algorithm over in-degrees, producing one valid topological order.
/// Tie-breaking among simultaneously-ready nodes is by name, for
/// deterministic output; this ordering is not itself an exposed execution
/// contract (execution uses ready-set computation instead).
pub fn topological_order(after: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut in_degree: BTreeMap<&str, usize> =
        after.keys().map(|k| (k.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> =
        after.keys().map(|k| (k.as_str(), Vec::new())).collect();

    for (name, deps) in after {
        *in_degree.get_mut(name.as_str()).unwrap() += deps.len();
        for dep in deps {
            dependents.get_mut(dep.as_str()).unwrap().push(name.as_str());
        }
    }

    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&name, _)| name)
        .collect();
    ready.sort();
    let mut queue: VecDeque<&str> = ready.into();

    let mut order = Vec::with_capacity(after.len());
    while let Some(node) = queue.pop_front() {
        order.push(node.to_string());
        let mut newly_ready = Vec::new();
        if let Some(deps) = dependents.get(node) {
            for &dependent in deps {
                let deg = in_degree.get_mut(dependent).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    newly_ready.push(dependent);
                }
            }
        }
        newly_ready.sort();
        let mut rest: Vec<&str> = queue.into_iter().collect();
        rest.extend(newly_ready);
        rest.sort();
        queue = rest.into();
    }

    order
}
