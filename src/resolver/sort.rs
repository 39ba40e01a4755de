//! Topological sort using an iterative depth-first search
//!
//! ## Algorithm
//!
//! Every node carries one of three marks:
//!
//! 1. **unvisited**: not in the mark table yet
//! 2. **in progress**: on the explicit DFS stack
//! 3. **done**: emitted to the output
//!
//! Dependencies are visited in declaration order and a node is emitted once
//! all of them are done (post-order). Reaching an in-progress node means a
//! cycle, which is reported with the offending chain. Done nodes are skipped,
//! so a name appears at most once and earlier roots' dependencies are not
//! emitted again.
//!
//! ```text
//! A depends on B, C        B and C depend on D
//!
//! resolve([A]) = [D, B, C, A]
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::error::deps::circular;
use crate::minibuild::{Minibuild, MinibuildRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// One level of the explicit DFS stack
struct Frame<'r> {
    minibuild: &'r Minibuild,
    /// Index of the next dependency to visit
    next: usize,
}

/// Order `roots` and everything they depend on, dependencies first
pub fn topological_order<'r>(
    registry: &'r MinibuildRegistry,
    roots: &[String],
) -> Result<Vec<&'r Minibuild>> {
    let mut marks: HashMap<&'r str, Mark> = HashMap::new();
    let mut order: Vec<&'r Minibuild> = Vec::new();
    let mut stack: Vec<Frame<'r>> = Vec::new();

    for root in roots {
        if marks.get(root.as_str()) == Some(&Mark::Done) {
            continue;
        }
        let minibuild = registry.get(root)?;
        marks.insert(minibuild.name.as_str(), Mark::InProgress);
        stack.push(Frame { minibuild, next: 0 });

        while let Some(frame) = stack.last_mut() {
            let parent: &'r Minibuild = frame.minibuild;
            let Some(dep) = parent.dependencies.get(frame.next) else {
                marks.insert(parent.name.as_str(), Mark::Done);
                order.push(parent);
                stack.pop();
                continue;
            };
            frame.next += 1;

            match marks.get(dep.as_str()) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let start = stack
                        .iter()
                        .position(|f| f.minibuild.name == *dep)
                        .unwrap_or(0);
                    let mut chain: Vec<&str> = stack[start..]
                        .iter()
                        .map(|f| f.minibuild.name.as_str())
                        .collect();
                    chain.push(dep.as_str());
                    debug!(chain = ?chain, "cycle detected");
                    return Err(circular(&chain));
                }
                None => {
                    let child = registry.lookup(dep, Some(&parent.name))?;
                    marks.insert(child.name.as_str(), Mark::InProgress);
                    stack.push(Frame {
                        minibuild: child,
                        next: 0,
                    });
                }
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::MinimergeError;
    use crate::minibuild::Category;
    use std::path::PathBuf;

    fn mb(name: &str, deps: &[&str]) -> Minibuild {
        Minibuild {
            name: name.to_string(),
            path: PathBuf::from(name),
            category: Category::Eggs,
            dependencies: deps.iter().map(|d| (*d).to_string()).collect(),
            src_uri: None,
            src_type: None,
            install_method: None,
            options: std::collections::BTreeMap::new(),
        }
    }

    fn names(order: &[&Minibuild]) -> Vec<String> {
        order.iter().map(|m| m.name.clone()).collect()
    }

    #[test]
    fn test_diamond_keeps_declaration_order() {
        let registry = MinibuildRegistry::from_minibuilds([
            mb("a", &["b", "c"]),
            mb("b", &["d"]),
            mb("c", &["d"]),
            mb("d", &[]),
        ]);
        let order = topological_order(&registry, &["a".to_string()]).expect("acyclic");
        assert_eq!(names(&order), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_duplicate_dependencies_collapse() {
        let registry =
            MinibuildRegistry::from_minibuilds([mb("a", &["b", "b"]), mb("b", &[])]);
        let order = topological_order(&registry, &["a".to_string()]).expect("acyclic");
        assert_eq!(names(&order), vec!["b", "a"]);
    }

    #[test]
    fn test_cycle_chain_names_participants() {
        let registry = MinibuildRegistry::from_minibuilds([
            mb("x", &["a"]),
            mb("a", &["b"]),
            mb("b", &["a"]),
        ]);
        let err = topological_order(&registry, &["x".to_string()]).expect_err("cycle");
        match err {
            MinimergeError::CircularDependency { chain } => assert_eq!(chain, "a -> b -> a"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let count = 20_000;
        let minibuilds = (0..count).map(|i| {
            let name = format!("p{i}");
            if i == 0 {
                mb(&name, &[])
            } else {
                let dep = format!("p{}", i - 1);
                mb(&name, &[dep.as_str()])
            }
        });
        let registry = MinibuildRegistry::from_minibuilds(minibuilds);
        let order = topological_order(&registry, &[format!("p{}", count - 1)]).expect("acyclic");
        assert_eq!(order.len(), count);
        assert_eq!(order[0].name, "p0");
    }
}
