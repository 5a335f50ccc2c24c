//! Task graph: named tasks composed into parallel groups and series.
//!
//! Built-in composites:
//!
//! | Name      | Node                                                  |
//! |-----------|-------------------------------------------------------|
//! | `base`    | parallel(html, style, js, img, avif, webp, copy)      |
//! | `build`   | series(clear, base, critical)                         |
//! | `default` | series(base, server)                                  |
//!
//! `[tasks]` in `runnel.toml` adds more. The graph is validated before
//! anything runs: unknown names, reference cycles and composites that
//! shadow a built-in name are rejected.

mod scheduler;

pub use scheduler::{RunReport, TaskFailure, execute, run_names};

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::config::{CompositeConfig, TasksConfig};
use crate::task::TaskId;

pub const BASE: &str = "base";
pub const BUILD: &str = "build";
pub const DEFAULT: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Task(TaskId),
    /// Members start together; the group ends when all have ended.
    Parallel(Vec<Node>),
    /// Members run in order; the first failure stops the chain.
    Series(Vec<Node>),
    /// Named composite, resolved at run time.
    Ref(String),
}

impl Node {
    /// Task name or composite reference.
    pub fn named(name: &str) -> Self {
        match TaskId::from_name(name) {
            Some(id) => Self::Task(id),
            None => Self::Ref(name.to_string()),
        }
    }

    fn refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Task(_) => {}
            Self::Ref(name) => out.push(name),
            Self::Parallel(nodes) | Self::Series(nodes) => {
                for node in nodes {
                    node.refs(out);
                }
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, nodes) = match self {
            Self::Task(id) => return write!(f, "{id}"),
            Self::Ref(name) => return f.write_str(name),
            Self::Parallel(nodes) => ("parallel", nodes),
            Self::Series(nodes) => ("series", nodes),
        };
        write!(f, "{kind}(")?;
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{node}")?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("unknown task `{name}` (referenced by `{parent}`)")]
    UnknownTask { name: String, parent: String },

    #[error("unknown task `{0}`")]
    UnknownName(String),

    #[error("task cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("`[tasks] {0}` shadows a built-in task")]
    Shadowed(String),
}

/// Named composites, built-in and configured.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    composites: BTreeMap<String, Node>,
    shadowed: Vec<String>,
}

impl TaskGraph {
    pub fn new(tasks: &TasksConfig) -> Self {
        let mut composites = builtin_composites();
        let mut shadowed = Vec::new();

        for (name, composite) in tasks {
            if composites.contains_key(name) || TaskId::from_name(name).is_some() {
                shadowed.push(name.clone());
                continue;
            }
            let members = composite.members().iter().map(|m| Node::named(m)).collect();
            let node = match composite {
                CompositeConfig::Parallel { .. } => Node::Parallel(members),
                CompositeConfig::Series { .. } => Node::Series(members),
            };
            composites.insert(name.clone(), node);
        }

        Self {
            composites,
            shadowed,
        }
    }

    pub fn composite(&self, name: &str) -> Option<&Node> {
        self.composites.get(name)
    }

    pub fn composites(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.composites.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve a user-supplied name to a node.
    pub fn resolve(&self, name: &str) -> Result<Node, GraphError> {
        match Node::named(name) {
            Node::Ref(name) if !self.composites.contains_key(&name) => {
                Err(GraphError::UnknownName(name))
            }
            node => Ok(node),
        }
    }

    /// Check references and cycles.
    pub fn validate(&self) -> Result<(), GraphError> {
        if let Some(name) = self.shadowed.first() {
            return Err(GraphError::Shadowed(name.clone()));
        }

        for (parent, node) in &self.composites {
            let mut refs = Vec::new();
            node.refs(&mut refs);
            if let Some(name) = refs.iter().find(|r| !self.composites.contains_key(**r)) {
                return Err(GraphError::UnknownTask {
                    name: name.to_string(),
                    parent: parent.clone(),
                });
            }
        }

        let mut state = BTreeMap::new();
        for name in self.composites.keys() {
            let mut path = Vec::new();
            self.visit(name, &mut state, &mut path)?;
        }
        Ok(())
    }

    /// Depth-first search; `path` is the chain of composites being expanded.
    fn visit<'a>(
        &'a self,
        name: &'a str,
        state: &mut BTreeMap<&'a str, Visit>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), GraphError> {
        match state.get(name) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::Active) => {
                let start = path.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(name.to_string());
                return Err(GraphError::Cycle(cycle));
            }
            None => {}
        }

        state.insert(name, Visit::Active);
        path.push(name);
        if let Some(node) = self.composites.get(name) {
            let mut refs = Vec::new();
            node.refs(&mut refs);
            for child in refs {
                self.visit(child, state, path)?;
            }
        }
        path.pop();
        state.insert(name, Visit::Done);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

fn builtin_composites() -> BTreeMap<String, Node> {
    let base = Node::Parallel(
        [
            TaskId::Html,
            TaskId::Style,
            TaskId::Js,
            TaskId::Img,
            TaskId::Avif,
            TaskId::Webp,
            TaskId::Copy,
        ]
            .into_iter()
            .map(Node::Task)
            .collect(),
    );
    let build = Node::Series(vec![
        Node::Task(TaskId::Clear),
        Node::Ref(BASE.to_string()),
        Node::Task(TaskId::Critical),
    ]);
    let default = Node::Series(vec![Node::Ref(BASE.to_string()), Node::Task(TaskId::Server)]);

    BTreeMap::from([
        (BASE.to_string(), base),
        (BUILD.to_string(), build),
        (DEFAULT.to_string(), default),
    ])
}
