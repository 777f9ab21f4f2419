// ABOUTME: Dependency-aware middleware chain: stages declare dependsOn/optional/condition, order is topological
// ABOUTME: A cycle or missing required dependency is a startup error, not a runtime one
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StreamError;

use super::request::{Request, Response};

/// A predicate deciding whether a conditional stage runs for a specific
/// request. Stateless and cheap to call on every request.
pub type Condition = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// A stage in the dependency graph. Unlike the priority chain's `Stage`,
/// this trait does not take an explicit `next` continuation — the chain
/// driver advances automatically unless a stage short-circuits by returning
/// `Some(response)`.
#[async_trait]
pub trait DependencyStage: Send + Sync {
    /// Mutates `req` in place; returning `Some` stops the chain here.
    async fn handle(&self, req: &mut Request) -> Option<Response>;
}

/// Declares a stage's place in the dependency graph, independent of its
/// behavior.
pub struct Declaration {
    pub name: String,
    pub stage: Arc<dyn DependencyStage>,
    pub depends_on: Vec<String>,
    pub optional: bool,
    pub condition: Option<Condition>,
}

impl Declaration {
    #[must_use]
    pub fn new(name: impl Into<String>, stage: impl DependencyStage + 'static) -> Self {
        Self {
            name: name.into(),
            stage: Arc::new(stage),
            depends_on: Vec::new(),
            optional: false,
            condition: None,
        }
    }

    #[must_use]
    pub fn depends_on(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn when(mut self, condition: impl Fn(&Request) -> bool + Send + Sync + 'static) -> Self {
        self.condition = Some(Arc::new(condition));
        self
    }
}

/// The execution order a topological sort produces: stage names in
/// dependency order. An optional stage's missing dependency is simply
/// dropped from its in-degree rather than failing the sort.
#[must_use]
pub fn topological_order(declarations: &[Declaration]) -> Result<Vec<String>, StreamError> {
    let names: HashSet<&str> = declarations.iter().map(|d| d.name.as_str()).collect();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for decl in declarations {
        in_degree.entry(decl.name.as_str()).or_insert(0);
        for dep in &decl.depends_on {
            if !names.contains(dep.as_str()) {
                if decl.optional {
                    continue;
                }
                return Err(StreamError::Validation(format!(
                    "stage '{}' depends on undeclared stage '{dep}'",
                    decl.name
                )));
            }
            *in_degree.entry(decl.name.as_str()).or_insert(0) += 1;
            dependents.entry(dep.as_str()).or_default().push(decl.name.as_str());
        }
    }

    let mut ready: Vec<&str> = declarations
        .iter()
        .map(|d| d.name.as_str())
        .filter(|n| in_degree[n] == 0)
        .collect();
    ready.sort_unstable();

    let mut order = Vec::with_capacity(declarations.len());
    let mut queue = VecDeque::from(ready);

    while let Some(name) = queue.pop_front() {
        order.push(name.to_string());
        if let Some(deps) = dependents.get(name) {
            let mut newly_ready = Vec::new();
            for &dependent in deps {
                let Some(degree) = in_degree.get_mut(dependent) else {
                    continue;
                };
                *degree -= 1;
                if *degree == 0 {
                    newly_ready.push(dependent);
                }
            }
            newly_ready.sort_unstable();
            for n in newly_ready {
                queue.push_back(n);
            }
        }
    }

    if order.len() != declarations.len() {
        return Err(StreamError::Validation(
            "dependency graph has a cycle".to_string(),
        ));
    }
    Ok(order)
}

/// A chain whose execution order is fixed once at construction time;
/// per-request, each stage's `condition` decides whether it participates.
pub struct DependencyChain {
    ordered: Vec<Declaration>,
}

impl DependencyChain {
    /// Builds a chain from `declarations`, failing with a startup error if
    /// the dependency graph has a cycle or an unmet required dependency.
    pub fn build(declarations: Vec<Declaration>) -> Result<Self, StreamError> {
        let order = topological_order(&declarations)?;
        let mut by_name: HashMap<String, Declaration> =
            declarations.into_iter().map(|d| (d.name.clone(), d)).collect();
        let ordered = order
            .into_iter()
            .filter_map(|name| by_name.remove(&name))
            .collect();
        Ok(Self { ordered })
    }

    /// Runs stages in topological order, skipping any whose `condition`
    /// rejects this request. The first stage to return `Some` wins; if none
    /// do, returns `None` so the caller can run its own terminal handler.
    pub async fn process(&self, req: &mut Request) -> Option<Response> {
        for decl in &self.ordered {
            if let Some(cond) = &decl.condition {
                if !cond(req) {
                    continue;
                }
            }
            if let Some(response) = decl.stage.handle(req).await {
                return Some(response);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Passthrough;

    #[async_trait]
    impl DependencyStage for Passthrough {
        async fn handle(&self, _req: &mut Request) -> Option<Response> {
            None
        }
    }

    struct Recording {
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl DependencyStage for Recording {
        async fn handle(&self, _req: &mut Request) -> Option<Response> {
            self.order.lock().unwrap().push(self.name);
            None
        }
    }

    #[test]
    fn orders_by_dependency_not_declaration_order() {
        let decls = vec![
            Declaration::new("c", Passthrough).depends_on(["b"]),
            Declaration::new("a", Passthrough),
            Declaration::new("b", Passthrough).depends_on(["a"]),
        ];
        let order = topological_order(&decls).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn cycle_is_a_startup_error() {
        let decls = vec![
            Declaration::new("a", Passthrough).depends_on(["b"]),
            Declaration::new("b", Passthrough).depends_on(["a"]),
        ];
        assert!(topological_order(&decls).is_err());
    }

    #[test]
    fn missing_required_dependency_is_an_error() {
        let decls = vec![Declaration::new("a", Passthrough).depends_on(["missing"])];
        assert!(topological_order(&decls).is_err());
    }

    #[test]
    fn missing_optional_dependency_is_tolerated() {
        let decls = vec![Declaration::new("a", Passthrough).depends_on(["missing"]).optional()];
        let order = topological_order(&decls).unwrap();
        assert_eq!(order, vec!["a"]);
    }

    #[tokio::test]
    async fn conditional_stage_is_skipped_when_predicate_is_false() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = DependencyChain::build(vec![
            Declaration::new("a", Recording { name: "a", order: order.clone() })
                .when(|req| req.method == "POST"),
            Declaration::new("b", Recording { name: "b", order: order.clone() }).depends_on(["a"]),
        ])
        .unwrap();

        let mut req = Request::new("r1", "GET", "/x");
        let result = chain.process(&mut req).await;
        assert!(result.is_none());
        assert_eq!(*order.lock().unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn short_circuits_on_first_response() {
        struct Deny;
        #[async_trait]
        impl DependencyStage for Deny {
            async fn handle(&self, req: &mut Request) -> Option<Response> {
                Some(Response::error(req.id.clone(), 403, "nope", Duration::ZERO))
            }
        }
        let chain = DependencyChain::build(vec![
            Declaration::new("deny", Deny),
            Declaration::new("never", Passthrough).depends_on(["deny"]),
        ])
        .unwrap();

        let mut req = Request::new("r1", "GET", "/x");
        let response = chain.process(&mut req).await.unwrap();
        assert_eq!(response.status_code, 403);
    }
}
