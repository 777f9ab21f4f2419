// ABOUTME: Priority-ordered middleware chain: stages run priority-descending, ties preserve insertion order
// ABOUTME: Each stage receives a `Next` continuation it must call or short-circuit by returning a response
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;

use super::request::{Request, Response};

/// A single middleware stage. Implementors decide whether to call `next`
/// (continuing the chain) or return a response directly (short-circuiting).
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Higher runs first. Defaults to 0; ties preserve registration order.
    fn priority(&self) -> i32 {
        0
    }

    async fn handle(&self, req: &mut Request, next: Next<'_>) -> Response;
}

/// The continuation a stage calls to run the remainder of the chain.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    terminal: &'a Terminal,
}

type Terminal = Box<dyn Fn(&mut Request) -> futures_util::future::BoxFuture<'static, Response> + Send + Sync>;

impl<'a> Next<'a> {
    pub async fn run(self, req: &mut Request) -> Response {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                stage
                    .handle(
                        req,
                        Next {
                            stages: rest,
                            terminal: self.terminal,
                        },
                    )
                    .await
            }
            None => (self.terminal)(req).await,
        }
    }
}

/// An ordered list of stages plus a terminal handler, exclusively owning
/// that ordering once built.
pub struct Chain {
    stages: Vec<Arc<dyn Stage>>,
    terminal: Terminal,
}

impl Chain {
    #[must_use]
    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    pub async fn process(&self, req: &mut Request) -> Response {
        let start = Instant::now();
        let next = Next {
            stages: &self.stages,
            terminal: &self.terminal,
        };
        let mut response = next.run(req).await;
        response.duration = start.elapsed();
        response
    }
}

#[derive(Default)]
pub struct ChainBuilder {
    stages: Vec<Arc<dyn Stage>>,
}

impl ChainBuilder {
    #[must_use]
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Builds the chain, sorting stages by priority descending. The sort is
    /// stable, so stages sharing a priority keep their registration order.
    #[must_use]
    pub fn build<F, Fut>(mut self, terminal: F) -> Chain
    where
        F: Fn(&mut Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Response> + Send + 'static,
    {
        self.stages.sort_by_key(|s| std::cmp::Reverse(s.priority()));
        Chain {
            stages: self.stages,
            terminal: Box::new(move |req| Box::pin(terminal(req))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct Recording {
        name: &'static str,
        priority: i32,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Stage for Recording {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        async fn handle(&self, req: &mut Request, next: Next<'_>) -> Response {
            self.order.lock().unwrap().push(self.name);
            next.run(req).await
        }
    }

    #[tokio::test]
    async fn higher_priority_runs_first_ties_preserve_insertion_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::builder()
            .stage(Recording { name: "low", priority: 0, order: order.clone() })
            .stage(Recording { name: "high", priority: 10, order: order.clone() })
            .stage(Recording { name: "mid_a", priority: 5, order: order.clone() })
            .stage(Recording { name: "mid_b", priority: 5, order: order.clone() })
            .build(|req| {
                let id = req.id.clone();
                async move { Response::ok(id, Vec::new(), Duration::ZERO) }
            });

        let mut req = Request::new("r1", "GET", "/x");
        chain.process(&mut req).await;

        assert_eq!(*order.lock().unwrap(), vec!["high", "mid_a", "mid_b", "low"]);
    }

    struct ShortCircuit;

    #[async_trait]
    impl Stage for ShortCircuit {
        fn name(&self) -> &str {
            "short_circuit"
        }
        fn priority(&self) -> i32 {
            100
        }
        async fn handle(&self, req: &mut Request, _next: Next<'_>) -> Response {
            Response::error(req.id.clone(), 401, "denied", Duration::ZERO)
        }
    }

    #[tokio::test]
    async fn stage_can_short_circuit_without_calling_next() {
        let reached = Arc::new(AtomicUsize::new(0));
        let reached_clone = reached.clone();
        let chain = Chain::builder().stage(ShortCircuit).build(move |req| {
            reached_clone.fetch_add(1, Ordering::SeqCst);
            let id = req.id.clone();
            async move { Response::ok(id, Vec::new(), Duration::ZERO) }
        });

        let mut req = Request::new("r1", "GET", "/x");
        let response = chain.process(&mut req).await;
        assert_eq!(response.status_code, 401);
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }
}
