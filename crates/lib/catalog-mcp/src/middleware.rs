//! Before/after interceptors around tool handlers.
//!
//! A [`Pipeline`] runs every before-hook in assembly order, then the handler,
//! then every after-hook in reverse order. The first failing hook ends the
//! call with a soft failure carrying its message. Cancellation is never turned
//! into a soft failure.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::context::{
    CallContext,
    ToolCallError,
    ToolContext,
    ToolFuture,
    ToolHandler,
    ToolOutput,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiddlewareError {
    #[error("access denied")]
    AccessDenied,
    #[error("tool call cancelled")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}

impl MiddlewareError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn before(
        &self,
        _call: &mut CallContext,
        _tool: &mut ToolContext,
    ) -> Result<(), MiddlewareError> {
        Ok(())
    }

    async fn after(
        &self,
        _call: &CallContext,
        _tool: &ToolContext,
        output: ToolOutput,
    ) -> Result<ToolOutput, MiddlewareError> {
        Ok(output)
    }
}

pub type SharedMiddleware = Arc<dyn Middleware>;

/// Ordered interceptor chain for one registered tool.
#[derive(Clone, Default)]
pub struct Pipeline {
    chain: Vec<SharedMiddleware>,
}

impl Pipeline {
    #[must_use]
    pub const fn new(chain: Vec<SharedMiddleware>) -> Self {
        Self { chain }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Wraps `base` with the chain. An empty chain returns `base` itself.
    #[must_use]
    pub fn wrap(&self, tool_name: &str, base: ToolHandler) -> ToolHandler {
        if self.chain.is_empty() {
            return base;
        }
        let chain: Arc<[SharedMiddleware]> = self.chain.clone().into();
        let tool_name: Arc<str> = Arc::from(tool_name);
        Arc::new(move |call: CallContext, input: Value| -> ToolFuture {
            let chain = Arc::clone(&chain);
            let base = Arc::clone(&base);
            let tool_name = Arc::clone(&tool_name);
            Box::pin(async move { run_chain(&chain, &base, &tool_name, call, input).await })
        })
    }
}

async fn run_chain(
    chain: &[SharedMiddleware],
    base: &ToolHandler,
    tool_name: &str,
    mut call: CallContext,
    input: Value,
) -> Result<ToolOutput, ToolCallError> {
    let mut tool = ToolContext::new(tool_name, input.clone());

    for middleware in chain {
        if call.is_cancelled() {
            return Err(ToolCallError::Cancelled);
        }
        if let Err(err) = middleware.before(&mut call, &mut tool).await {
            return settle(&call, tool_name, "before", err);
        }
    }

    let mut output = base(call.clone(), input).await?;

    for middleware in chain.iter().rev() {
        output = match middleware.after(&call, &tool, output).await {
            Ok(output) => output,
            Err(err) => return settle(&call, tool_name, "after", err),
        };
    }
    Ok(output)
}

fn settle(
    call: &CallContext,
    tool_name: &str,
    stage: &str,
    err: MiddlewareError,
) -> Result<ToolOutput, ToolCallError> {
    if err == MiddlewareError::Cancelled || call.is_cancelled() {
        return Err(ToolCallError::Cancelled);
    }
    debug!(tool = tool_name, stage, error = %err, "middleware aborted tool call");
    Ok(ToolOutput::error(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recording {
        label: &'static str,
        log: Log,
        fail_before: Option<MiddlewareError>,
        fail_after: bool,
    }

    impl Recording {
        fn new(label: &'static str, log: &Log) -> Self {
            Self {
                label,
                log: Arc::clone(log),
                fail_before: None,
                fail_after: false,
            }
        }

        fn push(&self, event: &str) {
            self.log
                .lock()
                .expect("log lock")
                .push(format!("{}:{event}", self.label));
        }
    }

    #[async_trait]
    impl Middleware for Recording {
        async fn before(
            &self,
            call: &mut CallContext,
            _tool: &mut ToolContext,
        ) -> Result<(), MiddlewareError> {
            self.push("before");
            call.insert(self.label, json!(true));
            self.fail_before.clone().map_or(Ok(()), Err)
        }

        async fn after(
            &self,
            _call: &CallContext,
            _tool: &ToolContext,
            output: ToolOutput,
        ) -> Result<ToolOutput, MiddlewareError> {
            self.push("after");
            if self.fail_after {
                return Err(MiddlewareError::failed(format!("{} rejected output", self.label)));
            }
            Ok(output)
        }
    }

    fn base_handler(log: &Log) -> ToolHandler {
        let log = Arc::clone(log);
        Arc::new(move |call: CallContext, input: Value| -> ToolFuture {
            let log = Arc::clone(&log);
            Box::pin(async move {
                let seen: Vec<&str> = ["A", "B"]
                    .into_iter()
                    .filter(|label| call.get(label).is_some())
                    .collect();
                log.lock()
                    .expect("log lock")
                    .push(format!("handler:{}", seen.join(",")));
                Ok(ToolOutput::json(&input))
            })
        })
    }

    fn events(log: &Log) -> Vec<String> {
        log.lock().expect("log lock").clone()
    }

    #[tokio::test]
    async fn before_runs_in_order_and_after_in_reverse() {
        let log: Log = Arc::default();
        let pipeline = Pipeline::new(vec![
            Arc::new(Recording::new("A", &log)) as SharedMiddleware,
            Arc::new(Recording::new("B", &log)),
        ]);
        let handler = pipeline.wrap("catalog_search", base_handler(&log));

        let output = handler(CallContext::default(), json!({"query": "orders"}))
            .await
            .expect("call completes");

        assert!(!output.is_error);
        assert_eq!(
            events(&log),
            ["A:before", "B:before", "handler:A,B", "B:after", "A:after"]
        );
    }

    #[tokio::test]
    async fn failing_before_stops_the_chain() {
        let log: Log = Arc::default();
        let mut first = Recording::new("A", &log);
        first.fail_before = Some(MiddlewareError::failed("bad input"));
        let pipeline = Pipeline::new(vec![
            Arc::new(first) as SharedMiddleware,
            Arc::new(Recording::new("B", &log)),
        ]);
        let handler = pipeline.wrap("catalog_search", base_handler(&log));

        let output = handler(CallContext::default(), json!({}))
            .await
            .expect("soft failure");

        assert!(output.is_error);
        assert_eq!(output.text, "bad input");
        assert_eq!(events(&log), ["A:before"]);
    }

    #[tokio::test]
    async fn failing_after_skips_remaining_after_hooks() {
        let log: Log = Arc::default();
        let mut second = Recording::new("B", &log);
        second.fail_after = true;
        let pipeline = Pipeline::new(vec![
            Arc::new(Recording::new("A", &log)) as SharedMiddleware,
            Arc::new(second),
        ]);
        let handler = pipeline.wrap("catalog_search", base_handler(&log));

        let output = handler(CallContext::default(), json!({}))
            .await
            .expect("soft failure");

        assert!(output.is_error);
        assert_eq!(output.text, "B rejected output");
        assert_eq!(
            events(&log),
            ["A:before", "B:before", "handler:A,B", "B:after"]
        );
    }

    #[tokio::test]
    async fn access_denied_is_a_soft_failure() {
        let log: Log = Arc::default();
        let mut guard = Recording::new("A", &log);
        guard.fail_before = Some(MiddlewareError::AccessDenied);
        let handler = Pipeline::new(vec![Arc::new(guard) as SharedMiddleware])
            .wrap("catalog_get_entity", base_handler(&log));

        let output = handler(CallContext::default(), json!({}))
            .await
            .expect("soft failure");
        assert!(output.is_error);
        assert_eq!(output.text, "access denied");
    }

    #[tokio::test]
    async fn cancellation_is_not_swallowed() {
        let log: Log = Arc::default();
        let mut guard = Recording::new("A", &log);
        guard.fail_before = Some(MiddlewareError::failed("lookup aborted"));
        let handler = Pipeline::new(vec![Arc::new(guard) as SharedMiddleware])
            .wrap("catalog_search", base_handler(&log));

        let call = CallContext::default();
        call.cancel.cancel();
        let result = handler(call, json!({})).await;
        assert_eq!(result, Err(ToolCallError::Cancelled));

        let mut cancelling = Recording::new("B", &log);
        cancelling.fail_before = Some(MiddlewareError::Cancelled);
        let handler = Pipeline::new(vec![Arc::new(cancelling) as SharedMiddleware])
            .wrap("catalog_search", base_handler(&log));
        let result = handler(CallContext::default(), json!({})).await;
        assert_eq!(result, Err(ToolCallError::Cancelled));
    }

    #[test]
    fn empty_pipeline_returns_the_base_handler() {
        let log: Log = Arc::default();
        let base = base_handler(&log);
        let wrapped = Pipeline::default().wrap("catalog_search", Arc::clone(&base));
        assert!(Arc::ptr_eq(&base, &wrapped));
    }
}
