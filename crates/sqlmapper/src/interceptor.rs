//! The plugin/interceptor chain boundary (spec.md §1: "the plugin/
//! interceptor chain ... required contracts are stated in §6"; SPEC_FULL.md
//! §4 Non-goals: "a trait `Interceptor` is defined on the executor
//! boundary so the contract exists, but no actual plugin chain/AOP weaving
//! is implemented beyond a `Vec<Box<dyn Interceptor>>` invoked in order").

use sqlmapper_core::{Result, Value};

use crate::mapped_statement::MappedStatement;

/// One intercepted executor call, passed to every registered interceptor in
/// order. An interceptor may inspect or replace the parameter before the
/// call proceeds; it cannot suppress the call itself (no AOP weaving).
pub struct Invocation<'a> {
    pub statement: &'a MappedStatement,
    pub parameter: &'a Value,
}

pub trait Interceptor: Send + Sync {
    /// Called before a query/update executes. Returning `Err` aborts the
    /// call; returning `Ok(())` lets it proceed unchanged.
    fn intercept(&self, invocation: &Invocation<'_>) -> Result<()>;
}

#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<Box<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn push(&mut self, interceptor: Box<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn run(&self, invocation: &Invocation<'_>) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.intercept(invocation)?;
        }
        Ok(())
    }
}
