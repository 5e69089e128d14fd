//! One-time checks that must all pass before the first step runs.

use crate::error::Result;

use super::context::Context;

pub trait Precondition {
    fn name(&self) -> &str;
    fn check(&self, ctx: &Context) -> Result<()>;
}

struct FnCheck<F> {
    name: String,
    check: F,
}

impl<F> Precondition for FnCheck<F>
where
    F: Fn(&Context) -> Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, ctx: &Context) -> Result<()> {
        (self.check)(ctx)
    }
}

#[derive(Default)]
pub struct Gate {
    checks: Vec<Box<dyn Precondition>>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, check: impl Precondition + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn with_fn<F>(self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Context) -> Result<()> + 'static,
    {
        self.with(FnCheck {
            name: name.into(),
            check,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run checks in order. The first failure is returned unchanged.
    pub fn run(&self, ctx: &Context) -> Result<()> {
        for check in &self.checks {
            log_status!("check", "{}", check.name());
            check.check(ctx)?;
        }
        Ok(())
    }
}
