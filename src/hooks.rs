//! Extension points around license saves and deletes.
//!
//! Listeners are plain callbacks registered on [`LicenseHooks`]. A
//! before-hook returns a [`HookDecision`]; the first `Veto` stops the
//! operation and no further before-hooks run. After-hooks only observe.

use crate::models::License;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    Proceed,
    Veto,
}

/// Payload handed to every license hook.
#[derive(Debug, Clone, Copy)]
pub struct LicenseEvent<'a> {
    pub license: &'a License,
    /// True while the license is being issued for the first time
    pub is_new: bool,
}

type BeforeHook = Box<dyn Fn(&LicenseEvent<'_>) -> HookDecision + Send + Sync>;
type AfterHook = Box<dyn Fn(&LicenseEvent<'_>) + Send + Sync>;

#[derive(Default)]
pub struct LicenseHooks {
    before_save: Vec<BeforeHook>,
    after_save: Vec<AfterHook>,
    before_delete: Vec<BeforeHook>,
    after_delete: Vec<AfterHook>,
}

impl LicenseHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_save<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&LicenseEvent<'_>) -> HookDecision + Send + Sync + 'static,
    {
        self.before_save.push(Box::new(hook));
        self
    }

    pub fn on_after_save<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&LicenseEvent<'_>) + Send + Sync + 'static,
    {
        self.after_save.push(Box::new(hook));
        self
    }

    pub fn on_before_delete<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&LicenseEvent<'_>) -> HookDecision + Send + Sync + 'static,
    {
        self.before_delete.push(Box::new(hook));
        self
    }

    pub fn on_after_delete<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&LicenseEvent<'_>) + Send + Sync + 'static,
    {
        self.after_delete.push(Box::new(hook));
        self
    }

    pub fn before_save(&self, event: &LicenseEvent<'_>) -> HookDecision {
        run_before(&self.before_save, event)
    }

    pub fn after_save(&self, event: &LicenseEvent<'_>) {
        self.after_save.iter().for_each(|hook| hook(event));
    }

    pub fn before_delete(&self, event: &LicenseEvent<'_>) -> HookDecision {
        run_before(&self.before_delete, event)
    }

    pub fn after_delete(&self, event: &LicenseEvent<'_>) {
        self.after_delete.iter().for_each(|hook| hook(event));
    }
}

fn run_before(hooks: &[BeforeHook], event: &LicenseEvent<'_>) -> HookDecision {
    if hooks.iter().all(|hook| hook(event) == HookDecision::Proceed) {
        HookDecision::Proceed
    } else {
        HookDecision::Veto
    }
}

impl std::fmt::Debug for LicenseHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseHooks")
            .field("before_save", &self.before_save.len())
            .field("after_save", &self.after_save.len())
            .field("before_delete", &self.before_delete.len())
            .field("after_delete", &self.after_delete.len())
            .finish()
    }
}
