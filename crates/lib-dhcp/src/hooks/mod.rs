use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use tracing::warn;

mod library;

pub use library::*;

use crate::types::Message;

pub const HOOK_PKT4_RECEIVE: &str = "pkt4_receive";
pub const HOOK_PKT4_SEND: &str = "pkt4_send";

/// Version the host implements; every plugin's `version()` must agree.
pub const HOOK_API_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalloutStatus {
    /// Proceed with the default behavior of the surrounding step.
    Continue,
    /// Suppress the default behavior of the surrounding step.
    Skip,
}

/// Signature of a registered callout. A nonzero return is logged and
/// treated as [`CalloutStatus::Continue`].
pub type CalloutFn = fn(&mut CalloutHandle<'_>) -> i32;

/// The typed argument bag handed to callouts: the inbound query, the
/// response under construction (send hook only), a status the callout may
/// set, and free-form per-hook context.
pub struct CalloutHandle<'a> {
    status: CalloutStatus,
    query4: Option<&'a mut Message>,
    response4: Option<&'a mut Message>,
    context: HashMap<String, Box<dyn Any + Send>>,
}

impl<'a> CalloutHandle<'a> {
    pub fn new() -> Self {
        Self {
            status: CalloutStatus::Continue,
            query4: None,
            response4: None,
            context: HashMap::new(),
        }
    }

    pub fn with_query4(mut self, query: &'a mut Message) -> Self {
        self.query4 = Some(query);
        self
    }

    pub fn with_response4(mut self, response: &'a mut Message) -> Self {
        self.response4 = Some(response);
        self
    }

    pub fn query4(&mut self) -> Option<&mut Message> {
        self.query4.as_deref_mut()
    }

    pub fn response4(&mut self) -> Option<&mut Message> {
        self.response4.as_deref_mut()
    }

    pub fn status(&self) -> CalloutStatus {
        self.status
    }

    pub fn set_status(&mut self, status: CalloutStatus) {
        self.status = status;
    }

    pub fn set_context<T: Any + Send>(&mut self, name: &str, value: T) {
        self.context.insert(name.to_string(), Box::new(value));
    }

    pub fn get_context<T: Any + Send>(&self, name: &str) -> Option<&T> {
        self.context.get(name)?.downcast_ref()
    }
}

impl Default for CalloutHandle<'_> {
    fn default() -> Self {
        Self::new()
    }
}

struct RegisteredCallout {
    library: String,
    callout: CalloutFn,
}

/// Loads plugins and dispatches the named callout points. Callouts run in
/// registration order; a panicking callout is logged and treated as
/// Continue.
#[derive(Default)]
pub struct HooksManager {
    libraries: Vec<HookLibrary>,
    callouts: HashMap<String, Vec<RegisteredCallout>>,
}

impl HooksManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one plugin and adopt the callouts it registers.
    pub fn load_library(
        &mut self,
        path: &Path,
        parameters: Option<serde_json::Value>,
    ) -> Result<(), HookError> {
        let name = path.display().to_string();
        let mut registrar = LibraryRegistrar::new(name.clone(), None);
        let library = HookLibrary::load(path, parameters, &mut registrar)?;

        for (hook, callout) in registrar.into_registrations() {
            self.register_callout(&hook, &name, callout);
        }
        self.libraries.push(library);
        Ok(())
    }

    /// Register a callout directly, bypassing plugin loading. Used by the
    /// loader and by in-process tests.
    pub fn register_callout(&mut self, hook: &str, library: &str, callout: CalloutFn) {
        self.callouts
            .entry(hook.to_string())
            .or_default()
            .push(RegisteredCallout {
                library: library.to_string(),
                callout,
            });
    }

    pub fn callouts_present(&self, hook: &str) -> bool {
        self.callouts.get(hook).is_some_and(|c| !c.is_empty())
    }

    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    /// Invoke every callout registered on a hook point, in registration
    /// order. The handle's final status tells the caller whether to skip
    /// its default behavior.
    pub fn call_callouts(&self, hook: &str, handle: &mut CalloutHandle<'_>) {
        let Some(callouts) = self.callouts.get(hook) else {
            return;
        };

        for registered in callouts {
            let result = catch_unwind(AssertUnwindSafe(|| (registered.callout)(handle)));
            match result {
                Ok(0) => {}
                Ok(code) => {
                    warn!(hook, library = %registered.library, code, "callout returned an error");
                }
                Err(_) => {
                    warn!(hook, library = %registered.library, "callout panicked, continuing");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageType;

    fn mark_one(handle: &mut CalloutHandle<'_>) -> i32 {
        handle.set_context("order", vec![1u8]);
        0
    }

    fn mark_two(handle: &mut CalloutHandle<'_>) -> i32 {
        let mut order = handle
            .get_context::<Vec<u8>>("order")
            .cloned()
            .unwrap_or_default();
        order.push(2);
        handle.set_context("order", order);
        0
    }

    fn skip_callout(handle: &mut CalloutHandle<'_>) -> i32 {
        handle.set_status(CalloutStatus::Skip);
        0
    }

    fn panicking_callout(_handle: &mut CalloutHandle<'_>) -> i32 {
        panic!("callout gone wrong");
    }

    fn rewrite_query(handle: &mut CalloutHandle<'_>) -> i32 {
        if let Some(query) = handle.query4() {
            query.hops = 42;
        }
        0
    }

    #[test]
    fn callouts_run_in_registration_order() {
        let mut manager = HooksManager::new();
        manager.register_callout(HOOK_PKT4_RECEIVE, "a", mark_one);
        manager.register_callout(HOOK_PKT4_RECEIVE, "b", mark_two);

        let mut handle = CalloutHandle::new();
        manager.call_callouts(HOOK_PKT4_RECEIVE, &mut handle);

        assert_eq!(handle.get_context::<Vec<u8>>("order"), Some(&vec![1, 2]));
    }

    #[test]
    fn skip_status_is_visible_to_caller() {
        let mut manager = HooksManager::new();
        manager.register_callout(HOOK_PKT4_SEND, "a", skip_callout);

        let mut handle = CalloutHandle::new();
        manager.call_callouts(HOOK_PKT4_SEND, &mut handle);
        assert_eq!(handle.status(), CalloutStatus::Skip);
    }

    #[test]
    fn panicking_callout_is_treated_as_continue() {
        let mut manager = HooksManager::new();
        manager.register_callout(HOOK_PKT4_RECEIVE, "a", panicking_callout);
        manager.register_callout(HOOK_PKT4_RECEIVE, "b", mark_one);

        let mut handle = CalloutHandle::new();
        manager.call_callouts(HOOK_PKT4_RECEIVE, &mut handle);

        assert_eq!(handle.status(), CalloutStatus::Continue);
        assert!(handle.get_context::<Vec<u8>>("order").is_some());
    }

    #[test]
    fn callouts_see_typed_arguments() {
        let mut manager = HooksManager::new();
        manager.register_callout(HOOK_PKT4_RECEIVE, "a", rewrite_query);

        let mut query = Message::new(MessageType::Discover, 1);
        let mut handle = CalloutHandle::new().with_query4(&mut query);
        manager.call_callouts(HOOK_PKT4_RECEIVE, &mut handle);
        drop(handle);

        assert_eq!(query.hops, 42);
    }

    #[test]
    fn absent_hook_is_a_no_op() {
        let manager = HooksManager::new();
        assert!(!manager.callouts_present(HOOK_PKT4_RECEIVE));
        let mut handle = CalloutHandle::new();
        manager.call_callouts(HOOK_PKT4_RECEIVE, &mut handle);
        assert_eq!(handle.status(), CalloutStatus::Continue);
    }
}
