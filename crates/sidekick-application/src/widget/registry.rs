//! Active-controller registry.

use std::sync::Mutex;

/// Tracks which of several simultaneous widgets (e.g. multiple terminals)
/// currently holds focus.
///
/// An explicit object passed by reference to each coordinator at
/// construction, not a module-level global. The pointer is written on
/// focus, cleared on blur or dispose, and never elsewhere.
pub struct ActiveControllerRegistry {
    active: Mutex<Option<String>>,
}

impl ActiveControllerRegistry {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    /// Marks `id` as the active controller.
    pub fn register(&self, id: &str) {
        *self.active.lock().unwrap() = Some(id.to_string());
    }

    /// Clears the pointer, but only if it still references `id`. A blur
    /// arriving after another widget's focus must not clobber it.
    pub fn unregister(&self, id: &str) {
        let mut active = self.active.lock().unwrap();
        if active.as_deref() == Some(id) {
            *active = None;
        }
    }

    /// The currently active controller id, if any.
    pub fn active(&self) -> Option<String> {
        self.active.lock().unwrap().clone()
    }
}

impl Default for ActiveControllerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        let registry = ActiveControllerRegistry::new();
        assert_eq!(registry.active(), None);

        registry.register("a");
        assert_eq!(registry.active(), Some("a".to_string()));

        registry.unregister("a");
        assert_eq!(registry.active(), None);
    }

    #[test]
    fn test_stale_blur_does_not_clobber_new_focus() {
        let registry = ActiveControllerRegistry::new();
        registry.register("a");
        registry.register("b");

        // "a" blurs after "b" took focus.
        registry.unregister("a");
        assert_eq!(registry.active(), Some("b".to_string()));
    }
}
