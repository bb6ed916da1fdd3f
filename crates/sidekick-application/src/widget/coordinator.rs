//! Widget state coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use sidekick_core::error::Result;
use sidekick_core::host::HostSurfaceAdapter;
use sidekick_core::session::{SessionHandle, SessionStore};
use sidekick_core::state::{ViewState, ViewStateRepository};
use sidekick_interaction::AgentMetadataProvider;

use super::registry::ActiveControllerRegistry;

const FALLBACK_PLACEHOLDER: &str = "Ask a question";

/// Tracks the observable UI state around one assistant widget and mediates
/// view-state save/restore.
///
/// Reads controller/session status, never mutates it: the session and its
/// request chain stay exclusively owned by the request controller.
pub struct WidgetStateCoordinator {
    /// Identity used in the active-controller registry.
    id: String,
    store: Arc<SessionStore>,
    registry: Arc<ActiveControllerRegistry>,
    view_state: Arc<dyn ViewStateRepository>,
    agents: Arc<dyn AgentMetadataProvider>,
    surface: Arc<dyn HostSurfaceAdapter>,
    visible: AtomicBool,
    focused: AtomicBool,
    placeholder: Mutex<String>,
    input: Mutex<String>,
    /// Last view-model id we persisted, to detect view-model changes.
    last_view_model: Mutex<Option<String>>,
    /// State restored at construction, best effort.
    restored: Option<ViewState>,
}

impl WidgetStateCoordinator {
    /// Builds a coordinator and restores prior view state.
    ///
    /// Missing or corrupt stored state is treated as "no state".
    pub async fn new(
        store: Arc<SessionStore>,
        registry: Arc<ActiveControllerRegistry>,
        view_state: Arc<dyn ViewStateRepository>,
        agents: Arc<dyn AgentMetadataProvider>,
        surface: Arc<dyn HostSurfaceAdapter>,
    ) -> Self {
        let restored = view_state.get(store.location()).await;
        let placeholder = default_placeholder(agents.as_ref(), store.as_ref());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            store,
            registry,
            view_state,
            agents,
            surface,
            visible: AtomicBool::new(false),
            focused: AtomicBool::new(false),
            placeholder: Mutex::new(placeholder),
            input: Mutex::new(String::new()),
            last_view_model: Mutex::new(None),
            restored,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// View state restored at construction, if any was stored.
    pub fn restored_view_state(&self) -> Option<&ViewState> {
        self.restored.as_ref()
    }

    /// Shows the widget: ensures a session exists, resets the placeholder
    /// to the agent's default, and focuses the surface.
    pub async fn reveal(&self) -> Result<Arc<SessionHandle>> {
        let session = self.store.ensure_session().await?;
        self.visible.store(true, Ordering::SeqCst);
        self.reset_placeholder();
        self.surface.focus();
        self.note_view_model_changed(session.id()).await;
        Ok(session)
    }

    /// Hides the widget: clears transient input and releases the
    /// positioning offset applied to the host surface.
    pub fn hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
        self.input.lock().unwrap().clear();
        self.surface.clear_offset();
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    /// Overrides the placeholder, e.g. with progress text while a request
    /// is in flight. The real input value is untouched.
    pub fn set_placeholder(&self, text: impl Into<String>) {
        *self.placeholder.lock().unwrap() = text.into();
    }

    /// Reverts the placeholder to the agent-default description.
    pub fn reset_placeholder(&self) {
        *self.placeholder.lock().unwrap() =
            default_placeholder(self.agents.as_ref(), self.store.as_ref());
    }

    pub fn placeholder(&self) -> String {
        self.placeholder.lock().unwrap().clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        *self.input.lock().unwrap() = text.into();
    }

    pub fn input(&self) -> String {
        self.input.lock().unwrap().clone()
    }

    /// Focus gained: this widget becomes the active controller.
    pub fn on_focus(&self) {
        self.focused.store(true, Ordering::SeqCst);
        self.registry.register(&self.id);
    }

    /// Focus lost: releases the active-controller pointer.
    pub fn on_blur(&self) {
        self.focused.store(false, Ordering::SeqCst);
        self.registry.unregister(&self.id);
    }

    /// Must be called when the widget goes away; guarantees the registry
    /// pointer is not left dangling at this coordinator.
    pub fn dispose(&self) {
        self.registry.unregister(&self.id);
    }

    /// Records that the widget's view model changed (session swapped or
    /// first created) and persists continuity state.
    pub async fn note_view_model_changed(&self, view_model_id: &str) {
        {
            let mut last = self.last_view_model.lock().unwrap();
            if last.as_deref() == Some(view_model_id) {
                return;
            }
            *last = Some(view_model_id.to_string());
        }
        let state = ViewState::with_view_model(view_model_id);
        if let Err(err) = self.view_state.store(self.store.location(), &state).await {
            // Losing continuity state is not worth surfacing to the user.
            tracing::warn!(error = %err, "failed to persist view state");
        }
    }
}

fn default_placeholder(agents: &dyn AgentMetadataProvider, store: &SessionStore) -> String {
    agents
        .default_agent(store.location())
        .map(|agent| agent.description)
        .unwrap_or_else(|| FALLBACK_PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use sidekick_core::host::SurfaceBounds;
    use sidekick_core::session::AgentLocation;
    use sidekick_interaction::{AgentMetadata, ScriptedTransport, StaticAgentRegistry};

    struct RecordingSurface {
        focus_calls: AtomicUsize,
        clear_offset_calls: AtomicUsize,
    }

    impl RecordingSurface {
        fn new() -> Self {
            Self {
                focus_calls: AtomicUsize::new(0),
                clear_offset_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HostSurfaceAdapter for RecordingSurface {
        fn focus(&self) {
            self.focus_calls.fetch_add(1, Ordering::SeqCst);
        }

        fn bounds(&self) -> SurfaceBounds {
            SurfaceBounds::default()
        }

        async fn run_command(&self, _text: &str, _execute: bool) -> Result<()> {
            Ok(())
        }

        fn scroll_to_end(&self) {}

        fn clear_offset(&self) {
            self.clear_offset_calls.fetch_add(1, Ordering::SeqCst);
        }

        fn accept_pending_edits(&self) {}

        fn discard_pending_edits(&self) {}
    }

    struct MemoryViewStates {
        states: Mutex<HashMap<&'static str, ViewState>>,
    }

    impl MemoryViewStates {
        fn new() -> Self {
            Self {
                states: Mutex::new(HashMap::new()),
            }
        }

        fn preloaded(location: AgentLocation, state: ViewState) -> Self {
            let repo = Self::new();
            repo.states.lock().unwrap().insert(location.as_str(), state);
            repo
        }
    }

    #[async_trait]
    impl ViewStateRepository for MemoryViewStates {
        async fn get(&self, location: AgentLocation) -> Option<ViewState> {
            self.states.lock().unwrap().get(location.as_str()).cloned()
        }

        async fn store(&self, location: AgentLocation, state: &ViewState) -> Result<()> {
            self.states
                .lock()
                .unwrap()
                .insert(location.as_str(), state.clone());
            Ok(())
        }
    }

    fn terminal_agents() -> Arc<StaticAgentRegistry> {
        Arc::new(StaticAgentRegistry::new().register(
            AgentLocation::Terminal,
            AgentMetadata {
                id: "shell-helper".to_string(),
                description: "Ask how to do something in the terminal".to_string(),
            },
        ))
    }

    async fn coordinator(
        view_state: Arc<MemoryViewStates>,
        surface: Arc<RecordingSurface>,
    ) -> WidgetStateCoordinator {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(SessionStore::new(transport, AgentLocation::Terminal));
        WidgetStateCoordinator::new(
            store,
            Arc::new(ActiveControllerRegistry::new()),
            view_state,
            terminal_agents(),
            surface,
        )
        .await
    }

    #[tokio::test]
    async fn test_reveal_creates_session_and_focuses() {
        let surface = Arc::new(RecordingSurface::new());
        let view_state = Arc::new(MemoryViewStates::new());
        let coordinator = coordinator(view_state.clone(), surface.clone()).await;

        let session = coordinator.reveal().await.unwrap();

        assert!(coordinator.is_visible());
        assert_eq!(surface.focus_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            coordinator.placeholder(),
            "Ask how to do something in the terminal"
        );
        // View state was persisted for the new view model.
        let stored = view_state.get(AgentLocation::Terminal).await.unwrap();
        assert_eq!(stored.last_view_model_id.as_deref(), Some(session.id()));
    }

    #[tokio::test]
    async fn test_hide_clears_input_and_offset() {
        let surface = Arc::new(RecordingSurface::new());
        let coordinator = coordinator(Arc::new(MemoryViewStates::new()), surface.clone()).await;

        coordinator.reveal().await.unwrap();
        coordinator.set_input("half-typed");
        coordinator.hide();

        assert!(!coordinator.is_visible());
        assert_eq!(coordinator.input(), "");
        assert_eq!(surface.clear_offset_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_placeholder_override_and_reset() {
        let surface = Arc::new(RecordingSurface::new());
        let coordinator = coordinator(Arc::new(MemoryViewStates::new()), surface).await;

        coordinator.set_placeholder("Thinking...");
        assert_eq!(coordinator.placeholder(), "Thinking...");

        coordinator.reset_placeholder();
        assert_eq!(
            coordinator.placeholder(),
            "Ask how to do something in the terminal"
        );
    }

    #[tokio::test]
    async fn test_restores_prior_view_state() {
        let surface = Arc::new(RecordingSurface::new());
        let view_state = Arc::new(MemoryViewStates::preloaded(
            AgentLocation::Terminal,
            ViewState::with_view_model("vm-42"),
        ));
        let coordinator = coordinator(view_state, surface).await;

        assert_eq!(
            coordinator
                .restored_view_state()
                .unwrap()
                .last_view_model_id
                .as_deref(),
            Some("vm-42")
        );
    }

    #[tokio::test]
    async fn test_focus_bookkeeping_drives_registry() {
        let surface = Arc::new(RecordingSurface::new());
        let registry = Arc::new(ActiveControllerRegistry::new());
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(SessionStore::new(transport, AgentLocation::Terminal));
        let coordinator = WidgetStateCoordinator::new(
            store,
            registry.clone(),
            Arc::new(MemoryViewStates::new()),
            terminal_agents(),
            surface,
        )
        .await;

        coordinator.on_focus();
        assert_eq!(registry.active().as_deref(), Some(coordinator.id()));

        coordinator.on_blur();
        assert_eq!(registry.active(), None);
    }

    #[tokio::test]
    async fn test_dispose_clears_dangling_pointer() {
        let surface = Arc::new(RecordingSurface::new());
        let registry = Arc::new(ActiveControllerRegistry::new());
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(SessionStore::new(transport, AgentLocation::Terminal));
        let coordinator = WidgetStateCoordinator::new(
            store,
            registry.clone(),
            Arc::new(MemoryViewStates::new()),
            terminal_agents(),
            surface,
        )
        .await;

        coordinator.on_focus();
        coordinator.dispose();
        assert_eq!(registry.active(), None);
    }
}
