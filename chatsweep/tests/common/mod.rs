#![allow(dead_code)]

//! Scripted in-memory host page for integration tests.
//!
//! `FakeSurface` models a chat-history page: rows with hover triggers, an
//! options menu with a delete entry, a confirmation dialog and a dismissable
//! backdrop. Tests script failures (broken menus, missing triggers, vanished
//! chats) and observe clicks, reloads and dismissals.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use chatsweep::{
    CheckpointStore, ConfirmGate, MemoryStore, Orchestrator, Page, PageElement, PageElementImpl,
    PageSurface, ProgressSink, RunRequest, RunSummary, Selector, SweepConfig, SweepError,
};

/// Route engine logs to the test writer; safe to call from every test.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone)]
pub struct FakeChat {
    pub id: String,
    pub title: String,
    pub pinned: bool,
}

pub fn chat(id: &str, title: &str) -> FakeChat {
    FakeChat {
        id: id.to_string(),
        title: title.to_string(),
        pinned: false,
    }
}

pub fn pinned_chat(id: &str, title: &str) -> FakeChat {
    FakeChat {
        pinned: true,
        ..chat(id, title)
    }
}

#[derive(Default)]
struct PageState {
    host_present: bool,
    chats: Vec<FakeChat>,
    /// Chats that only become visible after the next reload, like a
    /// windowed list revealing its tail.
    backlog: Vec<FakeChat>,
    menu_open_for: Option<String>,
    confirm_open_for: Option<String>,
    /// Chats whose options menu opens but never shows a delete entry.
    broken_menus: HashSet<String>,
    /// Chats whose confirmation dialog never presents a confirm control.
    broken_confirms: HashSet<String>,
    /// Chats rendered without a trigger control at all.
    missing_triggers: HashSet<String>,
    deleted: Vec<String>,
    dismissals: u32,
}

impl PageState {
    fn has_chat(&self, id: &str) -> bool {
        self.chats.iter().any(|c| c.id == id)
    }
}

type TriggerHook = Box<dyn Fn(&str) + Send + Sync>;

struct SurfaceInner {
    state: Mutex<PageState>,
    reloads: AtomicU32,
    controls_installed: AtomicBool,
    install_calls: AtomicU32,
    trigger_hook: Mutex<Option<TriggerHook>>,
}

pub struct FakeSurface {
    inner: Arc<SurfaceInner>,
}

impl FakeSurface {
    pub fn new(chats: Vec<FakeChat>) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(SurfaceInner {
                state: Mutex::new(PageState {
                    host_present: true,
                    chats,
                    ..PageState::default()
                }),
                reloads: AtomicU32::new(0),
                controls_installed: AtomicBool::new(false),
                install_calls: AtomicU32::new(0),
                trigger_hook: Mutex::new(None),
            }),
        })
    }

    pub fn set_host_present(&self, present: bool) {
        self.inner.state.lock().unwrap().host_present = present;
    }

    pub fn set_backlog(&self, chats: Vec<FakeChat>) {
        self.inner.state.lock().unwrap().backlog = chats;
    }

    pub fn break_menu(&self, id: &str) {
        self.inner
            .state
            .lock()
            .unwrap()
            .broken_menus
            .insert(id.to_string());
    }

    pub fn break_confirm(&self, id: &str) {
        self.inner
            .state
            .lock()
            .unwrap()
            .broken_confirms
            .insert(id.to_string());
    }

    pub fn remove_trigger(&self, id: &str) {
        self.inner
            .state
            .lock()
            .unwrap()
            .missing_triggers
            .insert(id.to_string());
    }

    /// Simulate the chat vanishing outside the engine's control (deleted in
    /// another tab, expired, ...).
    pub fn remove_chat(&self, id: &str) {
        self.inner.state.lock().unwrap().chats.retain(|c| c.id != id);
    }

    pub fn add_chat(&self, chat: FakeChat) {
        self.inner.state.lock().unwrap().chats.push(chat);
    }

    /// Invoked on every trigger click with the chat id, before the menu
    /// opens; lets tests act mid-flight.
    pub fn on_trigger_click(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.inner.trigger_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn chats_left(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .unwrap()
            .chats
            .iter()
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.inner.state.lock().unwrap().deleted.clone()
    }

    pub fn reloads(&self) -> u32 {
        self.inner.reloads.load(Ordering::SeqCst)
    }

    pub fn dismissals(&self) -> u32 {
        self.inner.state.lock().unwrap().dismissals
    }

    pub fn install_calls(&self) -> u32 {
        self.inner.install_calls.load(Ordering::SeqCst)
    }

    pub fn menu_open(&self) -> bool {
        self.inner.state.lock().unwrap().menu_open_for.is_some()
    }

    fn node(&self, kind: NodeKind) -> PageElement {
        PageElement::new(FakeNode {
            inner: self.inner.clone(),
            kind,
        })
    }
}

impl PageSurface for FakeSurface {
    fn query(
        &self,
        selector: &Selector,
        root: Option<&PageElement>,
    ) -> Result<Vec<PageElement>, SweepError> {
        let state = self.inner.state.lock().unwrap();
        let nodes = match selector {
            Selector::Css(css) if css == ".chat-row" => {
                if !state.host_present {
                    Vec::new()
                } else {
                    state
                        .chats
                        .iter()
                        .map(|c| self.node(NodeKind::Row { id: c.id.clone() }))
                        .collect()
                }
            }
            Selector::TestId(tid) if tid == "actions-menu-button" => {
                let Some(root) = root else {
                    return Ok(Vec::new());
                };
                match root.durable_id() {
                    Some(id) if state.has_chat(&id) && !state.missing_triggers.contains(&id) => {
                        vec![self.node(NodeKind::Trigger { id })]
                    }
                    _ => Vec::new(),
                }
            }
            Selector::Css(css) if css == ".menu-delete-entry" => match &state.menu_open_for {
                Some(id) if !state.broken_menus.contains(id) => {
                    vec![self.node(NodeKind::DeleteEntry { id: id.clone() })]
                }
                _ => Vec::new(),
            },
            Selector::TestId(tid) if tid == "confirm-button" => match &state.confirm_open_for {
                Some(id) if !state.broken_confirms.contains(id) => {
                    vec![self.node(NodeKind::ConfirmButton { id: id.clone() })]
                }
                _ => Vec::new(),
            },
            Selector::Css(css) if css == ".overlay-backdrop" => {
                if state.menu_open_for.is_some() || state.confirm_open_for.is_some() {
                    vec![self.node(NodeKind::Backdrop)]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        };
        Ok(nodes)
    }

    fn host_root(&self) -> Result<PageElement, SweepError> {
        let state = self.inner.state.lock().unwrap();
        if state.host_present {
            Ok(self.node(NodeKind::Host))
        } else {
            Err(SweepError::HostUnavailable(
                "history container is not in the page".to_string(),
            ))
        }
    }

    fn find_by_durable_id(&self, id: &str) -> Result<PageElement, SweepError> {
        let state = self.inner.state.lock().unwrap();
        if state.has_chat(id) {
            Ok(self.node(NodeKind::Row { id: id.to_string() }))
        } else {
            Err(SweepError::StaleReference(format!(
                "no entity with id {id}"
            )))
        }
    }

    fn is_protected(&self, element: &PageElement) -> bool {
        let state = self.inner.state.lock().unwrap();
        element
            .durable_id()
            .and_then(|id| state.chats.iter().find(|c| c.id == id).map(|c| c.pinned))
            .unwrap_or(false)
    }

    fn reload(&self) {
        self.inner.reloads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.inner.state.lock().unwrap();
        state.menu_open_for = None;
        state.confirm_open_for = None;
        let mut revealed = std::mem::take(&mut state.backlog);
        state.chats.append(&mut revealed);
    }

    fn install_controls(&self) -> bool {
        self.inner.install_calls.fetch_add(1, Ordering::SeqCst);
        !self.inner.controls_installed.swap(true, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Host,
    Row { id: String },
    Trigger { id: String },
    DeleteEntry { id: String },
    ConfirmButton { id: String },
    Backdrop,
}

struct FakeNode {
    inner: Arc<SurfaceInner>,
    kind: NodeKind,
}

impl fmt::Debug for FakeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FakeNode({:?})", self.kind)
    }
}

impl PageElementImpl for FakeNode {
    fn durable_id(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Row { id } => Some(id.clone()),
            _ => None,
        }
    }

    fn text(&self) -> String {
        let state = self.inner.state.lock().unwrap();
        match &self.kind {
            NodeKind::Row { id } => state
                .chats
                .iter()
                .find(|c| &c.id == id)
                .map(|c| c.title.clone())
                .unwrap_or_default(),
            NodeKind::DeleteEntry { .. } | NodeKind::ConfirmButton { .. } => "Delete".to_string(),
            _ => String::new(),
        }
    }

    fn is_attached(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        match &self.kind {
            NodeKind::Host => state.host_present,
            NodeKind::Row { id } | NodeKind::Trigger { id } => state.has_chat(id),
            NodeKind::DeleteEntry { id } => state.menu_open_for.as_deref() == Some(id),
            NodeKind::ConfirmButton { id } => state.confirm_open_for.as_deref() == Some(id),
            NodeKind::Backdrop => {
                state.menu_open_for.is_some() || state.confirm_open_for.is_some()
            }
        }
    }

    fn is_visible(&self) -> bool {
        self.is_attached()
    }

    fn reveal(&self) -> Result<(), SweepError> {
        Ok(())
    }

    fn click(&self) -> Result<(), SweepError> {
        match &self.kind {
            NodeKind::Trigger { id } => {
                {
                    let mut state = self.inner.state.lock().unwrap();
                    if !state.has_chat(id) {
                        return Err(SweepError::StaleReference(format!("chat {id} is gone")));
                    }
                    state.menu_open_for = Some(id.clone());
                }
                // Hook runs outside the state lock; it may call back into
                // the orchestrator.
                if let Some(hook) = self.inner.trigger_hook.lock().unwrap().as_ref() {
                    hook(id);
                }
                Ok(())
            }
            NodeKind::DeleteEntry { id } => {
                let mut state = self.inner.state.lock().unwrap();
                state.menu_open_for = None;
                state.confirm_open_for = Some(id.clone());
                Ok(())
            }
            NodeKind::ConfirmButton { id } => {
                let mut state = self.inner.state.lock().unwrap();
                state.confirm_open_for = None;
                state.chats.retain(|c| &c.id != id);
                state.deleted.push(id.clone());
                Ok(())
            }
            NodeKind::Backdrop => {
                let mut state = self.inner.state.lock().unwrap();
                state.menu_open_for = None;
                state.confirm_open_for = None;
                state.dismissals += 1;
                Ok(())
            }
            NodeKind::Host | NodeKind::Row { .. } => Ok(()),
        }
    }

    fn clone_box(&self) -> Box<dyn PageElementImpl> {
        Box::new(FakeNode {
            inner: self.inner.clone(),
            kind: self.kind.clone(),
        })
    }
}

/// Config whose selectors the fake surface understands.
pub fn test_config() -> SweepConfig {
    SweepConfig {
        candidates: Selector::Css(".chat-row".to_string()),
        trigger: Selector::TestId("actions-menu-button".to_string()),
        delete_entry: Selector::Css(".menu-delete-entry".to_string()),
        confirm: Selector::TestId("confirm-button".to_string()),
        dismiss: Some(Selector::Css(".overlay-backdrop".to_string())),
        ..SweepConfig::default()
    }
}

/// Progress sink that records every tick and summary.
#[derive(Default)]
pub struct RecordingSink {
    pub ticks: Mutex<Vec<(u32, u32)>>,
    pub summaries: Mutex<Vec<RunSummary>>,
}

impl RecordingSink {
    pub fn last_tick(&self) -> Option<(u32, u32)> {
        self.ticks.lock().unwrap().last().copied()
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        self.summaries.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, processed: u32, total: u32) {
        self.ticks.lock().unwrap().push((processed, total));
    }

    fn on_summary(&self, summary: &RunSummary) {
        self.summaries.lock().unwrap().push(summary.clone());
    }
}

/// Gate that answers a fixed way and counts how often it was consulted.
pub struct CountingGate {
    pub answer: bool,
    pub calls: AtomicU32,
}

impl CountingGate {
    pub fn approving() -> Arc<Self> {
        Arc::new(Self {
            answer: true,
            calls: AtomicU32::new(0),
        })
    }

    pub fn declining() -> Arc<Self> {
        Arc::new(Self {
            answer: false,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfirmGate for CountingGate {
    async fn confirm(&self, _request: &RunRequest) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// Gate that parks the run in `Confirming` until the test releases it.
#[derive(Default)]
pub struct HoldingGate {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl ConfirmGate for HoldingGate {
    async fn confirm(&self, _request: &RunRequest) -> bool {
        self.entered.notify_one();
        self.release.notified().await;
        true
    }
}

/// Everything a test needs, wired together.
pub struct Harness {
    pub surface: Arc<FakeSurface>,
    pub kv: Arc<MemoryStore>,
    pub checkpoint: CheckpointStore,
    pub progress: Arc<RecordingSink>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn harness(surface: Arc<FakeSurface>) -> Harness {
    let kv = Arc::new(MemoryStore::new());
    let checkpoint = CheckpointStore::new(kv.clone());
    let page = Page::new(surface.clone() as Arc<dyn PageSurface>);
    let progress = Arc::new(RecordingSink::default());
    let orchestrator = Arc::new(
        Orchestrator::new(page, checkpoint.clone(), test_config())
            .with_progress_sink(progress.clone()),
    );
    Harness {
        surface,
        kv,
        checkpoint,
        progress,
        orchestrator,
    }
}

pub fn harness_with_gate(surface: Arc<FakeSurface>, gate: Arc<dyn ConfirmGate>) -> Harness {
    let kv = Arc::new(MemoryStore::new());
    let checkpoint = CheckpointStore::new(kv.clone());
    let page = Page::new(surface.clone() as Arc<dyn PageSurface>);
    let progress = Arc::new(RecordingSink::default());
    let orchestrator = Arc::new(
        Orchestrator::new(page, checkpoint.clone(), test_config())
            .with_progress_sink(progress.clone())
            .with_confirm_gate(gate),
    );
    Harness {
        surface,
        kv,
        checkpoint,
        progress,
        orchestrator,
    }
}
