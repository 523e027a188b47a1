/*!
 * Reactive annotation engine.
 *
 * `RtlEngine` subscribes to the live document's mutation records, turns
 * them into affected subtree roots, and lets the `PassScheduler` coalesce
 * them into debounced passes. Live-input events and settings changes
 * arrive as `HostEvent`s and are handled inside the same cooperative loop,
 * so nothing ever runs concurrently with a pass.
 */

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, trace, warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

use crate::annotator::{AnnotateReport, Annotator};
use crate::app_config::Config;
use crate::assets::{AssetInstaller, AssetStatus};
use crate::dom::{Document, MutationRecord, NodeData, NodeId, SharedDocument, SimpleSelector};
use crate::live_input::InputRegistry;
use crate::scheduler::{PassBatch, PassScheduler};
use crate::settings::{load_settings, Appearance, Settings, SettingsStore};

/// Events delivered by the host outside the mutation stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The user edited a live input
    Input(NodeId),
    /// A live input received focus
    Focus(NodeId),
    /// The settings store was updated
    SettingsChanged,
    /// Stop the event loop
    Shutdown,
}

/// Running totals of the engine's work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Processing episodes that ran
    pub passes: u64,
    pub roots_annotated: u64,
    /// Roots whose annotation failed; siblings were still processed
    pub roots_failed: u64,
    pub inputs_wired: u64,
    /// Input and focus events that changed or confirmed a direction
    pub input_events: u64,
    pub settings_reloads: u64,
}

enum Step {
    Mutation(MutationRecord),
    Host(Option<HostEvent>),
    Deadline,
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

pub struct RtlEngine {
    document: SharedDocument,
    store: Arc<dyn SettingsStore>,
    mutations: UnboundedReceiver<MutationRecord>,
    containers: Vec<SimpleSelector>,
    annotator: Annotator,
    scheduler: PassScheduler,
    inputs: InputRegistry,
    assets: AssetInstaller,
    appearance: Appearance,
    assets_pending: bool,
    started: bool,
    stats: EngineStats,
}

impl RtlEngine {
    /// Create an engine observing `document`.
    ///
    /// The subscription starts immediately, so mutations made before
    /// `start` are not lost.
    pub fn new(document: SharedDocument, config: Config, store: Arc<dyn SettingsStore>) -> Result<Self> {
        config.validate()?;
        let containers = config.annotation.container_selectors()?;
        let mutations = document.lock().observe();

        Ok(Self {
            document,
            store,
            mutations,
            containers,
            annotator: Annotator::new(&config),
            scheduler: PassScheduler::new(&config.scheduler),
            inputs: InputRegistry::new(&config),
            assets: AssetInstaller::new(&config.annotation),
            appearance: Appearance::default(),
            assets_pending: true,
            started: false,
            stats: EngineStats::default(),
        })
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    pub fn scheduler(&self) -> &PassScheduler {
        &self.scheduler
    }

    pub fn inputs(&self) -> &InputRegistry {
        &self.inputs
    }

    /// Load settings, install the assets and arm the initial full pass
    pub async fn start(&mut self) {
        let settings = load_settings(self.store.as_ref()).await;
        self.apply_settings(settings, Instant::now());
        if self.appearance.enabled {
            self.scheduler.schedule_initial(Instant::now());
        }
        self.started = true;
        info!(
            "Engine started (enabled: {}, typeface: {}, {}px)",
            self.appearance.enabled, self.appearance.typeface_name, self.appearance.font_size_px
        );
    }

    /// Cooperative event loop; returns when `Shutdown` arrives or the host
    /// event channel closes.
    pub async fn run(&mut self, mut events: UnboundedReceiver<HostEvent>) -> EngineStats {
        if !self.started {
            self.start().await;
        }

        loop {
            let deadline = self.scheduler.deadline();
            let step = tokio::select! {
                Some(record) = self.mutations.recv() => Step::Mutation(record),
                event = events.recv() => Step::Host(event),
                _ = wait_for(deadline) => Step::Deadline,
            };

            match step {
                Step::Mutation(record) => self.on_mutation(&record),
                Step::Deadline => self.process_due(Instant::now()),
                Step::Host(Some(HostEvent::Input(id))) => self.handle_input(id),
                Step::Host(Some(HostEvent::Focus(id))) => self.handle_focus(id),
                Step::Host(Some(HostEvent::SettingsChanged)) => self.reload_settings().await,
                Step::Host(Some(HostEvent::Shutdown)) | Step::Host(None) => break,
            }
        }

        self.scheduler.cancel();
        info!("Engine stopped after {} pass(es)", self.stats.passes);
        self.stats
    }

    /// Start (if needed) and run one pass over everything pending right now
    pub async fn settle(&mut self) -> EngineStats {
        if !self.started {
            self.start().await;
        }
        self.flush();
        self.stats
    }

    /// Drain queued mutation records and run any pending pass immediately
    pub fn flush(&mut self) {
        while let Ok(record) = self.mutations.try_recv() {
            self.on_mutation(&record);
        }
        if let Some(batch) = self.scheduler.begin_now() {
            self.run_pass(batch);
            self.scheduler.finish(Instant::now());
        }
    }

    /// Run the armed pass if its deadline has passed
    pub fn process_due(&mut self, now: Instant) {
        if let Some(batch) = self.scheduler.begin(now) {
            self.run_pass(batch);
            self.scheduler.finish(Instant::now());
        }
    }

    /// Register the roots affected by one mutation record
    pub fn on_mutation(&mut self, record: &MutationRecord) {
        if !self.appearance.enabled || !record.is_content_change() {
            return;
        }
        let roots = {
            let doc = self.document.lock();
            self.roots_for(&doc, record)
        };
        if !roots.is_empty() {
            trace!("Mutation {:?} affects {} root(s)", record, roots.len());
            self.scheduler.notify(roots, Instant::now());
        }
    }

    fn roots_for(&self, doc: &Document, record: &MutationRecord) -> Vec<NodeId> {
        let mut roots = Vec::new();
        match record {
            MutationRecord::ChildList { parent, added, removed } => {
                for id in added {
                    match doc.data(*id) {
                        Some(NodeData::Element(_)) => roots.push(*id),
                        Some(_) => roots.push(*parent),
                        None => {}
                    }
                }
                // removing a text fragment changes the parent's own text
                if removed.iter().any(|id| matches!(doc.data(*id), Some(NodeData::Text(_)))) {
                    roots.push(*parent);
                }
            }
            MutationRecord::CharacterData { target } => {
                if let Some(parent) = doc.parent(*target) {
                    roots.push(parent);
                }
            }
            MutationRecord::Attributes { .. } => {}
        }

        roots.retain(|id| {
            doc.element(*id).is_some()
                && doc.is_attached(*id)
                && !self.annotator.exclusion().is_excluded(doc, *id)
        });
        roots.dedup();
        roots
    }

    fn handle_input(&mut self, id: NodeId) {
        if !self.appearance.enabled {
            return;
        }
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();
        match self.inputs.on_input(&mut doc, id) {
            Ok(Some(direction)) => {
                trace!("Input {:?} set to {:?}", id, direction);
                self.stats.input_events += 1;
            }
            Ok(None) => trace!("Ignoring input event for unwired node {:?}", id),
            Err(e) => warn!("Input handling failed for {:?}: {}", id, e),
        }
    }

    fn handle_focus(&mut self, id: NodeId) {
        if !self.appearance.enabled {
            return;
        }
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();
        match self.inputs.on_focus(&mut doc, id) {
            Ok(Some(_)) => self.stats.input_events += 1,
            Ok(None) => {}
            Err(e) => warn!("Focus handling failed for {:?}: {}", id, e),
        }
    }

    /// Refetch the settings in full and apply them
    pub async fn reload_settings(&mut self) {
        let settings = load_settings(self.store.as_ref()).await;
        self.stats.settings_reloads += 1;
        info!("Settings changed, reloading");
        self.apply_settings(settings, Instant::now());
    }

    fn apply_settings(&mut self, settings: Settings, now: Instant) {
        let was_enabled = self.appearance.enabled;
        self.appearance = settings.appearance();
        debug!("Appearance: {:?}", self.appearance);

        self.install_assets();

        if !self.appearance.enabled {
            self.scheduler.cancel();
        } else if self.started && !was_enabled {
            self.scheduler.schedule_full(now);
        }
    }

    fn install_assets(&mut self) {
        let document = Arc::clone(&self.document);
        let mut doc = document.lock();
        match self.assets.install(&mut doc, &self.appearance) {
            Ok(AssetStatus::Installed) => self.assets_pending = false,
            Ok(AssetStatus::HostNotReady) => self.assets_pending = true,
            Err(e) => {
                warn!("Asset installation failed: {}", e);
                self.assets_pending = true;
            }
        }
    }

    fn run_pass(&mut self, batch: PassBatch) {
        if !self.appearance.enabled {
            debug!("Skipping pass while disabled");
            return;
        }
        if self.assets_pending {
            self.install_assets();
        }

        let document = Arc::clone(&self.document);
        let mut doc = document.lock();

        let roots = if batch.full { vec![doc.root()] } else { batch.roots };
        let roots = normalize_roots(&doc, roots);
        let roots = scope_to_containers(&doc, &self.containers, roots);
        if roots.is_empty() {
            debug!("Nothing to annotate yet");
        }

        let mut total = AnnotateReport::default();
        for root in &roots {
            match self.annotator.annotate(&mut doc, *root) {
                Ok(report) => {
                    total += report;
                    self.stats.roots_annotated += 1;
                }
                Err(e) => {
                    warn!("Annotation of {:?} failed: {}", root, e);
                    self.stats.roots_failed += 1;
                }
            }
            match self.inputs.discover(&mut doc, *root, self.annotator.exclusion()) {
                Ok(wired) => self.stats.inputs_wired += wired.len() as u64,
                Err(e) => warn!("Input discovery under {:?} failed: {}", root, e),
            }
        }

        let pruned = self.annotator.prune(&doc) + self.inputs.prune(&doc);
        self.stats.passes += 1;
        debug!(
            "Pass {}: {} root(s), {} visited, {} rtl, {} ltr, {} reused, {} list(s) mirrored, {} stale state(s) pruned",
            self.stats.passes,
            roots.len(),
            total.visited,
            total.marked_rtl,
            total.marked_ltr,
            total.reused,
            total.lists_mirrored,
            pruned
        );
    }
}

/// Drop detached roots and roots inside other roots; sort in document order
pub fn normalize_roots(doc: &Document, roots: Vec<NodeId>) -> Vec<NodeId> {
    let ordered = doc.document_order(&roots);
    let mut kept: Vec<NodeId> = Vec::with_capacity(ordered.len());
    for root in ordered {
        if !kept.iter().any(|outer| doc.is_inclusive_ancestor(*outer, root)) {
            kept.push(root);
        }
    }
    kept
}

/// Restrict roots to the configured containers (no containers: unrestricted)
pub fn scope_to_containers(doc: &Document, containers: &[SimpleSelector], roots: Vec<NodeId>) -> Vec<NodeId> {
    if containers.is_empty() {
        return roots;
    }

    let found: Vec<NodeId> = containers
        .iter()
        .flat_map(|selector| doc.select(doc.root(), selector))
        .collect();
    let found = normalize_roots(doc, found);

    let mut scoped = Vec::new();
    for root in roots {
        if found.iter().any(|container| doc.is_inclusive_ancestor(*container, root)) {
            scoped.push(root);
        } else {
            scoped.extend(
                found
                    .iter()
                    .copied()
                    .filter(|container| doc.is_inclusive_ancestor(root, *container)),
            );
        }
    }
    normalize_roots(doc, scoped)
}
