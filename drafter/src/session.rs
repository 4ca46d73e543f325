use std::sync::Arc;

use shared::{ExportFormat, Metrics, Point, RouteDraft, RouteSummary, Segment, Status, SurfaceType};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    assembler::RouteDraftAssembler,
    backend::RouteBackend,
    builder::{DrawMode, Gesture, SegmentBuilder},
    config::DraftConfig,
    error::DraftError,
    history::{History, HistorySnapshot},
    metrics::Estimator,
    queue::{PointQueue, Ticket, TicketGuard},
    render::{BaseLayer, MapSurface, MapSync, RenderView},
    snap::{resolve_point, ResolvedPoint, SnapLookup, SnapOptions},
    status::{self, MetricsSource, Transition},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Route last saved or opened; the target of exports.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedRoute {
    pub id: Uuid,
    pub name: String,
    pub status: Status,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A point gesture waiting for its snap lookup. Dropping it, or the future
/// resolving it, gives up its place in the point order.
#[derive(Debug)]
#[must_use = "a pending point does nothing until resolved and completed"]
pub struct PendingPoint {
    guard: TicketGuard,
    raw: Point,
    options: SnapOptions,
}

impl PendingPoint {
    pub fn ticket(&self) -> Ticket {
        self.guard.ticket()
    }

    pub fn raw(&self) -> Point {
        self.raw
    }

    /// Runs the snap lookup. Does not touch the session, so several pending
    /// points can be resolved concurrently.
    pub async fn resolve<S: SnapLookup>(self, snap: &S) -> CompletedPoint {
        let PendingPoint {
            guard,
            raw,
            options,
        } = self;
        CompletedPoint {
            resolved: resolve_point(snap, raw, options).await,
            guard,
        }
    }
}

#[derive(Debug)]
#[must_use = "a completed point is appended only by `DraftSession::complete_point`"]
pub struct CompletedPoint {
    guard: TicketGuard,
    resolved: ResolvedPoint,
}

impl CompletedPoint {
    pub fn ticket(&self) -> Ticket {
        self.guard.ticket()
    }

    pub fn point(&self) -> Point {
        self.resolved.point
    }
}

/// The whole drafting state, owned by the caller.
pub struct DraftSession<B, M: MapSurface> {
    config: DraftConfig,
    backend: Arc<B>,
    map: MapSync<M>,
    route_name: String,
    status: Status,
    builder: SegmentBuilder,
    assembler: RouteDraftAssembler,
    history: History,
    estimator: Estimator,
    queue: PointQueue<ResolvedPoint>,
    snap: SnapOptions,
    metrics: Option<Metrics>,
    notice: Option<Notice>,
    routes: Vec<RouteSummary>,
    selected: Option<SelectedRoute>,
    revision: watch::Sender<u64>,
}

impl<B, M> DraftSession<B, M>
where
    B: RouteBackend + SnapLookup + Send + Sync,
    M: MapSurface,
{
    pub fn new(config: DraftConfig, backend: Arc<B>, surface: M) -> Self {
        let builder = SegmentBuilder::new(
            config.segment_surface.clone(),
            config.free_draw_min_distance_m,
        );
        let assembler = RouteDraftAssembler::default();
        let initial = HistorySnapshot {
            segments: Vec::new(),
            current_segment: builder.current().clone(),
            status: Status::Preliminary,
            route_name: config.route_name.clone(),
        };
        let (revision, _) = watch::channel(0);

        let mut session = Self {
            route_name: config.route_name.clone(),
            status: Status::Preliminary,
            history: History::new(initial, config.history_limit),
            estimator: Estimator::new(config.walking_speed_kmh),
            snap: config.snap_options(),
            map: MapSync::new(surface, BaseLayer::default()),
            queue: PointQueue::default(),
            metrics: None,
            notice: None,
            routes: Vec::new(),
            selected: None,
            builder,
            assembler,
            backend,
            config,
            revision,
        };
        session.redraw();
        session
    }

    pub fn route_name(&self) -> &str {
        &self.route_name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn mode(&self) -> DrawMode {
        self.builder.mode()
    }

    pub fn points_allowed(&self) -> bool {
        self.builder.points_allowed()
    }

    pub fn segments(&self) -> &[Segment] {
        self.assembler.segments()
    }

    pub fn current_segment(&self) -> &Segment {
        self.builder.current()
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn routes(&self) -> &[RouteSummary] {
        &self.routes
    }

    pub fn selected_route(&self) -> Option<&SelectedRoute> {
        self.selected.as_ref()
    }

    pub fn snap_options(&self) -> SnapOptions {
        self.snap
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn surface(&self) -> &M {
        self.map.surface()
    }

    pub fn base_layer(&self) -> BaseLayer {
        self.map.base_layer()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receives the revision number bumped after every committed change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn collect_segments(&self) -> Vec<Segment> {
        self.assembler.collect_segments(&self.builder)
    }

    pub fn draft(&self) -> RouteDraft {
        self.assembler
            .draft(&self.builder, &self.route_name, self.status)
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            segments: self.assembler.segments().to_vec(),
            current_segment: self.builder.current().clone(),
            status: self.status,
            route_name: self.route_name.clone(),
        }
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.snap.enabled = enabled;
    }

    pub fn set_snap_threshold(&mut self, meters: f64) {
        self.snap.threshold_meters = meters.max(0.0);
    }

    pub fn set_base_layer(&mut self, layer: BaseLayer) {
        self.map.set_base_layer(layer);
    }

    /// Returns false when the mode is refused (anything but `Pan` while the
    /// route is final).
    pub fn set_mode(&mut self, mode: DrawMode) -> bool {
        if !self.builder.set_mode(mode) {
            return false;
        }
        self.redraw();
        self.bump_revision();
        true
    }

    pub fn begin_stroke(&mut self) -> bool {
        self.builder.begin_stroke()
    }

    pub fn end_stroke(&mut self) {
        self.builder.end_stroke();
    }

    pub fn set_route_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name == self.route_name {
            return;
        }
        self.route_name = name;
        self.record_history();
        self.bump_revision();
    }

    pub fn set_segment_name(&mut self, name: impl Into<String>) {
        self.builder.set_name(name);
        self.record_history();
        self.bump_revision();
    }

    pub fn set_segment_surface(&mut self, surface: SurfaceType) {
        if !self.builder.points_allowed() {
            return;
        }
        self.builder.set_surface(surface);
        self.commit_local();
    }

    /// First step of adding a point: admits the gesture and reserves its
    /// place in the point order.
    pub fn issue_point(&mut self, raw: Point, gesture: Gesture) -> Option<PendingPoint> {
        self.flush_cancelled();
        let admitted = self.builder.admit(raw, gesture)?;
        Some(PendingPoint {
            guard: self.queue.issue(),
            raw: admitted,
            options: self.snap,
        })
    }

    /// Last step of adding a point. Applies every completion that is now in
    /// issue order and returns how many points were appended.
    pub fn complete_point(&mut self, done: CompletedPoint) -> usize {
        let released = self.queue.complete(done.guard, done.resolved);
        self.apply_released(released)
    }

    /// Appends points that were held back by a pending point that has since
    /// been dropped. Returns how many were appended.
    pub fn flush_cancelled(&mut self) -> usize {
        let released = self.queue.release_cancelled();
        self.apply_released(released)
    }

    /// Number of point gestures whose snap lookup has not been applied yet.
    pub fn pending_points(&self) -> usize {
        self.queue.in_flight()
    }

    fn apply_released(&mut self, released: Vec<ResolvedPoint>) -> usize {
        let mut applied = 0;
        for resolved in released {
            if !self.builder.push_point(resolved.point) {
                continue;
            }
            if let Some(route_name) = resolved.snapped_to {
                self.notice = Some(Notice::info(format!(
                    "Snapped to archived route: {route_name}"
                )));
            }
            applied += 1;
            self.commit_local();
        }
        if self.queue.in_flight() == 0 {
            self.builder.settle_last_sample();
        }
        applied
    }

    /// Admits, snaps and appends one point. Returns the appended point.
    /// Dropping the future before it finishes gives up this point only.
    pub async fn add_point(&mut self, raw: Point, gesture: Gesture) -> Option<Point> {
        let pending = self.issue_point(raw, gesture)?;
        let backend = Arc::clone(&self.backend);
        let done = pending.resolve(backend.as_ref()).await;
        let point = done.point();
        (self.complete_point(done) > 0).then_some(point)
    }

    pub fn finalize_segment(&mut self) -> bool {
        if !self.assembler.finalize_current(&mut self.builder) {
            return false;
        }
        self.commit_local();
        true
    }

    pub async fn remove_segment(&mut self, index: usize) -> Option<Segment> {
        let removed = self.assembler.remove_segment(index)?;
        tracing::info!("removed segment {index} ({:?})", removed.name);
        self.commit().await;
        Some(removed)
    }

    pub async fn set_status(&mut self, target: Status) -> Transition {
        let outcome = status::transition(
            &mut self.status,
            target,
            &mut self.assembler,
            &mut self.builder,
        );
        if outcome != Transition::Unchanged {
            self.queue.abandon();
            self.commit().await;
        }
        outcome
    }

    pub async fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.apply_snapshot(snapshot).await;
                true
            }
            None => {
                tracing::debug!("undo: nothing to do");
                false
            }
        }
    }

    pub async fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.apply_snapshot(snapshot).await;
                true
            }
            None => {
                tracing::debug!("redo: nothing to do");
                false
            }
        }
    }

    /// Restores a snapshot without recording it again.
    pub async fn apply_snapshot(&mut self, snapshot: HistorySnapshot) {
        self.history.begin_restore();
        self.queue.abandon();
        self.assembler.replace(snapshot.segments);
        self.builder.restore(snapshot.current_segment);
        self.status = snapshot.status;
        self.route_name = snapshot.route_name;
        status::apply_editing_rules(self.status, &mut self.builder);
        self.commit().await;
        self.history.end_restore();
    }

    /// Recomputes metrics from the source the current status trusts.
    pub async fn refresh_metrics(&mut self) {
        let segments = self.collect_segments();
        if segments.iter().all(Segment::is_empty) {
            self.metrics = None;
            return;
        }
        self.metrics = match MetricsSource::for_status(self.status) {
            MetricsSource::Local => self.estimator.estimate(&segments),
            MetricsSource::Backend => {
                let draft = self.draft();
                match self.backend.metrics(&draft).await {
                    Ok(metrics) => Some(metrics),
                    Err(err) => {
                        tracing::warn!("failed to fetch route metrics: {err}");
                        self.notice = Some(Notice::error(format!(
                            "Could not fetch route metrics: {err}"
                        )));
                        None
                    }
                }
            }
        };
    }

    pub async fn load_routes(&mut self) -> Result<(), DraftError> {
        match self.backend.list_routes().await {
            Ok(routes) => {
                tracing::debug!("loaded {} saved routes", routes.len());
                self.routes = routes;
                Ok(())
            }
            Err(err) => {
                tracing::warn!("failed to list routes: {err}");
                self.notice = Some(Notice::error(format!("Could not load routes: {err}")));
                Err(err.into())
            }
        }
    }

    /// Persists the draft. Only final routes are accepted; on success the
    /// session starts a fresh draft and the saved route becomes the export
    /// target.
    pub async fn save(&mut self) -> Result<Uuid, DraftError> {
        if let Err(err) = status::ensure_persistable(self.status) {
            tracing::debug!("save rejected: {err}");
            self.notice = Some(Notice::error(err.to_string()));
            return Err(err);
        }

        let draft = self.draft();
        let envelope = match self.backend.save_route(&draft).await {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!("failed to save route {:?}: {err}", draft.name);
                self.notice = Some(Notice::error(format!("Could not save the route: {err}")));
                return Err(err.into());
            }
        };

        let id = envelope.route.id;
        tracing::info!("saved route {:?} as {id}", envelope.route.name);
        self.selected = Some(SelectedRoute {
            id,
            name: envelope.route.name,
            status: envelope.route.status,
            metrics: envelope.metrics,
        });
        self.reset_draft();
        self.notice = Some(match self.load_routes().await {
            Ok(()) => Notice::info("Route saved and analysed"),
            Err(err) => Notice::error(format!(
                "Route saved and analysed, but the route list could not be refreshed: {err}"
            )),
        });
        Ok(id)
    }

    /// Replaces the draft with a saved route. History starts over from it.
    pub async fn open_route(&mut self, id: Uuid) -> Result<(), DraftError> {
        let envelope = match self.backend.load_route(id).await {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!("failed to open route {id}: {err}");
                self.notice = Some(Notice::error(format!("Could not open the route: {err}")));
                return Err(err.into());
            }
        };

        let route = envelope.route;
        tracing::info!(
            "opened route {:?} ({}) with {} segments",
            route.name,
            route.status,
            route.segments.len()
        );
        self.queue.abandon();
        self.route_name = route.name.clone();
        self.status = route.status;
        self.assembler.replace(route.segments);
        self.builder.reset(self.assembler.segments().len());
        status::apply_editing_rules(self.status, &mut self.builder);
        self.metrics = Some(envelope.metrics.clone());
        self.selected = Some(SelectedRoute {
            id: route.id,
            name: route.name,
            status: route.status,
            metrics: envelope.metrics,
        });
        self.history.reset(self.snapshot());
        self.redraw();
        self.bump_revision();
        Ok(())
    }

    /// Downloads the selected route. Rejected without a saved route or when
    /// the saved route is still preliminary.
    pub async fn export(&mut self, format: ExportFormat) -> Result<Download, DraftError> {
        let Some(selected) = self.selected.as_ref() else {
            self.notice = Some(Notice::error(DraftError::NoSavedRoute.to_string()));
            return Err(DraftError::NoSavedRoute);
        };
        let id = selected.id;
        if let Err(err) = status::ensure_exportable(selected.status) {
            self.notice = Some(Notice::error(err.to_string()));
            return Err(err);
        }

        match self.backend.export(id, format).await {
            Ok(bytes) => {
                tracing::info!("exported route {id} as {format} ({} bytes)", bytes.len());
                Ok(Download {
                    file_name: format.file_name(id),
                    bytes,
                })
            }
            Err(err) => {
                tracing::warn!("failed to export route {id}: {err}");
                self.notice = Some(Notice::error(format!("Could not export the route: {err}")));
                Err(err.into())
            }
        }
    }

    /// Starts an empty preliminary draft with fresh history.
    pub fn reset_draft(&mut self) {
        self.queue.abandon();
        self.route_name = self.config.route_name.clone();
        self.status = Status::Preliminary;
        self.assembler.clear();
        self.builder.reset(0);
        status::apply_editing_rules(self.status, &mut self.builder);
        self.metrics = None;
        self.history.reset(self.snapshot());
        self.redraw();
        self.bump_revision();
    }

    /// Commit path for edits that can only happen on a preliminary draft.
    fn commit_local(&mut self) {
        self.redraw();
        self.metrics = self.estimator.estimate(&self.collect_segments());
        self.record_history();
        self.bump_revision();
    }

    async fn commit(&mut self) {
        self.redraw();
        self.refresh_metrics().await;
        self.record_history();
        self.bump_revision();
    }

    fn record_history(&mut self) {
        let snapshot = self.snapshot();
        self.history.push(snapshot);
    }

    fn redraw(&mut self) {
        self.map.redraw(RenderView {
            segments: self.assembler.segments(),
            current: self.builder.current(),
            mode: self.builder.mode(),
        });
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}
