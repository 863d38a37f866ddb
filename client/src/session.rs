use std::cell::{Cell, OnceCell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use terra_shared::annotation::{Annotation, AnnotationIndex};
use terra_shared::chart::{Correlation, Trend, correlate, trends};
use terra_shared::instruments::InstrumentSelection;
use terra_shared::layers::{LayerKind, LayerSpec, LayerToggles, derive_layers};
use terra_shared::metrics::NasaData;
use terra_shared::region::Region;
use terra_shared::series::{TimeDataPoint, retain_in_range};

use crate::config::PlaybackSettings;
use crate::playback::{PlaybackController, PlaybackEvent, PlaybackState};
use crate::requests::{AnnotationsRequest, LiveMetricsRequest, TimeSeriesRequest};
use crate::resolver::{DataResolver, ResolvedDataset, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready(Tier),
}

struct Loaded<T> {
    tier: Tier,
    data: T,
}

struct LoadedSeries {
    points: Vec<TimeDataPoint>,
    trends: BTreeMap<String, Trend>,
}

/// Everything that depends on the current year, rebuilt on every change.
struct YearView {
    year: i32,
    layers: Vec<LayerSpec>,
    correlation: Correlation,
}

struct SessionState {
    region: Region,
    alive: Cell<bool>,
    toggles: RefCell<LayerToggles>,
    instruments: RefCell<InstrumentSelection>,
    series: OnceCell<Loaded<LoadedSeries>>,
    annotations: OnceCell<Loaded<AnnotationIndex>>,
    metrics: OnceCell<Loaded<NasaData>>,
    year_view: RefCell<YearView>,
}

impl SessionState {
    fn series_points(&self) -> &[TimeDataPoint] {
        self.series
            .get()
            .map(|loaded| loaded.data.points.as_slice())
            .unwrap_or_default()
    }

    fn recompute(&self, year: i32) {
        let layers = derive_layers(&self.region, year, &self.toggles.borrow());
        let correlation = correlate(self.series_points(), year);
        *self.year_view.borrow_mut() = YearView {
            year,
            layers,
            correlation,
        };
    }

    fn recompute_current(&self) {
        let year = self.year_view.borrow().year;
        self.recompute(year);
    }
}

/// What the UI renders for one frame.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub region: Region,
    pub year: i32,
    pub playback: PlaybackState,
    pub progress_percent: f64,
    pub layers: Vec<LayerSpec>,
    pub toggles: LayerToggles,
    pub correlation: Correlation,
    pub trends: BTreeMap<String, Trend>,
    pub annotations: AnnotationIndex,
    /// Annotations dated in the current year.
    pub annotations_this_year: Vec<Annotation>,
    pub metrics: Option<NasaData>,
    pub series_status: LoadStatus,
    pub annotations_status: LoadStatus,
    pub metrics_status: LoadStatus,
    pub instruments: InstrumentSelection,
}

/// One mounted region dashboard: the playback controller, the datasets it
/// loaded, and the views derived from both.
pub struct DashboardSession {
    state: Rc<SessionState>,
    playback: PlaybackController,
}

impl DashboardSession {
    pub fn mount(region: Region, settings: PlaybackSettings) -> Self {
        let playback = PlaybackController::new(region.time_range, settings);
        let year = playback.current_year();
        let layers = derive_layers(&region, year, &LayerToggles::default());

        let state = Rc::new(SessionState {
            region,
            alive: Cell::new(true),
            toggles: RefCell::new(LayerToggles::default()),
            instruments: RefCell::new(InstrumentSelection::default()),
            series: OnceCell::new(),
            annotations: OnceCell::new(),
            metrics: OnceCell::new(),
            year_view: RefCell::new(YearView {
                year,
                layers,
                correlation: correlate(&[], year),
            }),
        });

        let weak = Rc::downgrade(&state);
        playback.subscribe(move |playback_state, event| {
            if !matches!(event, PlaybackEvent::YearChanged { .. }) {
                return;
            }
            if let Some(state) = weak.upgrade()
                && state.alive.get()
            {
                state.recompute(playback_state.current_year);
            }
        });

        info!(region = %state.region.slug, year, "Mounted dashboard session");
        Self { state, playback }
    }

    pub fn region(&self) -> &Region {
        &self.state.region
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn is_alive(&self) -> bool {
        self.state.alive.get()
    }

    /// Resolve the series, annotations and live metrics concurrently on the
    /// local task set. Each result is applied as soon as it lands, unless the
    /// session has been unmounted by then.
    pub fn spawn_loads(&self, resolver: Rc<DataResolver>) -> JoinHandle<()> {
        let weak = Rc::downgrade(&self.state);
        let series_request = TimeSeriesRequest::for_region(&self.state.region);
        let annotations_request = AnnotationsRequest::for_region(&self.state.region);

        tokio::task::spawn_local(async move {
            futures::join!(
                async {
                    let resolved = resolver.resolve(&series_request).await;
                    apply_series(&weak, resolved);
                },
                async {
                    let resolved = resolver.resolve(&annotations_request).await;
                    apply_annotations(&weak, resolved);
                },
                async {
                    let resolved = resolver.resolve(&LiveMetricsRequest).await;
                    apply_metrics(&weak, resolved);
                },
            );
        })
    }

    pub fn toggle_layer(&self, kind: LayerKind) -> bool {
        if !self.is_alive() {
            return self.state.toggles.borrow().is_enabled(kind);
        }
        let enabled = self.state.toggles.borrow_mut().toggle(kind);
        self.state.recompute_current();
        enabled
    }

    pub fn set_layer(&self, kind: LayerKind, enabled: bool) {
        if !self.is_alive() {
            return;
        }
        if self.state.toggles.borrow_mut().set(kind, enabled) {
            self.state.recompute_current();
        }
    }

    pub fn toggle_instrument(&self, name: &str) -> bool {
        if !self.is_alive() {
            return self.state.instruments.borrow().is_selected(name);
        }
        self.state.instruments.borrow_mut().toggle(name)
    }

    pub fn view(&self) -> DashboardView {
        let state = &self.state;
        let playback = self.playback.state();
        let year_view = state.year_view.borrow();

        let annotations = state
            .annotations
            .get()
            .map(|loaded| loaded.data.clone())
            .unwrap_or_default();
        let annotations_this_year = annotations
            .all()
            .iter()
            .filter(|a| a.year() == Some(year_view.year))
            .cloned()
            .collect();

        DashboardView {
            region: state.region.clone(),
            year: year_view.year,
            playback,
            progress_percent: state.region.time_range.progress_percent(year_view.year),
            layers: year_view.layers.clone(),
            toggles: state.toggles.borrow().clone(),
            correlation: year_view.correlation.clone(),
            trends: state
                .series
                .get()
                .map(|loaded| loaded.data.trends.clone())
                .unwrap_or_default(),
            annotations,
            annotations_this_year,
            metrics: state.metrics.get().map(|loaded| loaded.data.clone()),
            series_status: status_of(&state.series),
            annotations_status: status_of(&state.annotations),
            metrics_status: status_of(&state.metrics),
            instruments: state.instruments.borrow().clone(),
        }
    }

    /// Tear down playback and stop accepting dataset results. Safe to call
    /// more than once.
    pub fn unmount(&self) {
        if !self.state.alive.replace(false) {
            return;
        }
        self.playback.teardown();
        info!(region = %self.state.region.slug, "Unmounted dashboard session");
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn status_of<T>(cell: &OnceCell<Loaded<T>>) -> LoadStatus {
    cell.get()
        .map(|loaded| LoadStatus::Ready(loaded.tier))
        .unwrap_or(LoadStatus::Loading)
}

fn live_state(weak: &Weak<SessionState>, kind: &'static str) -> Option<Rc<SessionState>> {
    match weak.upgrade() {
        Some(state) if state.alive.get() => Some(state),
        _ => {
            debug!(kind, "Discarding dataset for unmounted session");
            None
        }
    }
}

fn apply_series(weak: &Weak<SessionState>, resolved: ResolvedDataset<Vec<TimeDataPoint>>) {
    let Some(state) = live_state(weak, "time_series") else {
        return;
    };

    let mut points = resolved.payload;
    let dropped = retain_in_range(&mut points, state.region.time_range);
    if !dropped.is_empty() {
        warn!(
            region = %state.region.slug,
            dropped = dropped.len(),
            start = state.region.time_range.start,
            end = state.region.time_range.end,
            "Dropping time series points outside the region's time range"
        );
    }

    let trends = trends(&points);
    let loaded = Loaded {
        tier: resolved.provenance,
        data: LoadedSeries { points, trends },
    };
    if state.series.set(loaded).is_err() {
        debug!(region = %state.region.slug, "Time series already loaded");
        return;
    }
    state.recompute_current();
}

fn apply_annotations(weak: &Weak<SessionState>, resolved: ResolvedDataset<Vec<Annotation>>) {
    let Some(state) = live_state(weak, "annotations") else {
        return;
    };
    let loaded = Loaded {
        tier: resolved.provenance,
        data: AnnotationIndex::new(resolved.payload),
    };
    if state.annotations.set(loaded).is_err() {
        debug!(region = %state.region.slug, "Annotations already loaded");
    }
}

fn apply_metrics(weak: &Weak<SessionState>, resolved: ResolvedDataset<NasaData>) {
    let Some(state) = live_state(weak, "live_metrics") else {
        return;
    };
    let loaded = Loaded {
        tier: resolved.provenance,
        data: resolved.payload,
    };
    if state.metrics.set(loaded).is_err() {
        debug!(region = %state.region.slug, "Live metrics already loaded");
    }
}
