use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use terra_shared::region::TimeRange;

use crate::config::{BASE_INTERVAL_MS, DEFAULT_SPEED, MAX_SPEED, MIN_SPEED, PlaybackSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
}

/// Snapshot of the controller's state handed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub current_year: i32,
    pub status: PlaybackStatus,
    pub speed: f64,
    pub range: TimeRange,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Paused,
    /// Stepped past the end year and went back to the start.
    Wrapped,
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    YearChanged { from: i32, to: i32 },
    Started,
    Stopped(StopReason),
    SpeedChanged { from: f64, to: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Rc<dyn Fn(&PlaybackState, PlaybackEvent)>;

struct Inner {
    state: PlaybackState,
    settings: PlaybackSettings,
    ticker: Option<JoinHandle<()>>,
    last_tick: Instant,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    torn_down: bool,
}

impl Inner {
    fn period(&self) -> Duration {
        self.settings.base_interval.div_f64(self.state.speed)
    }

    fn clamp_speed(&self, speed: f64) -> f64 {
        speed.max(self.settings.min_speed).min(self.settings.max_speed)
    }

    fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

/// Sole owner of a dashboard's "current year".
///
/// Runs on a single thread: the ticker is a `spawn_local` task, so `play`
/// and `set_speed` must be called from inside a [`tokio::task::LocalSet`].
/// Subscribers run synchronously, after the state change and before the
/// mutating call returns.
pub struct PlaybackController {
    inner: Rc<RefCell<Inner>>,
}

impl PlaybackController {
    pub fn new(range: TimeRange, settings: PlaybackSettings) -> Self {
        let settings = sanitize_settings(settings);
        let speed = settings
            .initial_speed
            .max(settings.min_speed)
            .min(settings.max_speed);

        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: PlaybackState {
                    current_year: range.start,
                    status: PlaybackStatus::Idle,
                    speed,
                    range,
                },
                settings,
                ticker: None,
                last_tick: Instant::now(),
                subscribers: Vec::new(),
                next_subscription: 0,
                torn_down: false,
            })),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.borrow().state
    }

    pub fn current_year(&self) -> i32 {
        self.inner.borrow().state.current_year
    }

    pub fn is_playing(&self) -> bool {
        self.inner.borrow().state.is_playing()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.borrow().torn_down
    }

    pub fn subscribe(
        &self,
        subscriber: impl Fn(&PlaybackState, PlaybackEvent) + 'static,
    ) -> Option<SubscriptionId> {
        let mut inner = self.inner.borrow_mut();
        if inner.torn_down {
            return None;
        }
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.subscribers.push((id, Rc::new(subscriber)));
        Some(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .borrow_mut()
            .subscribers
            .retain(|(existing, _)| *existing != id);
    }

    /// Move to `year`, clamped into the region's range. Same-year requests
    /// are no-ops and notify nobody.
    pub fn set_year(&self, year: i32) {
        let event = {
            let mut inner = self.inner.borrow_mut();
            if inner.torn_down {
                return;
            }
            let target = inner.state.range.clamp(year);
            let from = inner.state.current_year;
            if target == from {
                return;
            }
            inner.state.current_year = target;
            PlaybackEvent::YearChanged { from, to: target }
        };
        notify(&self.inner, &[event]);
    }

    pub fn play(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.torn_down || inner.state.is_playing() {
                return;
            }
            // Nothing to step through.
            if inner.state.range.is_single_year() {
                return;
            }
            inner.state.status = PlaybackStatus::Playing;
            inner.last_tick = Instant::now();
            let first_delay = inner.period();
            drop(inner);
            let handle = spawn_ticker(&self.inner, first_delay);
            self.inner.borrow_mut().ticker = Some(handle);
        }
        notify(&self.inner, &[PlaybackEvent::Started]);
    }

    pub fn pause(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.torn_down || !inner.state.is_playing() {
                return;
            }
            inner.state.status = PlaybackStatus::Idle;
            inner.cancel_ticker();
        }
        notify(&self.inner, &[PlaybackEvent::Stopped(StopReason::Paused)]);
    }

    pub fn toggle_play(&self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Change the speed multiplier, clamped to the configured bounds.
    ///
    /// While playing, the ticker is rescheduled so the next step lands one
    /// new period after the previous step, or immediately if that moment has
    /// already passed.
    pub fn set_speed(&self, speed: f64) {
        if !speed.is_finite() {
            return;
        }
        let event = {
            let mut inner = self.inner.borrow_mut();
            if inner.torn_down {
                return;
            }
            let from = inner.state.speed;
            let to = inner.clamp_speed(speed);
            if to == from {
                return;
            }
            inner.state.speed = to;

            if inner.state.is_playing() {
                inner.cancel_ticker();
                let first_delay = inner.period().saturating_sub(inner.last_tick.elapsed());
                drop(inner);
                let handle = spawn_ticker(&self.inner, first_delay);
                self.inner.borrow_mut().ticker = Some(handle);
            }
            PlaybackEvent::SpeedChanged { from, to }
        };
        notify(&self.inner, &[event]);
    }

    /// Jump back to the start year. Playback keeps running if it was.
    pub fn reset(&self) {
        let start = self.inner.borrow().state.range.start;
        self.set_year(start);
    }

    pub fn step_forward(&self) {
        let year = self.current_year();
        self.set_year(year.saturating_add(1));
    }

    pub fn step_back(&self) {
        let year = self.current_year();
        self.set_year(year.saturating_sub(1));
    }

    /// Cancel the ticker and drop every subscriber. Later calls on this
    /// controller do nothing.
    pub fn teardown(&self) {
        let subscribers = {
            let mut inner = self.inner.borrow_mut();
            if inner.torn_down {
                return;
            }
            inner.torn_down = true;
            inner.cancel_ticker();
            let was_playing = inner.state.is_playing();
            inner.state.status = PlaybackStatus::Idle;
            let subscribers = std::mem::take(&mut inner.subscribers);
            if was_playing { subscribers } else { Vec::new() }
        };

        let state = self.state();
        for (_, subscriber) in subscribers {
            subscriber(&state, PlaybackEvent::Stopped(StopReason::TornDown));
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn sanitize_settings(settings: PlaybackSettings) -> PlaybackSettings {
    let base_interval = if settings.base_interval.is_zero() {
        Duration::from_millis(BASE_INTERVAL_MS)
    } else {
        settings.base_interval
    };
    let valid = |speed: f64| speed.is_finite() && speed > 0.0;
    let (mut min_speed, mut max_speed) = (settings.min_speed, settings.max_speed);
    if !valid(min_speed) || !valid(max_speed) {
        (min_speed, max_speed) = (MIN_SPEED, MAX_SPEED);
    }
    if min_speed > max_speed {
        std::mem::swap(&mut min_speed, &mut max_speed);
    }
    let initial_speed = if valid(settings.initial_speed) {
        settings.initial_speed
    } else {
        DEFAULT_SPEED
    };

    PlaybackSettings {
        base_interval,
        min_speed,
        max_speed,
        initial_speed,
    }
}

fn spawn_ticker(inner: &Rc<RefCell<Inner>>, first_delay: Duration) -> JoinHandle<()> {
    let weak = Rc::downgrade(inner);
    let period = inner.borrow().period();
    let first_tick = Instant::now() + first_delay;

    tokio::task::spawn_local(async move {
        let mut interval = tokio::time::interval_at(first_tick, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !advance(&weak) {
                break;
            }
        }
    })
}

/// One timer step. Returns whether the ticker should keep running.
fn advance(weak: &Weak<RefCell<Inner>>) -> bool {
    let Some(inner) = weak.upgrade() else {
        return false;
    };

    let (events, keep_running) = {
        let mut guard = inner.borrow_mut();
        if guard.torn_down || !guard.state.is_playing() {
            return false;
        }
        guard.last_tick = Instant::now();

        let range = guard.state.range;
        let from = guard.state.current_year;
        let next = from.saturating_add(1);

        if next > range.end {
            guard.state.current_year = range.start;
            guard.state.status = PlaybackStatus::Idle;
            // This task is the ticker; it ends when we return false.
            drop(guard.ticker.take());
            let mut events = Vec::with_capacity(2);
            if from != range.start {
                events.push(PlaybackEvent::YearChanged {
                    from,
                    to: range.start,
                });
            }
            events.push(PlaybackEvent::Stopped(StopReason::Wrapped));
            (events, false)
        } else {
            guard.state.current_year = next;
            (vec![PlaybackEvent::YearChanged { from, to: next }], true)
        }
    };

    notify(&inner, &events);
    keep_running
}

fn notify(inner: &Rc<RefCell<Inner>>, events: &[PlaybackEvent]) {
    let (state, subscribers) = {
        let guard = inner.borrow();
        let subscribers: Vec<Subscriber> = guard
            .subscribers
            .iter()
            .map(|(_, subscriber)| Rc::clone(subscriber))
            .collect();
        (guard.state, subscribers)
    };

    for event in events {
        for subscriber in &subscribers {
            subscriber(&state, *event);
        }
    }
}
