//! Typed fan-out of weather updates to independent listeners.
//!
//! Replaces the ambient string-keyed event dispatch of a browser page with an
//! explicit broadcaster over a fixed set of topics. Each topic retains its
//! latest published value and replays it to new subscribers, so presentation
//! code (clock, season visuals, ambient audio, carousel) can attach at any
//! point and still render immediately.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::model::{Season, WeatherSnapshot};

/// Fallible subscriber callback. Errors are logged and skipped; they never
/// stop delivery to later subscribers and never unregister the callback.
type Callback<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

struct Registration<T> {
    id: u64,
    callback: Callback<T>,
}

struct ChannelState<T> {
    next_id: u64,
    latest: Option<T>,
    subscribers: Vec<Registration<T>>,
}

/// One named topic: at-most-one retained latest value plus a subscriber list.
struct Channel<T> {
    name: &'static str,
    state: Arc<Mutex<ChannelState<T>>>,
}

impl<T: Clone + Send + 'static> Channel<T> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(ChannelState {
                next_id: 0,
                latest: None,
                subscribers: Vec::new(),
            })),
        }
    }

    fn lock(state: &Mutex<ChannelState<T>>) -> MutexGuard<'_, ChannelState<T>> {
        state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(
        &self,
        callback: impl Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Subscription {
        let callback: Callback<T> = Arc::new(callback);

        let (id, replay) = {
            let mut state = Self::lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push(Registration { id, callback: Arc::clone(&callback) });
            (id, state.latest.clone())
        };

        // Replay-latest: a topic with an existing value delivers it to the
        // new subscriber immediately, before any further publish.
        if let Some(value) = replay {
            if let Err(err) = callback(&value) {
                tracing::warn!(topic = self.name, error = %err, "subscriber failed on replay");
            }
        }

        let state: Weak<Mutex<ChannelState<T>>> = Arc::downgrade(&self.state);
        Subscription {
            cancel: Box::new(move || {
                if let Some(state) = state.upgrade() {
                    Self::lock(&state).subscribers.retain(|reg| reg.id != id);
                }
            }),
        }
    }

    fn publish(&self, value: T) {
        // The retained value is replaced before anyone is notified, and the
        // delivery list is snapshotted here: callbacks registered while a
        // publish is running only see the following publish.
        let delivery: Vec<Callback<T>> = {
            let mut state = Self::lock(&self.state);
            state.latest = Some(value.clone());
            state.subscribers.iter().map(|reg| Arc::clone(&reg.callback)).collect()
        };

        for callback in delivery {
            if let Err(err) = callback(&value) {
                tracing::warn!(topic = self.name, error = %err, "subscriber failed");
            }
        }
    }

    fn latest(&self) -> Option<T> {
        Self::lock(&self.state).latest.clone()
    }
}

/// Handle returned by the subscribe methods. Invoking [`unsubscribe`] removes
/// exactly that registration; invoking it again is a no-op. Dropping the
/// handle does NOT unsubscribe.
///
/// [`unsubscribe`]: Subscription::unsubscribe
pub struct Subscription {
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        (self.cancel)();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Process-wide registry fanning out normalized snapshots, temperature values
/// and season classifications to any number of independent listeners.
///
/// Publishing is synchronous with respect to the caller: every callback
/// registered at publish time has run (or been logged and skipped) before the
/// publish method returns, in registration order.
pub struct UpdateBroadcaster {
    weather_ready: Channel<Arc<WeatherSnapshot>>,
    temperature_changed: Channel<f64>,
    season_changed: Channel<Season>,
}

impl UpdateBroadcaster {
    pub fn new() -> Self {
        Self {
            weather_ready: Channel::new("weather_ready"),
            temperature_changed: Channel::new("temperature_changed"),
            season_changed: Channel::new("season_changed"),
        }
    }

    /// Listen for every new normalized snapshot.
    pub fn on_weather_ready(
        &self,
        callback: impl Fn(&Arc<WeatherSnapshot>) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Subscription {
        self.weather_ready.subscribe(callback)
    }

    /// Listen for temperature updates, in degrees Celsius.
    pub fn on_temperature_changed(
        &self,
        callback: impl Fn(&f64) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Subscription {
        self.temperature_changed.subscribe(callback)
    }

    /// Listen for season reclassifications.
    pub fn on_season_changed(
        &self,
        callback: impl Fn(&Season) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Subscription {
        self.season_changed.subscribe(callback)
    }

    pub fn publish_weather_ready(&self, snapshot: Arc<WeatherSnapshot>) {
        self.weather_ready.publish(snapshot);
    }

    pub fn publish_temperature_changed(&self, temperature_c: f64) {
        self.temperature_changed.publish(temperature_c);
    }

    pub fn publish_season_changed(&self, season: Season) {
        self.season_changed.publish(season);
    }

    /// The single retained latest snapshot, if any fetch has succeeded yet.
    pub fn latest_weather(&self) -> Option<Arc<WeatherSnapshot>> {
        self.weather_ready.latest()
    }

    pub fn latest_temperature(&self) -> Option<f64> {
        self.temperature_changed.latest()
    }

    pub fn latest_season(&self) -> Option<Season> {
        self.season_changed.latest()
    }
}

impl Default for UpdateBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UpdateBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateBroadcaster").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<f64>>>, impl Fn(&f64) -> anyhow::Result<()>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback = move |value: &f64| {
            sink.lock().expect("recorder lock").push(*value);
            Ok(())
        };
        (seen, callback)
    }

    #[test]
    fn replay_latest_on_subscribe() {
        let broadcaster = UpdateBroadcaster::new();
        broadcaster.publish_temperature_changed(18.5);

        let (seen, callback) = recorder();
        let _sub = broadcaster.on_temperature_changed(callback);

        assert_eq!(*seen.lock().expect("lock"), vec![18.5]);
    }

    #[test]
    fn no_replay_before_first_publish() {
        let broadcaster = UpdateBroadcaster::new();

        let (seen, callback) = recorder();
        let _sub = broadcaster.on_temperature_changed(callback);

        assert!(seen.lock().expect("lock").is_empty());
        assert!(broadcaster.latest_temperature().is_none());
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let broadcaster = UpdateBroadcaster::new();

        let (seen, callback) = recorder();
        let sub = broadcaster.on_temperature_changed(callback);

        sub.unsubscribe();
        sub.unsubscribe();

        broadcaster.publish_temperature_changed(21.0);
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[test]
    fn unsubscribe_removes_only_its_own_registration() {
        let broadcaster = UpdateBroadcaster::new();

        let (seen_a, callback_a) = recorder();
        let (seen_b, callback_b) = recorder();
        let sub_a = broadcaster.on_temperature_changed(callback_a);
        let _sub_b = broadcaster.on_temperature_changed(callback_b);

        sub_a.unsubscribe();
        broadcaster.publish_temperature_changed(7.0);

        assert!(seen_a.lock().expect("lock").is_empty());
        assert_eq!(*seen_b.lock().expect("lock"), vec![7.0]);
    }

    #[test]
    fn delivery_runs_in_registration_order() {
        let broadcaster = UpdateBroadcaster::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            let _ = broadcaster.on_season_changed(move |_| {
                order.lock().expect("lock").push(tag);
                Ok(())
            });
        }

        broadcaster.publish_season_changed(Season::Winter);
        assert_eq!(*order.lock().expect("lock"), vec!["first", "second", "third"]);
    }

    #[test]
    fn failing_callback_does_not_stop_delivery_or_unregister() {
        let broadcaster = UpdateBroadcaster::new();

        let failures = Arc::new(Mutex::new(0_u32));
        let failure_count = Arc::clone(&failures);
        let _failing = broadcaster.on_temperature_changed(move |_| {
            *failure_count.lock().expect("lock") += 1;
            anyhow::bail!("listener exploded")
        });

        let (seen, callback) = recorder();
        let _sub = broadcaster.on_temperature_changed(callback);

        broadcaster.publish_temperature_changed(1.0);
        broadcaster.publish_temperature_changed(2.0);

        // The failing callback ran both times (never unregistered) and the
        // healthy one still saw every publish.
        assert_eq!(*failures.lock().expect("lock"), 2);
        assert_eq!(*seen.lock().expect("lock"), vec![1.0, 2.0]);
    }

    #[test]
    fn callbacks_registered_during_publish_wait_for_the_next_one() {
        let broadcaster = Arc::new(UpdateBroadcaster::new());

        let late_seen = Arc::new(Mutex::new(Vec::new()));
        let registrar = Arc::clone(&broadcaster);
        let late_sink = Arc::clone(&late_seen);
        let registered = Arc::new(Mutex::new(false));
        let registered_flag = Arc::clone(&registered);

        let _sub = broadcaster.on_temperature_changed(move |_| {
            let mut done = registered_flag.lock().expect("lock");
            if !*done {
                *done = true;
                let sink = Arc::clone(&late_sink);
                // Leak the subscription on purpose: the handle is only for
                // unsubscribing and this listener stays for the test.
                std::mem::forget(registrar.on_temperature_changed(move |value| {
                    sink.lock().expect("lock").push(*value);
                    Ok(())
                }));
            }
            Ok(())
        });

        broadcaster.publish_temperature_changed(10.0);
        // The late subscriber replayed the just-published latest value but was
        // not part of the in-flight delivery snapshot.
        assert_eq!(*late_seen.lock().expect("lock"), vec![10.0]);

        broadcaster.publish_temperature_changed(11.0);
        assert_eq!(*late_seen.lock().expect("lock"), vec![10.0, 11.0]);
    }

    #[test]
    fn latest_value_is_replaced_before_listeners_run() {
        let broadcaster = Arc::new(UpdateBroadcaster::new());

        let observed = Arc::new(Mutex::new(None));
        let observer = Arc::clone(&broadcaster);
        let slot = Arc::clone(&observed);
        let _sub = broadcaster.on_temperature_changed(move |_| {
            *slot.lock().expect("lock") = observer.latest_temperature();
            Ok(())
        });

        broadcaster.publish_temperature_changed(3.5);
        assert_eq!(*observed.lock().expect("lock"), Some(3.5));
    }
}
