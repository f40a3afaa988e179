//! Best-effort "open the app, otherwise the web page" navigation.
//!
//! On mobile the app URI is handed to a transient hidden surface, then three
//! events race: the page losing focus (an app took over), the fallback delay
//! elapsing, and an outer safety timeout. The first one resolves an
//! [`AppOpenRace`]; the others are dropped with the `select!` that lost.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hkmp_core::analytics::track_navigation_click;
use hkmp_core::{AppConfig, ParkingPoint, SharedAnalytics};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::device::DeviceClass;
use crate::links::NavigationTarget;

/// The side effects a UI host performs on behalf of the orchestrator.
pub trait NavigationHost: Send + Sync {
    /// Mounts the hidden navigation surface pointed at `app_uri`.
    fn launch_app(&self, app_uri: &str);

    /// Opens `web_uri` in a new browsing context.
    fn open_web(&self, web_uri: &str);

    /// Tears down the hidden navigation surface.
    fn remove_surface(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenTimings {
    /// How long to wait for an app to take focus before opening the web fallback.
    pub fallback_delay: Duration,
    /// Upper bound on the lifetime of the hidden surface.
    pub safety_timeout: Duration,
}

impl Default for OpenTimings {
    fn default() -> Self {
        Self {
            fallback_delay: Duration::from_millis(1500),
            safety_timeout: Duration::from_millis(3000),
        }
    }
}

impl OpenTimings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fallback_delay: config.app_fallback_delay(),
            safety_timeout: config.app_safety_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceEvent {
    FocusLost,
    FallbackElapsed,
    SafetyTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceState {
    Armed,
    Resolved(RaceEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceAction {
    /// Nobody took focus in time: open the web fallback, then clean up.
    OpenWebFallback,
    CleanupOnly,
}

/// Two-state machine: the first event resolves it, every later one is ignored.
#[derive(Debug)]
pub struct AppOpenRace {
    state: RaceState,
}

impl AppOpenRace {
    #[must_use]
    pub fn armed() -> Self {
        Self {
            state: RaceState::Armed,
        }
    }

    #[must_use]
    pub fn state(&self) -> RaceState {
        self.state
    }

    /// Returns the action to take, or `None` if the race was already resolved.
    pub fn resolve(&mut self, event: RaceEvent) -> Option<RaceAction> {
        match self.state {
            RaceState::Resolved(_) => None,
            RaceState::Armed => {
                self.state = RaceState::Resolved(event);
                Some(match event {
                    RaceEvent::FallbackElapsed => RaceAction::OpenWebFallback,
                    RaceEvent::FocusLost | RaceEvent::SafetyTimeout => RaceAction::CleanupOnly,
                })
            }
        }
    }
}

/// Guard over the hidden navigation surface. Removal is idempotent and also
/// happens on drop, so a cancelled orchestration never leaks the surface.
pub struct TransientSurface<'a, H: NavigationHost + ?Sized> {
    host: &'a H,
    mounted: bool,
}

impl<'a, H: NavigationHost + ?Sized> TransientSurface<'a, H> {
    pub fn mount(host: &'a H, app_uri: &str) -> Self {
        host.launch_app(app_uri);
        Self {
            host,
            mounted: true,
        }
    }

    pub fn remove(&mut self) {
        if std::mem::take(&mut self.mounted) {
            self.host.remove_surface();
        }
    }
}

impl<H: NavigationHost + ?Sized> Drop for TransientSurface<'_, H> {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Sending half of a focus-lost signal. Dropping it without calling
/// [`FocusNotifier::notify`] means focus is never reported lost.
#[derive(Debug)]
pub struct FocusNotifier(oneshot::Sender<()>);

impl FocusNotifier {
    pub fn notify(self) {
        // The receiver is gone once the race has resolved; nothing to do then.
        let _ = self.0.send(());
    }
}

/// Creates a focus-lost signal for [`open_navigation`].
pub fn focus_channel() -> (FocusNotifier, impl Future<Output = ()> + Send + 'static) {
    let (tx, rx) = oneshot::channel();
    let focus_lost = async move {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    (FocusNotifier(tx), focus_lost)
}

/// Navigates to `target`. Desktop opens the web URI directly; mobile tries the
/// app first and falls back after `timings.fallback_delay` unless
/// `focus_lost` completes first.
pub async fn open_navigation<H, F>(
    host: &H,
    device: DeviceClass,
    target: &NavigationTarget,
    timings: OpenTimings,
    focus_lost: F,
) where
    H: NavigationHost + ?Sized,
    F: Future<Output = ()>,
{
    if !device.is_mobile() {
        tracing::debug!(provider = %target.provider, web_uri = %target.web_uri, "desktop: opening web fallback");
        host.open_web(&target.web_uri);
        return;
    }

    let mut race = AppOpenRace::armed();
    let mut surface = TransientSurface::mount(host, &target.app_uri);
    tracing::debug!(provider = %target.provider, %device, app_uri = %target.app_uri, "attempting app deep link");

    let event = tokio::select! {
        biased;
        () = focus_lost => RaceEvent::FocusLost,
        () = tokio::time::sleep(timings.fallback_delay) => RaceEvent::FallbackElapsed,
        () = tokio::time::sleep(timings.safety_timeout) => RaceEvent::SafetyTimeout,
    };

    match race.resolve(event) {
        Some(RaceAction::OpenWebFallback) => {
            tracing::info!(provider = %target.provider, web_uri = %target.web_uri, "no app took focus; opening web fallback");
            surface.remove();
            host.open_web(&target.web_uri);
        }
        Some(RaceAction::CleanupOnly) => {
            tracing::debug!(provider = %target.provider, ?event, "app open resolved");
            surface.remove();
        }
        None => {}
    }
}

/// Fire-and-forget variant of [`open_navigation`].
pub fn spawn_navigation<H, F>(
    host: Arc<H>,
    device: DeviceClass,
    target: NavigationTarget,
    timings: OpenTimings,
    focus_lost: F,
) -> JoinHandle<()>
where
    H: NavigationHost + ?Sized + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        open_navigation(host.as_ref(), device, &target, timings, focus_lost).await;
    })
}

/// Binds a host, timings, and analytics sink for repeated navigation requests.
pub struct Navigator<H: NavigationHost + ?Sized> {
    host: Arc<H>,
    timings: OpenTimings,
    analytics: SharedAnalytics,
}

impl<H: NavigationHost + ?Sized + 'static> Navigator<H> {
    pub fn new(host: Arc<H>, timings: OpenTimings, analytics: SharedAnalytics) -> Self {
        Self {
            host,
            timings,
            analytics,
        }
    }

    /// Records a `navigation_click` event, then navigates.
    pub async fn open<F>(
        &self,
        point: &ParkingPoint,
        target: &NavigationTarget,
        device: DeviceClass,
        focus_lost: F,
    ) where
        F: Future<Output = ()>,
    {
        track_navigation_click(self.analytics.as_ref(), target.provider.slug(), point);
        open_navigation(self.host.as_ref(), device, target, self.timings, focus_lost).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use hkmp_core::MemoryAnalytics;

    use super::*;
    use crate::links::build_targets;
    use crate::provider::ProviderId;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Launch(String),
        Web(String),
        Remove,
    }

    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingHost {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl NavigationHost for RecordingHost {
        fn launch_app(&self, app_uri: &str) {
            self.calls.lock().unwrap().push(Call::Launch(app_uri.to_owned()));
        }

        fn open_web(&self, web_uri: &str) {
            self.calls.lock().unwrap().push(Call::Web(web_uri.to_owned()));
        }

        fn remove_surface(&self) {
            self.calls.lock().unwrap().push(Call::Remove);
        }
    }

    fn waze(device: DeviceClass) -> NavigationTarget {
        let point = ParkingPoint::new("Test", 22.3193, 114.1694).unwrap();
        build_targets(&point, "Test", device)[&ProviderId::Waze].clone()
    }

    #[test]
    fn race_resolves_exactly_once() {
        let mut race = AppOpenRace::armed();
        assert_eq!(race.state(), RaceState::Armed);
        assert_eq!(
            race.resolve(RaceEvent::FallbackElapsed),
            Some(RaceAction::OpenWebFallback)
        );
        assert_eq!(race.resolve(RaceEvent::FocusLost), None);
        assert_eq!(race.resolve(RaceEvent::SafetyTimeout), None);
        assert_eq!(
            race.state(),
            RaceState::Resolved(RaceEvent::FallbackElapsed)
        );
    }

    #[test]
    fn focus_and_safety_only_clean_up() {
        assert_eq!(
            AppOpenRace::armed().resolve(RaceEvent::FocusLost),
            Some(RaceAction::CleanupOnly)
        );
        assert_eq!(
            AppOpenRace::armed().resolve(RaceEvent::SafetyTimeout),
            Some(RaceAction::CleanupOnly)
        );
    }

    #[test]
    fn surface_removal_is_idempotent() {
        let host = RecordingHost::default();
        {
            let mut surface = TransientSurface::mount(&host, "waze://x");
            surface.remove();
            surface.remove();
        }
        assert_eq!(
            host.calls(),
            vec![Call::Launch("waze://x".to_owned()), Call::Remove]
        );
    }

    #[test]
    fn dropping_surface_removes_it() {
        let host = RecordingHost::default();
        drop(TransientSurface::mount(&host, "waze://x"));
        assert_eq!(host.calls().last(), Some(&Call::Remove));
    }

    #[tokio::test(start_paused = true)]
    async fn desktop_opens_web_once_without_app_attempt() {
        let host = RecordingHost::default();
        let target = waze(DeviceClass::Desktop);
        open_navigation(
            &host,
            DeviceClass::Desktop,
            &target,
            OpenTimings::default(),
            std::future::pending(),
        )
        .await;
        assert_eq!(host.calls(), vec![Call::Web(target.web_uri)]);
    }

    #[tokio::test(start_paused = true)]
    async fn mobile_without_focus_loss_falls_back_after_delay() {
        let host = RecordingHost::default();
        let target = waze(DeviceClass::Android);
        let started = tokio::time::Instant::now();
        open_navigation(
            &host,
            DeviceClass::Android,
            &target,
            OpenTimings::default(),
            std::future::pending(),
        )
        .await;
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert_eq!(
            host.calls(),
            vec![
                Call::Launch(target.app_uri.clone()),
                Call::Remove,
                Call::Web(target.web_uri.clone()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn focus_loss_before_delay_skips_web_fallback() {
        let host = RecordingHost::default();
        let target = waze(DeviceClass::Ios);
        let (notifier, focus_lost) = focus_channel();
        let blur = async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            notifier.notify();
        };
        let ((), ()) = tokio::join!(
            open_navigation(
                &host,
                DeviceClass::Ios,
                &target,
                OpenTimings::default(),
                focus_lost
            ),
            blur
        );
        assert_eq!(
            host.calls(),
            vec![Call::Launch(target.app_uri.clone()), Call::Remove]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_notifier_means_focus_never_lost() {
        let host = RecordingHost::default();
        let target = waze(DeviceClass::Ios);
        let (notifier, focus_lost) = focus_channel();
        drop(notifier);
        open_navigation(
            &host,
            DeviceClass::Ios,
            &target,
            OpenTimings::default(),
            focus_lost,
        )
        .await;
        assert_eq!(host.calls().last(), Some(&Call::Web(target.web_uri)));
    }

    #[tokio::test(start_paused = true)]
    async fn safety_timeout_first_cleans_up_without_web() {
        let host = RecordingHost::default();
        let target = waze(DeviceClass::Android);
        let timings = OpenTimings {
            fallback_delay: Duration::from_secs(5),
            safety_timeout: Duration::from_secs(1),
        };
        open_navigation(
            &host,
            DeviceClass::Android,
            &target,
            timings,
            std::future::pending(),
        )
        .await;
        assert_eq!(
            host.calls(),
            vec![Call::Launch(target.app_uri.clone()), Call::Remove]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_navigation_still_removes_surface() {
        let host = RecordingHost::default();
        let target = waze(DeviceClass::Android);
        let result = tokio::time::timeout(
            Duration::from_millis(100),
            open_navigation(
                &host,
                DeviceClass::Android,
                &target,
                OpenTimings::default(),
                std::future::pending(),
            ),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(
            host.calls(),
            vec![Call::Launch(target.app_uri.clone()), Call::Remove]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_navigation_runs_to_completion() {
        let host = Arc::new(RecordingHost::default());
        let target = waze(DeviceClass::Desktop);
        spawn_navigation(
            Arc::clone(&host),
            DeviceClass::Desktop,
            target.clone(),
            OpenTimings::default(),
            std::future::pending(),
        )
        .await
        .unwrap();
        assert_eq!(host.calls(), vec![Call::Web(target.web_uri)]);
    }

    #[tokio::test(start_paused = true)]
    async fn navigator_tracks_click_before_navigating() {
        let host = Arc::new(RecordingHost::default());
        let analytics = Arc::new(MemoryAnalytics::new());
        let navigator = Navigator::new(
            Arc::clone(&host),
            OpenTimings::default(),
            analytics.clone(),
        );
        let point = ParkingPoint::new("Test", 22.3193, 114.1694).unwrap();
        let target = waze(DeviceClass::Desktop);
        navigator
            .open(&point, &target, DeviceClass::Desktop, std::future::pending())
            .await;

        assert_eq!(analytics.actions(), vec!["navigation_click"]);
        assert_eq!(analytics.events()[0].payload["app_name"], "waze");
        assert_eq!(host.calls().len(), 1);
    }
}
