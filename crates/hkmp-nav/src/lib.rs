pub mod device;
pub mod links;
pub mod open;
pub mod provider;

pub use device::{classify_device, DeviceClass, DeviceSignals};
pub use links::{build_targets, LinkResolver, NavigationTarget};
pub use open::{
    focus_channel, open_navigation, spawn_navigation, AppOpenRace, FocusNotifier,
    NavigationHost, Navigator, OpenTimings, RaceAction, RaceEvent, RaceState, TransientSurface,
};
pub use provider::ProviderId;
