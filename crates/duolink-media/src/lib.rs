// Media stream model and capture-device seam for the Duolink coordinator.

pub mod devices;
pub mod sim;
pub mod tracks;

pub use devices::{
    AudioConstraints, DeviceCommand, DeviceEvent, DevicesHandle, MediaConstraints,
    VideoConstraints,
};
pub use sim::{spawn_sim_devices, SimDeviceControl};
pub use tracks::{MediaStream, MediaTrack, StreamId, TrackId, TrackKind, TrackSource};
