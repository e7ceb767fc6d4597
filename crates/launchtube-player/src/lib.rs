pub mod controller;
pub mod error;
pub mod ipc;
pub mod webhook;

pub use controller::{PlayRequest, PlayerConfig, PlayerController, PlayerState, PlaylistItem};
pub use error::{Error, Result};
pub use ipc::ControlChannel;
pub use webhook::WebhookDescriptor;
