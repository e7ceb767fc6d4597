pub mod assets;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod scripts;
pub mod server;
pub mod state;

pub use assets::AssetResolver;
pub use error::ApiError;
pub use routes::create_router;
pub use server::{PORT_CANDIDATES, bind_first_available, serve};
pub use state::{AppState, SharedState};
