//! Genesis Canvas: a freehand drawing surface with blob-URI import/export and
//! generative canvas expansion.  The desktop shell lives in `app`; everything
//! else runs headless.

pub mod logger;

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod host;
pub mod io;
pub mod ops;
pub mod surface;

pub use canvas::{CanvasHandle, PendingLoad, SurfaceConfig, SurfaceError, SurfaceState};
pub use host::CanvasHost;
pub use surface::{DrawingSurface, SurfaceProps};
