//! Client-side half of the authorization subsystem: the observable session store
//! and the render-time guards that react to it.

pub mod guard;
pub mod store;

pub use guard::{Guard, GuardView, MountedGuard, Navigator, Requirement};
pub use store::{ClientError, HttpSessionSource, SessionSource, SessionStore};
