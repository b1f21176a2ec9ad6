//! Host-application integration points.
//!
//! The agent is embedded in a host UI it does not own. Navigation and
//! speech are fire-and-forget requests handed across this seam; the host
//! decides whether and how to honor them.

use tracing::info;

use crate::conversation::Persona;
use crate::policy::UiMode;

/// Asks the host to move the user to another route.
pub trait Navigator: Send + Sync {
    fn go_to(&self, path: &str);
}

/// Asks the host to speak a line out loud. Delivery is best-effort; the
/// agent never blocks on it, and the transcript is the source of truth
/// either way.
pub trait Voice: Send + Sync {
    fn speak(&self, text: &str, persona: Persona, mode: UiMode);
}

/// Headless host: logs navigation requests and drops speech. Used by the
/// demo binary and tests.
#[derive(Debug, Default)]
pub struct NoopHost;

impl Navigator for NoopHost {
    fn go_to(&self, path: &str) {
        info!(%path, "Navigation requested");
    }
}

impl Voice for NoopHost {
    fn speak(&self, _text: &str, _persona: Persona, _mode: UiMode) {}
}
