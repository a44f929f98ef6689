//! Orchestration state machine: one per wall region.
//!
//! The [`Machine`] decides *how* to get a region from one module to the
//! next safely; an external scheduler decides *what* and *when*. Its
//! lifecycle is a deadline-driven finite state machine:
//!
//! ```text
//!           nextModule                 ready | timeout
//!   Idle ───────────────► Prepare ───────────────────► Transition
//!    ▲                      │  ▲ nextModule               │   │ fade end,
//!    │ stop (any state)     │  └───(supersede,            │   │ buffered?
//!    │                      │       same outgoing)        │   ▼
//!    │                      │                  ┌──────────┘  Prepare
//!    │                      ▼                  ▼
//!    │                    stop              Display ──nextModule──► Prepare
//!    │                                         │
//!    └─────────────────────────────────────────┘
//!
//!   any state ──handleError──► Error (sink; only restart_after_error
//!                                     leads back to Idle)
//! ```
//!
//! ## Rules
//! - **Single-threaded per region**: every request and timer callback is a
//!   command handled to completion by one driver task; a new state's enter
//!   only begins after the previous state's exit (timers cancelled).
//! - **Two-timer transition**: the visible cross-fade starts exactly at
//!   the deadline and lasts a fixed window, decoupling "how long did
//!   loading take" from "how long does the fade look".
//! - **Stale timers never fire into a machine that moved on**: each armed
//!   timer holds the owning state's cancellation token *and* a generation
//!   stamp checked by the driver.
//! - Every transition publishes a monitoring [`Event`](crate::events::Event);
//!   no subscriber, no effect on control flow.

mod driver;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use std::sync::Arc;

use crate::context::WallContext;
use crate::error::WallError;
use crate::geometry::Polygon;
use crate::library::ModuleDescriptor;

use driver::Driver;

/// Commands processed by a machine's driver task.
///
/// External requests and internal timer callbacks travel the same queue,
/// which is what serializes them. Internal commands carry the generation
/// of the state that armed them.
pub(crate) enum Command {
    NextModule {
        descriptor: ModuleDescriptor,
        deadline: u64,
    },
    Stop {
        deadline: u64,
    },
    HandleError {
        error: WallError,
    },
    Restart,
    PrepareDone {
        generation: u64,
        result: Result<(), WallError>,
    },
    PrepareTimeout {
        generation: u64,
    },
    FadeStart {
        generation: u64,
    },
    FadeEnd {
        generation: u64,
    },
}

/// Handle to one region's orchestration machine.
///
/// All methods are non-blocking: they enqueue a command for the region's
/// driver task. Dropping the handle shuts the driver down and disposes
/// whatever the region still holds.
pub struct Machine {
    tx: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
    region: Arc<str>,
}

impl Machine {
    /// Spawns the driver task for a region and returns its handle.
    pub fn spawn(ctx: Arc<WallContext>, geometry: Polygon) -> Self {
        let region: Arc<str> = Arc::from(geometry.extents().fingerprint());
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let driver = Driver::new(
            ctx,
            geometry,
            Arc::clone(&region),
            tx.clone(),
            rx,
            shutdown.clone(),
        );
        tokio::spawn(driver.run());
        Self {
            tx,
            shutdown,
            region,
        }
    }

    /// Region label (geometry extents fingerprint).
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Asks the region to show `descriptor`, fading in at `deadline`.
    pub fn next_module(&self, descriptor: ModuleDescriptor, deadline: u64) {
        let _ = self.tx.send(Command::NextModule {
            descriptor,
            deadline,
        });
    }

    /// Asks the region to go blank by `deadline`.
    pub fn stop(&self, deadline: u64) {
        let _ = self.tx.send(Command::Stop { deadline });
    }

    /// Reports an unrecoverable error: the region quiesces into the
    /// `Error` sink state instead of crashing the process.
    pub fn handle_error(&self, error: WallError) {
        let _ = self.tx.send(Command::HandleError { error });
    }

    /// Externally restarts a machine out of the `Error` sink.
    pub fn restart_after_error(&self) {
        let _ = self.tx.send(Command::Restart);
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests;
