pub mod gate;
pub mod guard;
pub mod response;
pub mod writer;

pub use gate::{Gate, GateFuture, HandlerFuture};
pub use guard::{Anonymous, AuthGuard, Guard, GuardError};
pub use response::Envelope;
pub use writer::{PendingResponse, ResponseWriter, TransportOptions};
