//! Shared test doubles for the Storyfill game engine.

mod clock;
mod render;
mod repository;
mod rng;

pub use clock::FixedClock;
pub use render::RecordingRenderSink;
pub use repository::{FailingSessionRepository, InMemorySessionRepository};
pub use rng::{MockRng, SequenceRng};
