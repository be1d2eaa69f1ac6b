//! Specialist layer: detector contract, raw-signal normalization, and
//! the bounded-parallel fan-out registry.

pub mod detectors;
pub mod normalize;
pub mod registry;
pub mod signal;
pub mod specialist;

pub use detectors::{DonchianBreakoutDetector, EmaTrendRider, PulseScalper, RsiFadeDetector};
pub use normalize::normalize;
pub use registry::SpecialistRegistry;
pub use signal::{RawSignal, RawSignals};
pub use specialist::{DetectContext, Specialist, SpecialistDescriptor};
