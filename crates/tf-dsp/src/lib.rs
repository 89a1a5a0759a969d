//! tf-dsp: Synthesis primitives for the Thunderfall audio middleware
//!
//! Everything in this crate is a pure generator or evaluator:
//! - Oscillators and LFSR noise (phase-accumulated, allocation free)
//! - Piecewise ramp envelopes with linear/exponential segments
//! - One-pole lowpass for coloring noise bursts
//! - Equal-power stereo pan law
//!
//! No state outlives the owning voice; nothing here allocates after
//! construction, so all of it is safe to run inside the render callback.

mod curve;
mod envelope;
mod filter;
mod osc;
mod pan;

pub use curve::*;
pub use envelope::*;
pub use filter::*;
pub use osc::*;
pub use pan::*;
