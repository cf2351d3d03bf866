//! Test signals for system identification.
//!
//! A *sine* excites a system at a single frequency and a logarithmic *chirp* sweeps a range
//! of frequencies, repeating every period. Both are evaluated at a timestamp in
//! microseconds, which is how a fixed-rate control loop keeps time.
//!
//! * [bundled_signals] holds the evaluation functions and the generators built on them.
//! * [signal] holds the parameter sets, the [Generator](signal::Generator) trait and the
//! real time [Injector](signal::Injector) that can be reconfigured from other threads.
//! * [profile_yaml] loads injection profiles and [recorder] stores an injection as WAV.
pub mod bundled_signals;
pub mod profile_yaml;
pub mod recorder;
pub mod signal;

pub use bundled_signals::{configure_chirp, configure_sine, evaluate_chirp, evaluate_sine};
pub use signal::{ChirpParameters, SineParameters};
