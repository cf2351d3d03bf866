mod generator;
mod parameter;
mod real_time;

pub use generator::Generator;
pub use parameter::{
    sweep_rate, ChirpParameters, ParameterError, SineParameters, DEFAULT_ANGULAR_FREQUENCY,
    DEFAULT_CHIRP_PERIOD, MICROS_PER_SECOND,
};
pub use real_time::{
    Command, Injector, InjectorError, InjectorHandle, MicroClock, Mix, DEFAULT_STALL_TIMEOUT,
};

// TYPES
use ringbuf::{Consumer, Producer, SharedRb};
use std::mem::MaybeUninit;
use std::sync::Arc;

/// Alias for the ring buffer consumer reading injected samples
pub type SampleConsumer = Consumer<i32, Arc<SharedRb<i32, Vec<MaybeUninit<i32>>>>>;
/// Alias for the ring buffer producer an injector writes to
pub type SampleProducer = Producer<i32, Arc<SharedRb<i32, Vec<MaybeUninit<i32>>>>>;
