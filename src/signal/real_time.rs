use crate::bundled_signals::{ChirpGenerator, SineGenerator};
use crate::signal::{ChirpParameters, Generator, SampleProducer, SineParameters};
use crossbeam::channel::{Receiver, Sender, TryRecvError};
use simplelog::{debug, info, warn};
use std::thread::sleep;
use std::time::{Duration, Instant};

use thiserror::Error;

/// How long [Injector::run] waits for the consumer when the ring buffer is full.
const FULL_BUFFER_BACKOFF: Duration = Duration::from_millis(5);
/// How long [Injector::run] waits on a full buffer before giving up on the consumer.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InjectorError {
    #[error("Producer full in injector {0}")]
    ProducerFull(String),
    #[error("Injector {0} has been stopped")]
    Stopped(String),
    #[error("Injector is no longer listening for commands")]
    Disconnected,
    #[error("Consumer of injector {0} stopped reading for {1:?}")]
    ConsumerStalled(String, Duration),
}

/// Which generator feeds the output of an [Injector].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mix {
    #[default]
    Sine,
    Chirp,
    /// Both outputs added together, saturating at the bounds of `i32`.
    Sum,
}

/// Messages accepted by a running [Injector]. Parameters always travel as a whole struct so
/// the control loop swaps them in one step between two ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    ConfigureSine(SineParameters),
    ConfigureChirp(ChirpParameters),
    Select(Mix),
    Stop,
}

/// The sending side of an injector's command channel. It can be cloned and moved to any
/// thread that needs to reconfigure the signal while it is being injected.
#[derive(Debug, Clone)]
pub struct InjectorHandle {
    sender: Sender<Command>,
}

impl InjectorHandle {
    pub fn send(&self, command: Command) -> Result<(), InjectorError> {
        self.sender
            .send(command)
            .map_err(|_| InjectorError::Disconnected)
    }

    pub fn configure_sine(
        &self,
        amplitude: i32,
        frequency: f64,
        offset: i32,
    ) -> Result<(), InjectorError> {
        self.send(Command::ConfigureSine(SineParameters::new(
            amplitude, frequency, offset,
        )))
    }

    pub fn configure_chirp(
        &self,
        amplitude: i32,
        start_freq: f64,
        stop_freq: f64,
        period: i32,
        offset: i32,
    ) -> Result<(), InjectorError> {
        self.send(Command::ConfigureChirp(ChirpParameters::new(
            amplitude, start_freq, stop_freq, period, offset,
        )))
    }

    pub fn select(&self, mix: Mix) -> Result<(), InjectorError> {
        self.send(Command::Select(mix))
    }

    pub fn stop(&self) -> Result<(), InjectorError> {
        self.send(Command::Stop)
    }
}

/// The control loop of a signal injection.
///
/// On every [tick](fn@Injector::tick) the injector applies the commands received since the
/// previous tick, evaluates the selected generator(s) at the current time of its
/// [MicroClock] and delivers the value through the *producer* of a ring buffer. The
/// *consumer* of that buffer belongs to whatever drives the hardware or logs the signal.
///
/// Configuration changes only ever happen between two evaluations, so a sample is never
/// computed from a half-updated parameter set.
pub struct Injector {
    name: String,
    clock: MicroClock,
    sine: SineGenerator,
    chirp: ChirpGenerator,
    mix: Mix,
    commands: Receiver<Command>,
    producer: SampleProducer,
    running: bool,
    stall_timeout: Duration,
}

impl Injector {
    /// Creates an injector with default (silent) generators and the handle to command it.
    ///
    /// # Arguments
    /// * `name` - Identifier of the injector, used in logs and errors.
    /// * `step` - Microseconds between two ticks.
    /// * `producer` - Where the samples go.
    pub fn new(name: &str, step: u64, producer: SampleProducer) -> (Self, InjectorHandle) {
        let (sender, commands) = crossbeam::channel::unbounded();

        let injector = Self {
            name: name.to_string(),
            clock: MicroClock::new(step),
            sine: SineGenerator::default(),
            chirp: ChirpGenerator::default(),
            mix: Mix::default(),
            commands,
            producer,
            running: true,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        };

        (injector, InjectorHandle { sender })
    }

    /// Applies every command waiting in the channel, in the order they were sent.
    ///
    /// # Returns
    /// The amount of commands applied.
    pub fn apply_pending(&mut self) -> usize {
        let mut count = 0;

        loop {
            match self.commands.try_recv() {
                Ok(command) => {
                    self.apply(command);
                    count += 1;
                }
                // With every handle gone the last configuration simply stays in place
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        count
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::ConfigureSine(parameters) => {
                debug!("<b>{}</>: sine reconfigured to {:?}", self.name, parameters);
                self.sine.set_parameters(parameters);
            }
            Command::ConfigureChirp(parameters) => {
                debug!("<b>{}</>: chirp reconfigured to {:?}", self.name, parameters);
                self.chirp.set_parameters(parameters);
            }
            Command::Select(mix) => {
                debug!("<b>{}</>: output switched to {:?}", self.name, mix);
                self.mix = mix;
            }
            Command::Stop => {
                info!("<b>Injector <cyan>{}</> <b>stopped.</>", self.name);
                self.running = false;
            }
        }
    }

    /// Output of the injector at `t` microseconds for the current configuration.
    pub fn output_at(&self, t: u64) -> i32 {
        match self.mix {
            Mix::Sine => self.sine.evaluate(t),
            Mix::Chirp => self.chirp.evaluate(t),
            Mix::Sum => self.sine.evaluate(t).saturating_add(self.chirp.evaluate(t)),
        }
    }

    /// Produces one sample.
    ///
    /// The clock only moves forward when the sample was delivered, so a tick rejected
    /// because of a full buffer can simply be retried.
    pub fn tick(&mut self) -> Result<i32, InjectorError> {
        self.apply_pending();

        if !self.running {
            return Err(InjectorError::Stopped(self.name.clone()));
        }

        if self.producer.is_full() {
            warn!("<b>Buffer <yellow>full</><b> in injector.</>");
            warn!("  |_ name: {}", self.name);
            return Err(InjectorError::ProducerFull(self.name.clone()));
        }

        let value = self.output_at(self.clock.get_value());
        self.producer
            .push(value)
            .map_err(|_| InjectorError::ProducerFull(self.name.clone()))?;

        // POST OPERATIONS
        self.clock.inc();

        Ok(value)
    }

    /// Keeps ticking until `ticks` samples have been delivered, waiting for the consumer
    /// whenever the buffer is full.
    ///
    /// # Returns
    /// The amount of samples delivered, or the error that interrupted the run. A buffer
    /// that stays full for longer than the stall timeout ends the run with
    /// [InjectorError::ConsumerStalled].
    pub fn run(&mut self, ticks: u64) -> Result<u64, InjectorError> {
        let mut count = 0;
        let mut full_since: Option<Instant> = None;

        while count < ticks {
            if self.producer.is_full() {
                let since = *full_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= self.stall_timeout {
                    warn!("<b>Consumer <yellow>stalled</><b>, giving up.</>");
                    warn!("  |_ name: {}", self.name);
                    warn!("  |_ delivered: {} of {}", count, ticks);
                    return Err(InjectorError::ConsumerStalled(
                        self.name.clone(),
                        self.stall_timeout,
                    ));
                }
                sleep(FULL_BUFFER_BACKOFF);
            } else {
                full_since = None;
                self.tick()?;
                count += 1;
            }
        }

        Ok(count)
    }

    pub fn set_stall_timeout(&mut self, timeout: Duration) {
        self.stall_timeout = timeout;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_mix(&self) -> Mix {
        self.mix
    }

    pub fn get_clock(&self) -> &MicroClock {
        &self.clock
    }

    pub fn get_sine(&self) -> &SineGenerator {
        &self.sine
    }

    pub fn get_chirp(&self) -> &ChirpGenerator {
        &self.chirp
    }
}

/// A structure with some bundled methods to easily manage time synchronization.
///
/// The clock counts microseconds and advances by a fixed step. It wraps around at the end
/// of the `u64` range instead of overflowing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroClock {
    tick: u64,
    step: u64,
}

impl MicroClock {
    pub fn new(step: u64) -> Self {
        Self { tick: 0, step }
    }

    pub fn new_at(step: u64, start_at: u64) -> Self {
        Self {
            tick: start_at,
            step,
        }
    }

    pub fn get_value(&self) -> u64 {
        self.tick
    }

    pub fn get_step(&self) -> u64 {
        self.step
    }

    /// Tick rate in Hz.
    pub fn get_rate(&self) -> f64 {
        1.0e6 / self.step as f64
    }

    pub fn inc(&mut self) -> u64 {
        let prev = self.tick;
        self.tick = self.tick.wrapping_add(self.step);
        prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundled_signals::{evaluate_chirp, evaluate_sine};
    use crate::signal::{sweep_rate, SampleConsumer};
    use ringbuf::HeapRb;
    use std::thread;

    fn get_injector(capacity: usize, step: u64) -> (Injector, InjectorHandle, SampleConsumer) {
        let ring_buffer: HeapRb<i32> = HeapRb::new(capacity);
        let (producer, consumer) = ring_buffer.split();
        let (injector, handle) = Injector::new("Test", step, producer);

        (injector, handle, consumer)
    }

    mod clock_tests {
        use super::*;

        #[test]
        fn test_inc() {
            let mut clock = MicroClock::new(250);

            assert_eq!(clock.inc(), 0);
            assert_eq!(clock.inc(), 250);
            assert_eq!(clock.get_value(), 500);
        }

        #[test]
        fn test_new_at() {
            let mut clock = MicroClock::new_at(1000, 42);

            assert_eq!(clock.inc(), 42);
            assert_eq!(clock.get_value(), 1042);
            assert_eq!(clock.get_step(), 1000);
        }

        #[test]
        fn test_wraparound() {
            let mut clock = MicroClock::new_at(10, u64::MAX - 5);

            assert_eq!(clock.inc(), u64::MAX - 5);
            assert_eq!(clock.get_value(), 4);
        }

        #[test]
        fn test_rate() {
            assert_eq!(MicroClock::new(1000).get_rate(), 1000.0);
            assert_eq!(MicroClock::new(1).get_rate(), 1_000_000.0);
        }
    }

    mod injector_tests {
        use super::*;

        #[test]
        fn test_default_output_is_silent() {
            let (mut injector, _handle, mut consumer) = get_injector(8, 1000);

            for _ in 0..4 {
                assert_eq!(injector.tick().unwrap(), 0);
            }
            for _ in 0..4 {
                assert_eq!(consumer.pop(), Some(0));
            }
            assert_eq!(consumer.pop(), None);
        }

        #[test]
        fn test_sine_samples() {
            let (mut injector, handle, mut consumer) = get_injector(16, 125);
            let expected = SineParameters::new(100, 1.0, 0);

            handle.configure_sine(100, 1.0, 0).unwrap();
            for _ in 0..8 {
                injector.tick().unwrap();
            }

            assert_eq!(injector.get_sine().get_parameters(), &expected);
            for index in 0..8u64 {
                assert_eq!(
                    consumer.pop().unwrap(),
                    evaluate_sine(&expected, index * 125),
                    "Sample {} mismatch",
                    index
                );
            }
            assert_eq!(injector.get_clock().get_value(), 1000);
        }

        #[test]
        fn test_select_and_sum() {
            let (mut injector, handle, mut consumer) = get_injector(4, 1000);

            handle.configure_sine(0, 0.0, i32::MAX).unwrap();
            handle.configure_chirp(20, 1.0, 2.0, 10, 10).unwrap();

            handle.select(Mix::Chirp).unwrap();
            assert_eq!(injector.tick().unwrap(), 10);
            assert_eq!(injector.get_mix(), Mix::Chirp);

            handle.select(Mix::Sum).unwrap();
            injector.tick().unwrap();
            assert_eq!(consumer.pop(), Some(10));
            assert_eq!(consumer.pop(), Some(i32::MAX), "Sum should saturate");
        }

        #[test]
        fn test_commands_apply_in_order() {
            let (mut injector, handle, _consumer) = get_injector(4, 1000);

            handle.configure_sine(1, 1.0, 1).unwrap();
            handle.configure_sine(2, 2.0, 2).unwrap();
            handle.configure_sine(3, 3.0, 3).unwrap();

            assert_eq!(injector.apply_pending(), 3);
            assert_eq!(
                injector.get_sine().get_parameters(),
                &SineParameters::new(3, 3.0, 3)
            );
            assert_eq!(injector.apply_pending(), 0);
        }

        #[test]
        fn test_producer_full() {
            let (mut injector, _handle, mut consumer) = get_injector(2, 1000);

            injector.tick().unwrap();
            injector.tick().unwrap();

            match injector.tick() {
                Err(InjectorError::ProducerFull(name)) => assert_eq!(name, "Test"),
                other => panic!("Expected a full buffer, got {:?}", other),
            }
            assert_eq!(injector.get_clock().get_value(), 2000, "Clock moved on failure");

            consumer.pop().unwrap();
            assert!(injector.tick().is_ok());
        }

        #[test]
        fn test_stop() {
            let (mut injector, handle, _consumer) = get_injector(2, 1000);

            handle.stop().unwrap();

            assert!(matches!(injector.tick(), Err(InjectorError::Stopped(_))));
            assert!(!injector.is_running());
        }

        #[test]
        fn test_handle_after_injector_dropped() {
            let (injector, handle, _consumer) = get_injector(2, 1000);
            drop(injector);

            assert!(matches!(
                handle.configure_chirp(1, 1.0, 2.0, 3, 0),
                Err(InjectorError::Disconnected)
            ));
        }

        #[test]
        fn test_injector_outlives_handles() {
            let (mut injector, handle, _consumer) = get_injector(4, 1000);

            handle.configure_sine(0, 0.0, 7).unwrap();
            drop(handle);

            assert_eq!(injector.tick().unwrap(), 7);
            assert_eq!(injector.tick().unwrap(), 7);
        }

        #[test]
        fn test_chirp_never_seen_half_configured() {
            let (mut injector, handle, mut consumer) = get_injector(64, 997);
            handle.select(Mix::Chirp).unwrap();

            let writer = thread::spawn(move || {
                for index in 1..500 {
                    let period = 1 + index % 9;
                    let stop = 2.0 + f64::from(index);
                    handle.configure_chirp(100, 1.0, stop, period, 0).unwrap();
                }
            });

            for _ in 0..2000 {
                let value = injector.tick().unwrap();
                let parameters = *injector.get_chirp().get_parameters();
                let time = injector.get_clock().get_value() - injector.get_clock().get_step();

                assert_eq!(
                    parameters.get_alpha(),
                    sweep_rate(
                        parameters.get_period(),
                        parameters.get_start_freq(),
                        parameters.get_stop_freq()
                    ),
                    "Alpha out of sync with the rest of the parameters"
                );
                assert_eq!(value, evaluate_chirp(&parameters, time));
                consumer.pop().unwrap();
            }

            writer.join().unwrap();
        }

        #[test]
        fn test_run_with_consumer_thread() {
            let (mut injector, handle, mut consumer) = get_injector(8, 500);
            let (tx, rx) = crossbeam::channel::bounded::<()>(1);
            let expected = SineParameters::new(1000, 2.0, -20);

            handle.configure_sine(1000, 2.0, -20).unwrap();

            let reader = thread::spawn(move || {
                let mut received = Vec::new();
                loop {
                    if let Some(value) = consumer.pop() {
                        received.push(value);
                    } else if rx.try_recv().is_ok() {
                        while let Some(value) = consumer.pop() {
                            received.push(value);
                        }
                        break received;
                    }
                }
            });

            assert_eq!(injector.run(100).unwrap(), 100);
            tx.send(()).unwrap();

            let received = reader.join().unwrap();
            assert_eq!(received.len(), 100);
            for (index, value) in received.iter().enumerate() {
                assert_eq!(*value, evaluate_sine(&expected, index as u64 * 500));
            }
        }

        #[test]
        fn test_run_gives_up_without_consumer() {
            let (mut injector, handle, consumer) = get_injector(2, 1000);
            handle.configure_sine(0, 0.0, 3).unwrap();
            injector.set_stall_timeout(Duration::from_millis(50));
            drop(consumer);

            let (tx, rx) = crossbeam::channel::bounded(1);
            let runner = thread::spawn(move || {
                tx.send(injector.run(10)).unwrap();
                injector
            });

            let result = rx
                .recv_timeout(Duration::from_secs(2))
                .expect("Injector kept waiting on a dead consumer");
            assert!(matches!(
                result,
                Err(InjectorError::ConsumerStalled(name, _)) if name == "Test"
            ));

            let injector = runner.join().unwrap();
            assert_eq!(
                injector.get_clock().get_value(),
                2000,
                "Only the samples that fit should advance the clock"
            );
        }

        #[test]
        fn test_stall_timer_resets_on_progress() {
            let (mut injector, _handle, mut consumer) = get_injector(1, 1000);
            injector.set_stall_timeout(Duration::from_millis(200));

            let reader = thread::spawn(move || {
                let mut received = 0;
                while received < 20 {
                    thread::sleep(Duration::from_millis(20));
                    if consumer.pop().is_some() {
                        received += 1;
                    }
                }
                consumer
            });

            assert_eq!(injector.run(20).unwrap(), 20);
            reader.join().unwrap();
        }
    }
}
