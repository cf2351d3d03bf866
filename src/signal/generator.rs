#[cfg(feature = "verbose_signals")]
use simplelog::info;

use super::MicroClock;

/// Generators are the building blocks of an injection. Each one maps an elapsed time to an
/// output value with a shape known in closed form.
///
/// # How it works
/// The only behaviour a generator needs to define is [evaluate](fn@Generator::evaluate).
/// It receives the time elapsed since an epoch chosen by the caller, in microseconds, and
/// returns the value in the unit of the consumer (actuator counts, for instance).
/// Evaluation never changes the generator; reconfiguring is done through each generator's
/// own `configure` method.
///
/// # Batch processing
/// [fill_buffer](fn@Generator::fill_buffer) renders a whole buffer on a fixed timestep, which
/// is handy for offline inspection of a signal before injecting it.
pub trait Generator {
    /// Output of the generator `t` microseconds after the epoch.
    fn evaluate(&self, t: u64) -> i32;

    /// Fills the buffer with consecutive samples, `step` microseconds apart, starting at
    /// the epoch.
    ///
    /// # Returns
    /// The value of the clock after the last sample, which can be fed to
    /// [fill_buffer_at](fn@Generator::fill_buffer_at) to continue where this call ended.
    fn fill_buffer(&self, buffer: &mut [i32], step: u64) -> u64 {
        self.fill_buffer_at(buffer, 0, step)
    }

    /// Does the same as [fill_buffer](fn@Generator::fill_buffer) with a custom starting time.
    fn fill_buffer_at(&self, buffer: &mut [i32], start_at: u64, step: u64) -> u64 {
        #[cfg(feature = "verbose_signals")]
        {
            info!("<b>Rendering <cyan>{}</>", self.get_name());
        }

        let mut clock = MicroClock::new_at(step, start_at);

        buffer.iter_mut().for_each(|sample| {
            let time = clock.inc();
            *sample = self.evaluate(time);

            #[cfg(feature = "verbose_signals")]
            {
                println!("[ {} us ] {}", time, sample);
            }
        });

        clock.get_value()
    }

    // USEFUL FOR DEBUGGING
    fn get_name(&self) -> String;
}
