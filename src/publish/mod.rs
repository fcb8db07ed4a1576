// VitalsWatch: Publish Sinks
//
// A sink receives every valid sample exactly once.  Sinks report problems
// through the log only; nothing flows back into the cycle.

pub mod ble;
pub mod telemetry;

use crate::sample::Sample;

pub trait Sink {
    fn name(&self) -> &'static str;
    fn publish(&mut self, sample: &Sample);
}
