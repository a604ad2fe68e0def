//! Step execution layer
//!
//! This module contains the step-execution primitive and the runners
//! steps execute on.

mod local;
mod remote;
mod step;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use local::LocalRunner;
pub use remote::RemoteRunner;
pub use step::run_step;
pub use traits::StepRunner;
