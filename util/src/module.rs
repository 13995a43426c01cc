//! Module interfaces
//!
//! Each cyclic module of `line_exec` (sensor array, line estimator, steering controller,
//! locomotion control) implements `State`. The executable creates a module with its defaults,
//! calls `init` with the name of its parameter file and from then on drives it with `proc`, once
//! per control tick.

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

pub trait State {
    /// Passed to `init`, for every module in this workspace the parameter file name.
    type InitData;
    type InitError;

    /// Everything the module needs from the rest of the loop for one tick.
    type InputData;
    type OutputData;
    /// Diagnostics of the last tick, reset at the start of every `proc` call.
    type StatusReport;
    type ProcError;

    /// Load and validate the module's parameters.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError>;

    /// Run the module for one control tick.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
