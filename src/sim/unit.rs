pub mod buffer;
pub mod function_unit;
pub mod latency_calculator;
pub mod memory_unit;

/// Identifies the unit an in-flight operation occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKeyType {
    VectorAlu,
    LoadStore,
}

/// Outcome of clocking a unit for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStep<T> {
    /// Nothing was issued, or it was abandoned by a unit reset.
    Idle,
    Busy,
    Done(T),
}

/// Multi-cycle execution units. Their in-flight progress belongs to the
/// unit reset domain.
pub trait ExecutionUnit {
    fn key(&self) -> UnitKeyType;

    fn is_occupied(&self) -> bool;

    /// Abandon any in-flight operation and clear progress counters.
    /// Returns whether something was abandoned.
    fn reset(&mut self) -> bool;
}
