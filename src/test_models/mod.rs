pub mod exponential_decay;
pub mod harmonic_oscillator;
pub mod robertson;

pub use exponential_decay::exponential_decay;
pub use harmonic_oscillator::harmonic_oscillator;
pub use robertson::robertson;
