//! Device models and MNA stamps for Voltra.
//!
//! - Passive elements: resistor, capacitor, inductor (`passive`), each
//!   implementing `voltra_core::Element`.
//! - Mutual inductance and multi-winding transformer expansion
//!   (`coupling`, `transformer`).
//! - Independent and controlled sources (`sources`, `controlled`).
//! - Switching devices: the ideal diode resolved via MCP/LCP (`diode`) and
//!   the gate-driven ideal switch (`switch`).

pub mod bdf2;
pub mod controlled;
pub mod coupling;
pub mod diode;
pub mod error;
pub mod passive;
pub mod sources;
pub mod switch;
pub mod transformer;

pub use controlled::{Cccs, Ccvs, Vccs, Vcvs};
pub use coupling::CouplingManager;
pub use diode::Diode;
pub use error::{Error, Result};
pub use passive::{Capacitor, Inductor, InductorState, Resistor};
pub use sources::{constant, pulse, sine, CurrentSource, VoltageSource, WaveformFn};
pub use switch::{GateFn, Switch};
pub use transformer::{Transformer, Winding};
