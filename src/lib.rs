//! Emulation core for 1980s tile-and-sprite arcade raster hardware.
//!
//! This crate contains the platform-agnostic board logic: the
//! memory-mapped address space the CPU cores talk to, and the per-frame
//! video reconstruction that turns palette/tile/sprite RAM back into
//! pixels. CPU instruction cores, sound chip internals, ROM loading and
//! presentation are collaborators behind the seams in [`io`] and the
//! [`machine`] facade.

/// Board configuration types and the construction-time error taxonomy.
pub mod board;

/// The CPU-facing address space: range dispatch and access semantics.
pub mod bus;

/// Planar graphics pattern decoding.
pub mod gfx;

/// Intra-frame interrupt sequencing and the cross-CPU command latch.
pub mod interrupts;

/// Seams to external collaborators: devices, input ports, watchdog.
pub mod io;

/// High-level facade that wires the bus, compositor and sequencer into
/// a single machine.
pub mod machine;

/// Memory regions and switchable bank windows.
pub mod memory;

/// Palette RAM and color expansion.
pub mod palette;

/// Per-frame composition of the visible frame.
pub mod video;

/// Video RAM planes with dirty-cell tracking.
pub mod vram;
