use log::trace;

/// Which vector fires on each intra-frame interrupt slice.
///
/// The slice counter counts down; slice 0 is the vblank boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorScheme {
    /// A single interrupt per frame, at vblank.
    VblankOnly { vector: u8 },
    /// Vblank vector at slice 0, a timer vector on every other slice
    /// (the palette-settle interrupts some boards fire mid-frame).
    VblankPlusTimer { vblank: u8, timer: u8 },
    /// Vector is `base - remaining_slices`, reproducing the counted
    /// auto-vector arithmetic of the boards that derive the vector
    /// number from the slice counter.
    Countdown { base: u8 },
}

/// Decides which interrupt vector the CPU core sees on each of the
/// `slices_per_frame` polls it makes per frame.
///
/// The CPU collaborator calls [`advance`](Self::advance) once per slice;
/// the sequencer owns no timing of its own. Disabling interrupts
/// suppresses vectors but the counter keeps running, so re-enabling
/// mid-frame stays aligned with the raster.
pub struct InterruptSequencer {
    slices_per_frame: u32,
    remaining: u32,
    scheme: VectorScheme,
}

impl InterruptSequencer {
    pub fn new(slices_per_frame: u32, scheme: VectorScheme) -> Self {
        let slices = slices_per_frame.max(1);
        Self {
            slices_per_frame: slices,
            remaining: slices - 1,
            scheme,
        }
    }

    pub fn slices_per_frame(&self) -> u32 {
        self.slices_per_frame
    }

    /// Remaining slices before the vblank slice of the current frame.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consume one slice and return the vector to assert, if any.
    /// Returns the vblank vector exactly when the consumed slice was the
    /// frame's last.
    pub fn advance(&mut self, enabled: bool) -> Option<u8> {
        let slice = self.remaining;
        self.remaining = if slice == 0 {
            self.slices_per_frame - 1
        } else {
            slice - 1
        };

        if !enabled {
            return None;
        }

        match self.scheme {
            VectorScheme::VblankOnly { vector } => (slice == 0).then_some(vector),
            VectorScheme::VblankPlusTimer { vblank, timer } => {
                Some(if slice == 0 { vblank } else { timer })
            }
            VectorScheme::Countdown { base } => Some(base.wrapping_sub(slice as u8)),
        }
    }

    pub fn reset(&mut self) {
        self.remaining = self.slices_per_frame - 1;
    }
}

/// One-byte command latch between the main CPU and a second,
/// independently clocked core.
///
/// A write from the main side stores the byte and raises the pending
/// flag; the target core's collaborator drains it at its next
/// instruction boundary via [`take`](Self::take). The latch is one byte
/// deep on the real boards: a second write before the drain replaces
/// the data, and only the latest byte survives. That loss is faithful
/// behavior, so it is kept and merely logged.
#[derive(Default)]
pub struct SoundLatch {
    data: u8,
    pending: bool,
}

impl SoundLatch {
    pub fn write(&mut self, value: u8) {
        if self.pending {
            trace!(target: "interrupts",
                "sound command {:#04x} overwritten by {:#04x} before pickup", self.data, value);
        }
        self.data = value;
        self.pending = true;
    }

    /// Read without acknowledging, the way the target CPU's latch port
    /// reads back the current byte.
    pub fn read(&self) -> u8 {
        self.data
    }

    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Drain the latch: returns the latest byte if one is pending and
    /// clears the flag.
    pub fn take(&mut self) -> Option<u8> {
        if self.pending {
            self.pending = false;
            Some(self.data)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.data = 0;
        self.pending = false;
    }
}
