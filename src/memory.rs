use log::trace;

/// A contiguous block of emulated memory: ROM, work RAM, or the backing
/// store for banked windows.
///
/// The region owns its bytes. Everything else (banks, address ranges)
/// refers to a region by index and never holds a pointer into it.
pub struct MemoryRegion {
    bytes: Vec<u8>,
    read_only: bool,
}

impl MemoryRegion {
    /// Zero-filled read/write RAM.
    pub fn ram(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            read_only: false,
        }
    }

    /// Read-only region populated with the given image. The loader that
    /// produces the image is the embedder's concern; by the time a region
    /// exists its contents are final.
    pub fn rom(data: Vec<u8>) -> Self {
        Self {
            bytes: data,
            read_only: true,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn read(&self, offset: usize) -> u8 {
        self.bytes.get(offset).copied().unwrap_or(0)
    }

    /// Writes to ROM are dropped, not errors: arcade boards wire the write
    /// strobe to nothing and carry on.
    pub fn write(&mut self, offset: usize, value: u8) {
        if self.read_only {
            trace!(target: "memory", "write to ROM ignored offset={offset:#x} value={value:#04x}");
            return;
        }
        if let Some(b) = self.bytes.get_mut(offset) {
            *b = value;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

/// A switchable window into a [`MemoryRegion`].
///
/// Selecting bank `k` exposes the `window_size` bytes starting at
/// `fixed_base + k * window_size`. The selector is masked, never trapped,
/// so every reachable window lies inside the region; the mask is
/// validated against the region size when the machine is built.
pub struct Bank {
    region: usize,
    fixed_base: usize,
    window_size: usize,
    selector_mask: u8,
    base_offset: usize,
}

impl Bank {
    pub fn new(region: usize, fixed_base: usize, window_size: usize, selector_mask: u8) -> Self {
        Self {
            region,
            fixed_base,
            window_size,
            selector_mask,
            base_offset: fixed_base,
        }
    }

    pub fn region(&self) -> usize {
        self.region
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn selector_mask(&self) -> u8 {
        self.selector_mask
    }

    /// Highest byte offset any selectable window can reach, used for
    /// build-time bounds validation.
    pub fn max_extent(&self) -> usize {
        self.fixed_base + (self.selector_mask as usize + 1) * self.window_size
    }

    /// Switch the window. Out-of-range selectors are masked down.
    pub fn select(&mut self, selector: u8) {
        let masked = selector & self.selector_mask;
        if masked != selector {
            trace!(target: "memory", "bank selector {selector:#04x} masked to {masked:#04x}");
        }
        self.base_offset = self.fixed_base + masked as usize * self.window_size;
    }

    /// Region offset backing `offset` within the current window.
    pub fn resolve(&self, offset: usize) -> usize {
        self.base_offset + (offset % self.window_size)
    }

    pub fn reset(&mut self) {
        self.base_offset = self.fixed_base;
    }
}
