use log::warn;

use crate::board::{ConfigError, RangeSpec};
use crate::interrupts::SoundLatch;
use crate::io::{BusDevice, InputPorts, Watchdog};
use crate::memory::{Bank, MemoryRegion};
use crate::video::VideoState;

/// What an address range is wired to.
///
/// Crate-owned targets are closed enum variants so dispatch stays a
/// single-owner affair; external chips hide behind [`BusDevice`] trait
/// objects and input ports behind [`InputPorts`]. `Port` ranges can be
/// flagged to kick the watchdog as a side effect of the access, the way
/// some boards wire their reset circuit to an input read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Plain memory; writes are dropped when the region is ROM.
    Region { region: usize },
    /// Reads/writes through a switchable bank window.
    Bank { bank: usize },
    /// Write-only bank selector register.
    BankSelect { bank: usize },
    /// Palette RAM.
    Palette,
    /// A register aliasing a single palette entry (dedicated overlay
    /// colors live in the palette like any other entry).
    PaletteCell { index: usize },
    /// A video RAM plane (tilemap cells or bitmap pixels).
    Plane { plane: usize },
    /// The sprite table.
    SpriteRam,
    /// Per-scanline horizontal scroll registers, one byte per row.
    RowScroll,
    /// Input port, optionally kicking the watchdog on access.
    Port { port: usize, resets_watchdog: bool },
    /// External chip bound by the embedder.
    Device { device: usize },
    /// Sound command latch toward the second CPU.
    SoundCommand,
    /// Write-only graphics bank selector; switching invalidates all
    /// video planes since every stored tile changes meaning.
    GfxBankSelect,
    /// Write-only screen flip register.
    FlipScreen,
    /// Interrupt enable latch consumed by the sequencer.
    IrqEnable,
}

struct AddressRange {
    start: u32,
    end: u32,
    handler: Handler,
}

/// The CPU-facing memory map: an ordered, non-overlapping set of address
/// ranges resolved by binary search.
///
/// Accesses outside every range are tolerated, never fatal: reads return
/// 0, writes are dropped, and both are logged as unknown accesses so a
/// board bring-up can spot unimplemented registers.
pub struct AddressSpace {
    ranges: Vec<AddressRange>,
    regions: Vec<MemoryRegion>,
    banks: Vec<Bank>,
    devices: Vec<Box<dyn BusDevice>>,
    ports: Box<dyn InputPorts>,
    watchdog: Box<dyn Watchdog>,
    pub video: VideoState,
    pub sound_latch: SoundLatch,
    irq_enabled: bool,
    log_unmapped: bool,
}

impl AddressSpace {
    pub fn new(
        regions: Vec<MemoryRegion>,
        banks: Vec<Bank>,
        devices: Vec<Box<dyn BusDevice>>,
        ports: Box<dyn InputPorts>,
        watchdog: Box<dyn Watchdog>,
        video: VideoState,
        ranges: Vec<RangeSpec>,
    ) -> Result<Self, ConfigError> {
        for (i, region) in regions.iter().enumerate() {
            if region.is_empty() {
                return Err(ConfigError::EmptyRegion { region: i });
            }
        }
        for (i, bank) in banks.iter().enumerate() {
            let region = regions
                .get(bank.region())
                .ok_or(ConfigError::UnknownRegion {
                    region: bank.region(),
                })?;
            if bank.max_extent() > region.len() {
                return Err(ConfigError::BankWindowOutOfBounds {
                    bank: i,
                    extent: bank.max_extent(),
                    region_size: region.len(),
                });
            }
        }

        let mut table = Vec::with_capacity(ranges.len());
        for spec in &ranges {
            if spec.start > spec.end {
                return Err(ConfigError::InvalidRange {
                    start: spec.start,
                    end: spec.end,
                });
            }
            let len = (spec.end - spec.start) as usize + 1;
            let capacity = match spec.handler {
                Handler::Region { region } => Some(
                    regions
                        .get(region)
                        .ok_or(ConfigError::UnknownRegion { region })?
                        .len(),
                ),
                Handler::Bank { bank } | Handler::BankSelect { bank } => {
                    let b = banks.get(bank).ok_or(ConfigError::UnknownBank { bank })?;
                    match spec.handler {
                        Handler::Bank { .. } => Some(b.window_size()),
                        _ => None,
                    }
                }
                Handler::Palette => Some(video.palette.len() * 2),
                Handler::PaletteCell { index } => {
                    if index >= video.palette.len() {
                        return Err(ConfigError::PaletteTooSmall {
                            needed: index,
                            entries: video.palette.len(),
                        });
                    }
                    None
                }
                Handler::Plane { plane } => Some(
                    video
                        .planes
                        .get(plane)
                        .ok_or(ConfigError::UnknownPlane { plane })?
                        .cell_count()
                        * 2,
                ),
                Handler::SpriteRam => Some(video.sprites.cell_count() * 2),
                Handler::RowScroll => Some(video.row_scroll.len()),
                Handler::Device { device } => {
                    if device >= devices.len() {
                        return Err(ConfigError::UnknownDevice { device });
                    }
                    None
                }
                Handler::Port { .. }
                | Handler::SoundCommand
                | Handler::GfxBankSelect
                | Handler::FlipScreen
                | Handler::IrqEnable => None,
            };
            if let Some(capacity) = capacity {
                if len > capacity {
                    return Err(ConfigError::RangeTooLarge {
                        start: spec.start,
                        end: spec.end,
                        capacity,
                    });
                }
            }
            table.push(AddressRange {
                start: spec.start,
                end: spec.end,
                handler: spec.handler,
            });
        }

        table.sort_by_key(|r| r.start);
        for pair in table.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(ConfigError::OverlappingRanges {
                    a_start: pair[0].start,
                    a_end: pair[0].end,
                    b_start: pair[1].start,
                    b_end: pair[1].end,
                });
            }
        }

        Ok(Self {
            ranges: table,
            regions,
            banks,
            devices,
            ports,
            watchdog,
            video,
            sound_latch: SoundLatch::default(),
            irq_enabled: true,
            log_unmapped: true,
        })
    }

    fn lookup(&self, addr: u32) -> Option<usize> {
        let idx = self.ranges.partition_point(|r| r.start <= addr);
        if idx == 0 {
            return None;
        }
        let range = &self.ranges[idx - 1];
        (addr <= range.end).then_some(idx - 1)
    }

    pub fn read_byte(&mut self, addr: u32) -> u8 {
        let Some(idx) = self.lookup(addr) else {
            if self.log_unmapped {
                warn!(target: "bus", "unmapped read at {addr:#08x}");
            }
            return 0;
        };
        let offset = (addr - self.ranges[idx].start) as usize;
        match self.ranges[idx].handler {
            Handler::Region { region } => self.regions[region].read(offset),
            Handler::Bank { bank } => {
                let bank = &self.banks[bank];
                self.regions[bank.region()].read(bank.resolve(offset))
            }
            Handler::Palette => self.video.palette.read_byte(offset),
            Handler::PaletteCell { index } => self.video.palette.read_byte(index * 2 + (offset & 1)),
            Handler::Plane { plane } => self.video.planes[plane].read_byte(offset),
            Handler::SpriteRam => self.video.sprites.read_byte(offset),
            Handler::Port {
                port,
                resets_watchdog,
            } => {
                if resets_watchdog {
                    self.watchdog.kick();
                }
                self.ports.read_port(port)
            }
            Handler::Device { device } => self.devices[device].read(offset as u32),
            Handler::SoundCommand => self.sound_latch.read(),
            // Write-only registers read back as bus idle.
            Handler::BankSelect { .. }
            | Handler::RowScroll
            | Handler::GfxBankSelect
            | Handler::FlipScreen
            | Handler::IrqEnable => 0,
        }
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) {
        let Some(idx) = self.lookup(addr) else {
            if self.log_unmapped {
                warn!(target: "bus", "unmapped write at {addr:#08x} value={value:#04x}");
            }
            return;
        };
        let offset = (addr - self.ranges[idx].start) as usize;
        match self.ranges[idx].handler {
            Handler::Region { region } => self.regions[region].write(offset, value),
            Handler::Bank { bank } => {
                let (region, resolved) = {
                    let bank = &self.banks[bank];
                    (bank.region(), bank.resolve(offset))
                };
                self.regions[region].write(resolved, value);
            }
            Handler::BankSelect { bank } => self.banks[bank].select(value),
            Handler::Palette => self.video.palette.write_byte(offset, value),
            Handler::PaletteCell { index } => {
                self.video.palette.write_byte(index * 2 + (offset & 1), value);
            }
            Handler::Plane { plane } => self.video.planes[plane].write_byte(offset, value),
            Handler::SpriteRam => self.video.sprites.write_byte(offset, value),
            Handler::RowScroll => {
                if let Some(row) = self.video.row_scroll.get_mut(offset) {
                    *row = value;
                }
            }
            Handler::Port { resets_watchdog, .. } => {
                // Input latches ignore writes, but the watchdog side
                // effect fires on any access to the location.
                if resets_watchdog {
                    self.watchdog.kick();
                }
            }
            Handler::Device { device } => self.devices[device].write(offset as u32, value),
            Handler::SoundCommand => self.sound_latch.write(value),
            Handler::GfxBankSelect => {
                if self.video.gfx_bank != value {
                    self.video.gfx_bank = value;
                    self.video.mark_planes_dirty();
                }
            }
            Handler::FlipScreen => {
                let flip = value & 1 != 0;
                if self.video.flip_screen != flip {
                    self.video.flip_screen = flip;
                    self.video.mark_planes_dirty();
                }
            }
            Handler::IrqEnable => self.irq_enabled = value & 1 != 0,
        }
    }

    /// Big-endian 16-bit read: the addressed byte is the high half.
    pub fn read_word(&mut self, addr: u32) -> u16 {
        let hi = self.read_byte(addr) as u16;
        let lo = self.read_byte(addr.wrapping_add(1)) as u16;
        hi << 8 | lo
    }

    /// Big-endian 16-bit write. Word-cell storage underneath preserves
    /// combine semantics on its own; this is just the two byte lanes.
    pub fn write_word(&mut self, addr: u32, value: u16) {
        self.write_byte(addr, (value >> 8) as u8);
        self.write_byte(addr.wrapping_add(1), (value & 0xFF) as u8);
    }

    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled
    }

    pub fn set_log_unmapped(&mut self, enabled: bool) {
        self.log_unmapped = enabled;
    }

    /// Swap the input port provider (e.g. to feed test inputs).
    pub fn set_ports(&mut self, ports: Box<dyn InputPorts>) {
        self.ports = ports;
    }

    pub fn watchdog(&self) -> &dyn Watchdog {
        self.watchdog.as_ref()
    }

    pub fn tick_watchdog(&mut self) {
        self.watchdog.tick();
    }

    pub fn region(&self, index: usize) -> &MemoryRegion {
        &self.regions[index]
    }

    pub fn bank(&self, index: usize) -> &Bank {
        &self.banks[index]
    }

    pub(crate) fn reset(&mut self) {
        self.video.reset();
        self.sound_latch.reset();
        self.irq_enabled = true;
        for bank in &mut self.banks {
            bank.reset();
        }
    }
}
