use crate::board::{BoardConfig, ConfigError, RegionSpec};
use crate::bus::AddressSpace;
use crate::gfx::GfxSet;
use crate::interrupts::InterruptSequencer;
use crate::io::{BusDevice, InputPorts, Watchdog};
use crate::memory::{Bank, MemoryRegion};
use crate::palette::PaletteStore;
use crate::video::{FrameBuffer, FrameCompositor, VideoState};
use crate::vram::VideoRam;

/// One emulated board: the address space the CPU cores talk to, the
/// compositor that rebuilds the frame at vblank, and the interrupt
/// sequencer that tells the main core which vector to take.
///
/// The CPU cores themselves are external; they drive this through
/// [`read_byte`](Self::read_byte)/[`write_byte`](Self::write_byte) and
/// poll [`interrupt_pending`](Self::interrupt_pending) once per
/// instruction-loop slice. Instances share nothing: running two
/// machines in parallel is just building two of them.
pub struct Machine {
    pub bus: AddressSpace,
    compositor: FrameCompositor,
    sequencer: InterruptSequencer,
    frames: u64,
}

impl Machine {
    /// Assemble a machine. Every configuration mistake is caught here;
    /// a machine that builds never fails at runtime.
    pub fn new(
        config: BoardConfig,
        ports: Box<dyn InputPorts>,
        devices: Vec<Box<dyn BusDevice>>,
        watchdog: Box<dyn Watchdog>,
    ) -> Result<Self, ConfigError> {
        let BoardConfig {
            regions: region_specs,
            banks: bank_specs,
            ranges,
            gfx: gfx_specs,
            video: video_spec,
            irq,
        } = config;

        let regions: Vec<MemoryRegion> = region_specs
            .into_iter()
            .map(|spec| match spec {
                RegionSpec::Ram { size } => MemoryRegion::ram(size),
                RegionSpec::Rom { data } => MemoryRegion::rom(data),
            })
            .collect();

        let banks: Vec<Bank> = bank_specs
            .iter()
            .map(|s| Bank::new(s.region, s.fixed_base, s.window_size, s.selector_mask))
            .collect();

        let mut gfx_sets = Vec::with_capacity(gfx_specs.len());
        for spec in &gfx_specs {
            let region = regions
                .get(spec.region)
                .ok_or(ConfigError::UnknownRegion {
                    region: spec.region,
                })?;
            gfx_sets.push(GfxSet::decode(
                region.as_slice(),
                &spec.layout,
                spec.bank_tiles,
            )?);
        }

        let palette = PaletteStore::new(video_spec.palette.entries, video_spec.palette.format);
        let planes: Vec<VideoRam> = video_spec
            .planes
            .iter()
            .map(|p| VideoRam::new(p.cols, p.rows))
            .collect();
        let sprite_cells = video_spec.sprites.map_or(0, |s| s.count * 4);
        let sprites = VideoRam::new(sprite_cells, 1);
        let scroll_rows = video_spec.tilemap.map_or(0, |t| t.scroll_rows);
        let video = VideoState::new(palette, planes, sprites, scroll_rows);

        let compositor = FrameCompositor::new(&video_spec, gfx_sets, &video)?;
        let bus = AddressSpace::new(regions, banks, devices, ports, watchdog, video, ranges)?;
        let sequencer = InterruptSequencer::new(irq.slices_per_frame, irq.scheme);

        Ok(Self {
            bus,
            compositor,
            sequencer,
            frames: 0,
        })
    }

    pub fn read_byte(&mut self, addr: u32) -> u8 {
        self.bus.read_byte(addr)
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) {
        self.bus.write_byte(addr, value)
    }

    pub fn read_word(&mut self, addr: u32) -> u16 {
        self.bus.read_word(addr)
    }

    pub fn write_word(&mut self, addr: u32, value: u16) {
        self.bus.write_word(addr, value)
    }

    /// Called by the main CPU core once per interrupt slice. Returns the
    /// vector to assert, honoring the board's interrupt-enable latch.
    pub fn interrupt_pending(&mut self) -> Option<u8> {
        let enabled = self.bus.irq_enabled();
        self.sequencer.advance(enabled)
    }

    pub fn slices_per_frame(&self) -> u32 {
        self.sequencer.slices_per_frame()
    }

    /// Vblank boundary: compose the frame and age the watchdog. The
    /// returned framebuffer is valid until the next call.
    pub fn vblank(&mut self) -> &FrameBuffer {
        self.compositor.refresh(&mut self.bus.video);
        self.bus.tick_watchdog();
        self.frames += 1;
        self.compositor.frame()
    }

    /// The most recently composed frame.
    pub fn frame(&self) -> &FrameBuffer {
        self.compositor.frame()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Drain the command latch toward the sound CPU. The embedder calls
    /// this from the second core's instruction loop; a `Some` is the
    /// pending-interrupt edge.
    pub fn take_sound_command(&mut self) -> Option<u8> {
        self.bus.sound_latch.take()
    }

    /// Video-subsystem reset: palette, planes, sprite table, latches,
    /// sequencer and banks return to power-on state. Region contents
    /// (ROM images, work RAM) are left alone.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.compositor.reset();
        self.sequencer.reset();
        self.frames = 0;
    }
}
