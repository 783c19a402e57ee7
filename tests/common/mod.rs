#![allow(dead_code)]

use once_cell::sync::Lazy;

use vibe_arcade_core::board::{
    BankSpec, BitmapDepth, BitmapPairSpec, BoardConfig, GfxSpec, IrqSpec, PaletteSpec, PlaneSpec,
    RangeSpec, Rect, RegionSpec, SpriteSpec, TileFormat, TilemapSpec, VideoSpec,
};
use vibe_arcade_core::bus::Handler;
use vibe_arcade_core::gfx::GfxLayout;
use vibe_arcade_core::interrupts::VectorScheme;
use vibe_arcade_core::io::{BusDevice, NullPorts, NullWatchdog};
use vibe_arcade_core::machine::Machine;
use vibe_arcade_core::palette::{ColorFormat, DAC_WEIGHTS_4BIT};

// Tile-board memory map.
pub const ROM_BASE: u32 = 0x0000;
pub const RAM_BASE: u32 = 0x8000;
pub const TILEMAP_BASE: u32 = 0x9000;
pub const PAL_BASE: u32 = 0xA000;
pub const SPR_BASE: u32 = 0xA800;
pub const SCROLL_BASE: u32 = 0xB000;
pub const GFXBANK_REG: u32 = 0xC000;
pub const FLIP_REG: u32 = 0xC001;
pub const IRQEN_REG: u32 = 0xC002;
pub const SOUND_REG: u32 = 0xC003;
pub const BANKSEL_REG: u32 = 0xC004;
pub const RAMBANKSEL_REG: u32 = 0xC005;
pub const PORT0: u32 = 0xD000;
pub const PORT1: u32 = 0xD001;
pub const DEV_BASE: u32 = 0xE000;
pub const BANKWIN_BASE: u32 = 0xF000;
pub const RAMBANKWIN_BASE: u32 = 0xF800;

// Sample-ROM bank geometry on the tile board.
pub const SAMPLE_FIXED_BASE: usize = 0x100;
pub const SAMPLE_WINDOW: usize = 0x80;

// Bitmap-board memory map.
pub const BM_ROM_BASE: u32 = 0x000000;
pub const BM_RAM_BASE: u32 = 0x100000;
pub const BM_FRONT_BASE: u32 = 0x180000;
pub const BM_BACK_BASE: u32 = 0x190000;
pub const BM_PAL_BASE: u32 = 0x280000;
pub const BM_FRONTCOLOR_REG: u32 = 0x300000;
pub const BM_SOUND_REG: u32 = 0x320000;
pub const FRONT_COLOR_INDEX: usize = 512;
pub const BACK_PALETTE_BASE: usize = 256;

/// 8x8 4bpp tile filled with one pen, packed one nibble per pixel.
pub fn solid_tile(pen: u8) -> Vec<u8> {
    vec![pen << 4 | pen; 32]
}

/// 8x8 tile: left four columns `pen`, right four columns pen 0.
pub fn half_tile(pen: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    for _row in 0..8 {
        out.extend_from_slice(&[pen << 4 | pen, pen << 4 | pen, 0, 0]);
    }
    out
}

/// 8x8 tile with a single `pen` pixel in the top-left corner.
pub fn corner_tile(pen: u8) -> Vec<u8> {
    let mut out = vec![0u8; 32];
    out[0] = pen << 4;
    out
}

/// Two banks of sixteen 8x8 tiles. Bank 0: tile 0 solid pen 1, tile 1
/// solid pen 2, tile 2 half pen 3, tile 3 corner pen 1, rest solid.
/// Bank 1 mirrors bank 0 with different pens so a bank switch is
/// visible without touching video RAM.
pub static TILE_GFX: Lazy<Vec<u8>> = Lazy::new(|| {
    let mut rom = Vec::with_capacity(32 * 32);
    rom.extend(solid_tile(1));
    rom.extend(solid_tile(2));
    rom.extend(half_tile(3));
    rom.extend(corner_tile(1));
    for i in 4..16 {
        rom.extend(solid_tile((i % 14) as u8 + 1));
    }
    rom.extend(solid_tile(4));
    rom.extend(solid_tile(5));
    rom.extend(half_tile(6));
    rom.extend(corner_tile(2));
    for i in 4..16 {
        rom.extend(solid_tile((i % 14) as u8 + 2));
    }
    rom
});

/// Sixteen sprite tiles, one bank. Tile 0 is all pen 0 so an empty
/// sprite table draws nothing; tile 1 is half pen 3, tile 2 a single
/// corner pixel of pen 1, tile 3 solid pen 2.
pub static SPRITE_GFX: Lazy<Vec<u8>> = Lazy::new(|| {
    let mut rom = vec![0u8; 32];
    rom.extend(half_tile(3));
    rom.extend(corner_tile(1));
    rom.extend(solid_tile(2));
    rom.resize(16 * 32, 0);
    rom
});

/// Sample ROM behind the switchable bank window.
pub static SAMPLE_ROM: Lazy<Vec<u8>> = Lazy::new(|| {
    (0..0x300usize).map(|i| (i * 7 + 3) as u8).collect()
});

/// A register-file device: writes are stored, reads give back the
/// complement of the last written byte.
#[derive(Default)]
pub struct XorDevice {
    last: u8,
}

impl BusDevice for XorDevice {
    fn read(&mut self, _offset: u32) -> u8 {
        !self.last
    }

    fn write(&mut self, _offset: u32, value: u8) {
        self.last = value;
    }
}

/// Z80-flavored tile board: 256x224 screen, one 32x32 tilemap of 8x8
/// 4bpp tiles in two switchable gfx banks, 32 sprites, 32 row-scroll
/// registers, a sample-ROM bank window and a RAM bank window.
///
/// Port 1 is documented as the second coin input on the connector, but
/// the board never samples it; the quirk is kept as-is.
pub fn tile_board() -> BoardConfig {
    BoardConfig {
        regions: vec![
            RegionSpec::Rom {
                data: (0..0x4000usize).map(|i| (i % 251) as u8).collect(),
            },
            RegionSpec::Ram { size: 0x800 },
            RegionSpec::Rom {
                data: SAMPLE_ROM.clone(),
            },
            RegionSpec::Rom {
                data: TILE_GFX.clone(),
            },
            RegionSpec::Rom {
                data: SPRITE_GFX.clone(),
            },
        ],
        banks: vec![
            BankSpec {
                region: 2,
                fixed_base: SAMPLE_FIXED_BASE,
                window_size: SAMPLE_WINDOW,
                selector_mask: 0x03,
            },
            BankSpec {
                region: 1,
                fixed_base: 0,
                window_size: 0x100,
                selector_mask: 0x03,
            },
        ],
        ranges: vec![
            RangeSpec {
                start: ROM_BASE,
                end: ROM_BASE + 0x3FFF,
                handler: Handler::Region { region: 0 },
            },
            RangeSpec {
                start: RAM_BASE,
                end: RAM_BASE + 0x7FF,
                handler: Handler::Region { region: 1 },
            },
            RangeSpec {
                start: TILEMAP_BASE,
                end: TILEMAP_BASE + 0x7FF,
                handler: Handler::Plane { plane: 0 },
            },
            RangeSpec {
                start: PAL_BASE,
                end: PAL_BASE + 0x1FF,
                handler: Handler::Palette,
            },
            RangeSpec {
                start: SPR_BASE,
                end: SPR_BASE + 0xFF,
                handler: Handler::SpriteRam,
            },
            RangeSpec {
                start: SCROLL_BASE,
                end: SCROLL_BASE + 0x1F,
                handler: Handler::RowScroll,
            },
            RangeSpec {
                start: GFXBANK_REG,
                end: GFXBANK_REG,
                handler: Handler::GfxBankSelect,
            },
            RangeSpec {
                start: FLIP_REG,
                end: FLIP_REG,
                handler: Handler::FlipScreen,
            },
            RangeSpec {
                start: IRQEN_REG,
                end: IRQEN_REG,
                handler: Handler::IrqEnable,
            },
            RangeSpec {
                start: SOUND_REG,
                end: SOUND_REG,
                handler: Handler::SoundCommand,
            },
            RangeSpec {
                start: BANKSEL_REG,
                end: BANKSEL_REG,
                handler: Handler::BankSelect { bank: 0 },
            },
            RangeSpec {
                start: RAMBANKSEL_REG,
                end: RAMBANKSEL_REG,
                handler: Handler::BankSelect { bank: 1 },
            },
            RangeSpec {
                start: PORT0,
                end: PORT0,
                handler: Handler::Port {
                    port: 0,
                    resets_watchdog: true,
                },
            },
            RangeSpec {
                start: PORT1,
                end: PORT1,
                handler: Handler::Port {
                    port: 1,
                    resets_watchdog: false,
                },
            },
            RangeSpec {
                start: DEV_BASE,
                end: DEV_BASE + 0x0F,
                handler: Handler::Device { device: 0 },
            },
            RangeSpec {
                start: BANKWIN_BASE,
                end: BANKWIN_BASE + (SAMPLE_WINDOW as u32 - 1),
                handler: Handler::Bank { bank: 0 },
            },
            RangeSpec {
                start: RAMBANKWIN_BASE,
                end: RAMBANKWIN_BASE + 0xFF,
                handler: Handler::Bank { bank: 1 },
            },
        ],
        gfx: vec![
            GfxSpec {
                region: 3,
                layout: GfxLayout::packed_4bpp(8, 8, 32),
                bank_tiles: 16,
            },
            GfxSpec {
                region: 4,
                layout: GfxLayout::packed_4bpp(8, 8, 16),
                bank_tiles: 0,
            },
        ],
        video: VideoSpec {
            width: 256,
            height: 224,
            visible: Rect::new(0, 0, 256, 224),
            palette: PaletteSpec {
                entries: 256,
                format: ColorFormat::Weighted444 {
                    weights: DAC_WEIGHTS_4BIT,
                },
            },
            planes: vec![PlaneSpec { cols: 32, rows: 32 }],
            tilemap: Some(TilemapSpec {
                plane: 0,
                gfx: 0,
                format: TileFormat {
                    code_mask: 0x00FF,
                    color_shift: 8,
                    color_mask: 0x000F,
                    flip_x_mask: 0x4000,
                    flip_y_mask: 0x8000,
                },
                palette_base: 0,
                scroll_rows: 32,
            }),
            bitmaps: None,
            sprites: Some(SpriteSpec {
                count: 32,
                gfx: 1,
                palette_base: 0,
            }),
        },
        irq: IrqSpec {
            slices_per_frame: 2,
            scheme: VectorScheme::VblankOnly { vector: 0x38 },
        },
    }
}

/// M68000-flavored bitmap board: 320x256 screen rebuilt from a 4bpp
/// front overlay plane over an 8bpp back plane, 513 palette entries
/// with entry 512 as the dedicated front color.
pub fn bitmap_board() -> BoardConfig {
    BoardConfig {
        regions: vec![
            RegionSpec::Rom {
                data: (0..0x10000usize).map(|i| (i % 249) as u8).collect(),
            },
            RegionSpec::Ram { size: 0x2000 },
        ],
        banks: vec![],
        ranges: vec![
            RangeSpec {
                start: BM_ROM_BASE,
                end: BM_ROM_BASE + 0xFFFF,
                handler: Handler::Region { region: 0 },
            },
            RangeSpec {
                start: BM_RAM_BASE,
                end: BM_RAM_BASE + 0x1FFF,
                handler: Handler::Region { region: 1 },
            },
            RangeSpec {
                start: BM_FRONT_BASE,
                end: BM_FRONT_BASE + 0x9FFF,
                handler: Handler::Plane { plane: 0 },
            },
            RangeSpec {
                start: BM_BACK_BASE,
                end: BM_BACK_BASE + 0x13FFF,
                handler: Handler::Plane { plane: 1 },
            },
            RangeSpec {
                start: BM_PAL_BASE,
                end: BM_PAL_BASE + 0x3FF,
                handler: Handler::Palette,
            },
            RangeSpec {
                start: BM_FRONTCOLOR_REG,
                end: BM_FRONTCOLOR_REG + 1,
                handler: Handler::PaletteCell {
                    index: FRONT_COLOR_INDEX,
                },
            },
            RangeSpec {
                start: BM_SOUND_REG,
                end: BM_SOUND_REG + 1,
                handler: Handler::SoundCommand,
            },
        ],
        gfx: vec![],
        video: VideoSpec {
            width: 320,
            height: 256,
            visible: Rect::new(0, 8, 320, 240),
            palette: PaletteSpec {
                entries: 513,
                format: ColorFormat::Weighted444 {
                    weights: DAC_WEIGHTS_4BIT,
                },
            },
            planes: vec![
                PlaneSpec {
                    cols: 80,
                    rows: 256,
                },
                PlaneSpec {
                    cols: 160,
                    rows: 256,
                },
            ],
            tilemap: None,
            bitmaps: Some(BitmapPairSpec {
                front: 0,
                back: 1,
                front_depth: BitmapDepth::FourBpp,
                back_depth: BitmapDepth::EightBpp,
                front_color: FRONT_COLOR_INDEX,
                back_palette_base: BACK_PALETTE_BASE,
            }),
            sprites: None,
        },
        irq: IrqSpec {
            slices_per_frame: 3,
            scheme: VectorScheme::VblankPlusTimer {
                vblank: 6,
                timer: 5,
            },
        },
    }
}

/// Build a machine with stub collaborators: open inputs, no watchdog,
/// one [`XorDevice`] in slot 0.
pub fn boot(config: BoardConfig) -> Machine {
    Machine::new(
        config,
        Box::new(NullPorts),
        vec![Box::new(XorDevice::default())],
        Box::new(NullWatchdog),
    )
    .expect("board config should build")
}
