use crate::board::{
    BitmapDepth, BitmapPairSpec, ConfigError, Rect, SpriteSpec, TilemapSpec, VideoSpec,
};
use crate::gfx::GfxSet;
use crate::palette::PaletteStore;
use crate::vram::VideoRam;

#[cfg(feature = "video-trace")]
macro_rules! video_trace {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}
#[cfg(not(feature = "video-trace"))]
macro_rules! video_trace {
    ($($arg:tt)*) => {};
}

/// All video-facing state the bus handlers mutate and the compositor
/// reads: palette, video RAM planes, the sprite table, and the handful
/// of latched video registers.
///
/// Owned by the address space so every mutation funnels through the
/// write contracts; the compositor borrows it once per frame.
pub struct VideoState {
    pub palette: PaletteStore,
    pub planes: Vec<VideoRam>,
    pub sprites: VideoRam,
    pub row_scroll: Vec<u8>,
    pub gfx_bank: u8,
    pub flip_screen: bool,
}

impl VideoState {
    pub fn new(
        palette: PaletteStore,
        planes: Vec<VideoRam>,
        sprites: VideoRam,
        scroll_rows: usize,
    ) -> Self {
        Self {
            palette,
            planes,
            sprites,
            row_scroll: vec![0; scroll_rows],
            gfx_bank: 0,
            flip_screen: false,
        }
    }

    /// Invalidate every plane: the meaning of stored cells changed out
    /// from under them (gfx bank switch, screen flip, reset).
    pub fn mark_planes_dirty(&mut self) {
        for plane in &mut self.planes {
            plane.mark_all_dirty();
        }
    }

    pub fn reset(&mut self) {
        self.palette.reset();
        for plane in &mut self.planes {
            plane.reset();
        }
        self.sprites.reset();
        self.row_scroll.fill(0);
        self.gfx_bank = 0;
        self.flip_screen = false;
    }
}

/// The composed frame handed to the presentation collaborator:
/// 0x00RRGGBB pixels plus the visible sub-rectangle the monitor
/// actually shows.
pub struct FrameBuffer {
    width: usize,
    height: usize,
    visible: Rect,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    fn new(width: usize, height: usize, visible: Rect) -> Self {
        Self {
            width,
            height,
            visible,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn visible(&self) -> Rect {
        self.visible
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    fn put(&mut self, x: usize, y: usize, flip: bool, rgb: u32) {
        let (dx, dy) = if flip {
            (self.width - 1 - x, self.height - 1 - y)
        } else {
            (x, y)
        };
        self.pixels[dy * self.width + dx] = rgb;
    }
}

struct TilemapLayer {
    spec: TilemapSpec,
    cache: Vec<u32>,
    cache_w: usize,
    cache_h: usize,
}

struct BitmapLayer {
    spec: BitmapPairSpec,
    cache: Vec<u32>,
}

/// Rebuilds the frame once per vblank.
///
/// Each frame is either a full redraw (the palette changed since the
/// last flush, or nothing was ever drawn) or an incremental one that
/// only touches dirty cells. The background layer cache carries pixels
/// across frames so incremental redraw stays sound under the sprite
/// layer, which is repainted from the sprite table every frame.
///
/// When both a tilemap and a bitmap pair are configured the bitmap pair
/// is the background and the tilemap is ignored; no board in this
/// core's family drives both at once.
pub struct FrameCompositor {
    frame: FrameBuffer,
    gfx: Vec<GfxSet>,
    tilemap: Option<TilemapLayer>,
    bitmaps: Option<BitmapLayer>,
    sprites: Option<SpriteSpec>,
    rendered_once: bool,
}

impl FrameCompositor {
    /// Validates the video configuration against the constructed state.
    /// Every failure here is fatal by design: a compositor that builds
    /// can never fail during a frame.
    pub fn new(
        spec: &VideoSpec,
        gfx: Vec<GfxSet>,
        video: &VideoState,
    ) -> Result<Self, ConfigError> {
        let (width, height) = (spec.width, spec.height);
        if width == 0 || height == 0 {
            return Err(ConfigError::BadDimensions { width, height });
        }
        let vis = spec.visible;
        if vis.x + vis.width > width || vis.y + vis.height > height {
            return Err(ConfigError::VisibleOutOfBounds { width, height });
        }

        let palette_entries = video.palette.len();

        let tilemap = match spec.tilemap {
            None => None,
            Some(t) => {
                let plane = video
                    .planes
                    .get(t.plane)
                    .ok_or(ConfigError::UnknownPlane { plane: t.plane })?;
                let set = gfx.get(t.gfx).ok_or(ConfigError::UnknownGfx { gfx: t.gfx })?;
                let cache_w = plane.cols() * set.tile_width();
                let cache_h = plane.rows() * set.tile_height();
                if cache_w < width || cache_h < height {
                    return Err(ConfigError::TilemapTooSmall {
                        expected_w: width,
                        expected_h: height,
                        actual_w: cache_w,
                        actual_h: cache_h,
                    });
                }
                if t.scroll_rows > height {
                    return Err(ConfigError::ScrollRowsOutOfRange {
                        rows: t.scroll_rows,
                        height,
                    });
                }
                let top = t.palette_base + (t.format.color_mask as usize + 1) * set.pens();
                if top > palette_entries {
                    return Err(ConfigError::PaletteTooSmall {
                        needed: top - 1,
                        entries: palette_entries,
                    });
                }
                Some(TilemapLayer {
                    spec: t,
                    cache: vec![0; cache_w * cache_h],
                    cache_w,
                    cache_h,
                })
            }
        };

        let bitmaps = match spec.bitmaps {
            None => None,
            Some(b) => {
                for (plane_idx, depth) in [(b.front, b.front_depth), (b.back, b.back_depth)] {
                    let plane = video
                        .planes
                        .get(plane_idx)
                        .ok_or(ConfigError::UnknownPlane { plane: plane_idx })?;
                    let pw = plane.cols() * depth.pixels_per_cell();
                    let ph = plane.rows();
                    if pw != width || ph != height {
                        return Err(ConfigError::BitmapSizeMismatch {
                            plane: plane_idx,
                            expected_w: width,
                            expected_h: height,
                            actual_w: pw,
                            actual_h: ph,
                        });
                    }
                }
                let back_top = b.back_palette_base + Self::max_pixel_value(b.back_depth);
                let needed = b.front_color.max(back_top);
                if needed >= palette_entries {
                    return Err(ConfigError::PaletteTooSmall {
                        needed,
                        entries: palette_entries,
                    });
                }
                Some(BitmapLayer {
                    spec: b,
                    cache: vec![0; width * height],
                })
            }
        };

        if let Some(s) = spec.sprites {
            let set = gfx.get(s.gfx).ok_or(ConfigError::UnknownGfx { gfx: s.gfx })?;
            let top = s.palette_base + 16 * set.pens();
            if top > palette_entries {
                return Err(ConfigError::PaletteTooSmall {
                    needed: top - 1,
                    entries: palette_entries,
                });
            }
        }

        Ok(Self {
            frame: FrameBuffer::new(width, height, vis),
            gfx,
            tilemap,
            bitmaps,
            sprites: spec.sprites,
            rendered_once: false,
        })
    }

    fn max_pixel_value(depth: BitmapDepth) -> usize {
        match depth {
            BitmapDepth::FourBpp => 0x0F,
            BitmapDepth::EightBpp => 0xFF,
        }
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Compose one frame. Called once per vblank, after the emulated
    /// frame's writes have all landed.
    pub fn refresh(&mut self, video: &mut VideoState) {
        let full = video.palette.flush_dirty() || !self.rendered_once;
        video_trace!(
            "refresh full={} tile_dirty={:?}",
            full,
            video.planes.iter().map(VideoRam::dirty_count).sum::<usize>()
        );

        if let Some(mut layer) = self.tilemap.take() {
            Self::regen_tilemap(&mut layer, &self.gfx, video, full);
            self.tilemap = Some(layer);
        }
        if let Some(mut layer) = self.bitmaps.take() {
            self.regen_bitmaps(&mut layer, video, full);
            self.bitmaps = Some(layer);
        }

        self.compose_background(video);
        self.draw_sprites(video);
        self.rendered_once = true;
    }

    /// Forget the composed frame; the next refresh is a full redraw.
    pub fn reset(&mut self) {
        self.rendered_once = false;
        self.frame.pixels.fill(0);
        if let Some(t) = &mut self.tilemap {
            t.cache.fill(0);
        }
        if let Some(b) = &mut self.bitmaps {
            b.cache.fill(0);
        }
    }

    fn regen_tilemap(layer: &mut TilemapLayer, gfx: &[GfxSet], video: &mut VideoState, full: bool) {
        let spec = layer.spec;
        let set = &gfx[spec.gfx];
        let plane = &video.planes[spec.plane];
        let (tw, th) = (set.tile_width(), set.tile_height());
        let pens = set.pens();
        let cols = plane.cols();
        let bank = video.gfx_bank as usize;

        let mut redraw_cell = |index: usize, cell: u16| {
            let code = spec.format.code(cell);
            let color = spec.format.color(cell);
            let flip_x = spec.format.flip_x(cell);
            let flip_y = spec.format.flip_y(cell);
            let pattern = set.pattern(code, bank);
            let px0 = (index % cols) * tw;
            let py0 = (index / cols) * th;
            for ty in 0..th {
                let sy = if flip_y { th - 1 - ty } else { ty };
                for tx in 0..tw {
                    let sx = if flip_x { tw - 1 - tx } else { tx };
                    let pen = pattern[sy * tw + sx] as usize;
                    let rgb = video.palette.rgb(spec.palette_base + color * pens + pen);
                    layer.cache[(py0 + ty) * layer.cache_w + px0 + tx] = rgb;
                }
            }
        };

        if full {
            for index in 0..plane.cell_count() {
                redraw_cell(index, plane.cell(index));
            }
        } else {
            for index in plane.dirty_cells() {
                redraw_cell(index, plane.cell(index));
            }
        }
        video.planes[spec.plane].clear_dirty();
    }

    fn regen_bitmaps(&self, layer: &mut BitmapLayer, video: &mut VideoState, full: bool) {
        let spec = layer.spec;
        let width = self.frame.width;

        let recompute = |cache: &mut Vec<u32>, video: &VideoState, x: usize, y: usize| {
            let front = Self::bitmap_pixel(&video.planes[spec.front], spec.front_depth, x, y);
            let rgb = if front != 0 {
                video.palette.rgb(spec.front_color)
            } else {
                let back = Self::bitmap_pixel(&video.planes[spec.back], spec.back_depth, x, y);
                video.palette.rgb(spec.back_palette_base + back as usize)
            };
            cache[y * width + x] = rgb;
        };

        if full {
            for y in 0..self.frame.height {
                for x in 0..width {
                    recompute(&mut layer.cache, video, x, y);
                }
            }
        } else {
            for (plane_idx, depth) in [
                (spec.front, spec.front_depth),
                (spec.back, spec.back_depth),
            ] {
                let ppc = depth.pixels_per_cell();
                let cols = video.planes[plane_idx].cols();
                for index in video.planes[plane_idx].dirty_cells() {
                    let y = index / cols;
                    let x0 = (index % cols) * ppc;
                    for x in x0..x0 + ppc {
                        recompute(&mut layer.cache, video, x, y);
                    }
                }
            }
        }
        video.planes[spec.front].clear_dirty();
        video.planes[spec.back].clear_dirty();
    }

    fn bitmap_pixel(plane: &VideoRam, depth: BitmapDepth, x: usize, y: usize) -> u8 {
        let ppc = depth.pixels_per_cell();
        let cell = plane.cell(y * plane.cols() + x / ppc);
        match depth {
            BitmapDepth::FourBpp => ((cell >> (12 - 4 * (x % ppc))) & 0x0F) as u8,
            BitmapDepth::EightBpp => ((cell >> (8 - 8 * (x % ppc))) & 0xFF) as u8,
        }
    }

    fn compose_background(&mut self, video: &VideoState) {
        let flip = video.flip_screen;
        let (width, height) = (self.frame.width, self.frame.height);

        if let Some(layer) = &self.bitmaps {
            for y in 0..height {
                for x in 0..width {
                    self.frame.put(x, y, flip, layer.cache[y * width + x]);
                }
            }
        } else if let Some(layer) = &self.tilemap {
            let scroll_rows = layer.spec.scroll_rows;
            for y in 0..height {
                let scroll = if y < scroll_rows {
                    video.row_scroll.get(y).copied().unwrap_or(0) as usize
                } else {
                    0
                };
                for x in 0..width {
                    let src_x = (x + scroll) % layer.cache_w;
                    self.frame
                        .put(x, y, flip, layer.cache[y * layer.cache_w + src_x]);
                }
            }
        } else {
            let rgb = video.palette.rgb(0);
            for y in 0..height {
                for x in 0..width {
                    self.frame.put(x, y, flip, rgb);
                }
            }
        }
    }

    fn draw_sprites(&mut self, video: &VideoState) {
        let Some(spec) = self.sprites else {
            return;
        };
        let set = &self.gfx[spec.gfx];
        let (tw, th) = (set.tile_width(), set.tile_height());
        let pens = set.pens();
        let flip = video.flip_screen;
        let bank = video.gfx_bank as usize;
        let (width, height) = (self.frame.width as i32, self.frame.height as i32);

        // Chained sprites accumulate from the previous resolved position.
        let mut base_x = 0i32;
        let mut base_y = 0i32;

        for index in 0..spec.count {
            let code = video.sprites.cell(index * 4) as usize;
            let attr = video.sprites.cell(index * 4 + 1);
            let x = video.sprites.cell(index * 4 + 2) as i16 as i32;
            let y = video.sprites.cell(index * 4 + 3) as i16 as i32;

            let color = (attr & 0x0F) as usize;
            let chained = attr & 0x10 != 0;
            let flip_x = attr & 0x40 != 0;
            let flip_y = attr & 0x80 != 0;

            let (sx, sy) = if chained {
                (base_x + x, base_y + y)
            } else {
                (x, y)
            };
            base_x = sx;
            base_y = sy;

            let pattern = set.pattern(code, bank);
            for ty in 0..th {
                let dy = sy + ty as i32;
                if dy < 0 || dy >= height {
                    continue;
                }
                let py = if flip_y { th - 1 - ty } else { ty };
                for tx in 0..tw {
                    let dx = sx + tx as i32;
                    if dx < 0 || dx >= width {
                        continue;
                    }
                    let px = if flip_x { tw - 1 - tx } else { tx };
                    let pen = pattern[py * tw + px] as usize;
                    // Pen 0 is transparent: the background shows through.
                    if pen == 0 {
                        continue;
                    }
                    let rgb = video.palette.rgb(spec.palette_base + color * pens + pen);
                    self.frame.put(dx as usize, dy as usize, flip, rgb);
                }
            }
        }
    }
}
