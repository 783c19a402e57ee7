use crate::board::ConfigError;

/// Describes how tile pixels are packed in graphics ROM.
///
/// Every value is a *bit* offset from the start of a tile's data: one
/// offset per bitplane, one per pixel column, one per pixel row. The bit
/// address of pixel (x, y) in plane p of tile n is
/// `n * char_increment + planes[p] + y_offsets[y] + x_offsets[x]`, with
/// bit 0 being the most significant bit of byte 0.
#[derive(Debug, Clone)]
pub struct GfxLayout {
    pub width: usize,
    pub height: usize,
    pub count: usize,
    pub planes: Vec<usize>,
    pub x_offsets: Vec<usize>,
    pub y_offsets: Vec<usize>,
    /// Bits from one tile's data to the next.
    pub char_increment: usize,
}

impl GfxLayout {
    /// Conventional packed 4bpp layout: four consecutive bitplane nibbles
    /// per pixel row pair, as used by the tile ROMs this core was built
    /// around. Handy for tests and simple boards.
    pub fn packed_4bpp(width: usize, height: usize, count: usize) -> Self {
        Self {
            width,
            height,
            count,
            planes: vec![0, 1, 2, 3],
            x_offsets: (0..width).map(|x| x * 4).collect(),
            y_offsets: (0..height).map(|y| y * width * 4).collect(),
            char_increment: width * height * 4,
        }
    }

    pub fn bits_per_pixel(&self) -> usize {
        self.planes.len()
    }
}

/// Decoded tile patterns: one byte per pixel, tiles stored row-major.
///
/// Decoding happens once at machine build; blitting never goes back to
/// the planar ROM data. `bank_tiles` partitions the set into switchable
/// banks when a side register multiplexes several pattern groups over
/// one tile-index space.
pub struct GfxSet {
    width: usize,
    height: usize,
    count: usize,
    bank_tiles: usize,
    bits_per_pixel: usize,
    pixels: Vec<u8>,
}

impl GfxSet {
    /// Decode planar graphics data. `bank_tiles` of zero means the set is
    /// not banked (the whole set is one bank).
    pub fn decode(data: &[u8], layout: &GfxLayout, bank_tiles: usize) -> Result<Self, ConfigError> {
        if layout.width == 0
            || layout.height == 0
            || layout.count == 0
            || layout.planes.is_empty()
            || layout.x_offsets.len() != layout.width
            || layout.y_offsets.len() != layout.height
        {
            return Err(ConfigError::BadGfxLayout);
        }

        let total_bits = data.len() * 8;
        let mut pixels = vec![0u8; layout.count * layout.width * layout.height];
        for tile in 0..layout.count {
            let base = tile * layout.char_increment;
            for y in 0..layout.height {
                for x in 0..layout.width {
                    let mut pen = 0u8;
                    for (p, &plane_offset) in layout.planes.iter().enumerate() {
                        let bit = base + plane_offset + layout.y_offsets[y] + layout.x_offsets[x];
                        if bit >= total_bits {
                            return Err(ConfigError::GfxDataTooSmall {
                                needed_bits: bit + 1,
                                have_bits: total_bits,
                            });
                        }
                        if read_bit(data, bit) {
                            pen |= 1 << (layout.planes.len() - 1 - p);
                        }
                    }
                    pixels[(tile * layout.height + y) * layout.width + x] = pen;
                }
            }
        }

        Ok(Self {
            width: layout.width,
            height: layout.height,
            count: layout.count,
            bank_tiles: if bank_tiles == 0 {
                layout.count
            } else {
                bank_tiles
            },
            bits_per_pixel: layout.planes.len(),
            pixels,
        })
    }

    pub fn tile_width(&self) -> usize {
        self.width
    }

    pub fn tile_height(&self) -> usize {
        self.height
    }

    pub fn tile_count(&self) -> usize {
        self.count
    }

    pub fn bank_count(&self) -> usize {
        self.count / self.bank_tiles
    }

    /// Colors per tile color group, `2^bpp`.
    pub fn pens(&self) -> usize {
        1 << self.bits_per_pixel
    }

    /// Pattern bytes for a tile, `width * height` pens row-major. The
    /// code is taken modulo the bank size and offset into the selected
    /// bank, so a wild index can never escape the decoded data.
    pub fn pattern(&self, code: usize, bank: usize) -> &[u8] {
        let bank = bank % self.bank_count().max(1);
        let tile = bank * self.bank_tiles + code % self.bank_tiles;
        let stride = self.width * self.height;
        &self.pixels[tile * stride..(tile + 1) * stride]
    }
}

fn read_bit(data: &[u8], bit: usize) -> bool {
    (data[bit / 8] >> (7 - bit % 8)) & 1 != 0
}
