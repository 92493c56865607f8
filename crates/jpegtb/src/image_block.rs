use itertools::iproduct;

/// Edge length of the encoder's native input tile.
pub const BLOCK_SIZE: u32 = 8;

/// Packs an RGB pixel into the encoder's input word: blue in the high byte,
/// red in the low byte.
pub fn pack_rgb([r, g, b]: [u8; 3]) -> u32 {
    ((b as u32) << 16) | ((g as u32) << 8) | r as u32
}

/// Inverse of [`pack_rgb`]. Bits above the low 24 are ignored.
pub fn unpack_rgb(word: u32) -> [u8; 3] {
    [word as u8, (word >> 8) as u8, (word >> 16) as u8]
}

/// An 8x8 window into an image, addressed by its top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBlock {
    pub index: usize,
    pub x: u32,
    pub y: u32,
}

impl PixelBlock {
    /// Image coordinate read for the block-relative position `(dx, dy)`.
    /// Positions past the right or bottom edge repeat the last column or row.
    pub fn source(&self, dx: u32, dy: u32, width: u32, height: u32) -> (u32, u32) {
        (
            (self.x + dx).min(width - 1),
            (self.y + dy).min(height - 1),
        )
    }
}

/// Row-major tiling of a `width` x `height` image into 8x8 blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    width: u32,
    height: u32,
}

impl BlockGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn columns(&self) -> u32 {
        self.width.div_ceil(BLOCK_SIZE)
    }

    pub fn rows(&self) -> u32 {
        self.height.div_ceil(BLOCK_SIZE)
    }

    pub fn len(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn block(&self, index: usize) -> Option<PixelBlock> {
        if index >= self.len() {
            return None;
        }
        let columns = self.columns() as usize;
        Some(PixelBlock {
            index,
            x: (index % columns) as u32 * BLOCK_SIZE,
            y: (index / columns) as u32 * BLOCK_SIZE,
        })
    }

    /// The block covering the bottom-right corner.
    pub fn is_last(&self, block: &PixelBlock) -> bool {
        block.index + 1 == self.len()
    }

    pub fn blocks(&self) -> impl Iterator<Item = PixelBlock> + '_ {
        iproduct!(0..self.rows(), 0..self.columns())
            .enumerate()
            .map(|(index, (row, column))| PixelBlock {
                index,
                x: column * BLOCK_SIZE,
                y: row * BLOCK_SIZE,
            })
    }
}
