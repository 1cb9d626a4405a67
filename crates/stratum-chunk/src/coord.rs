/// Blocks per chunk edge, as a shift.
pub const CHUNK_BITS: u32 = 4;
pub const CHUNK_SIZE: usize = 1 << CHUNK_BITS;
pub const CHUNK_MASK: i32 = CHUNK_SIZE as i32 - 1;
/// Chunks per region edge, as a shift.
pub const REGION_BITS: u32 = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    #[inline]
    pub const fn from_world(wx: i32, wy: i32, wz: i32) -> Self {
        Self {
            cx: wx >> CHUNK_BITS,
            cy: wy >> CHUNK_BITS,
            cz: wz >> CHUNK_BITS,
        }
    }

    #[inline]
    pub const fn base_x(self) -> i32 {
        self.cx << CHUNK_BITS
    }

    #[inline]
    pub const fn base_y(self) -> i32 {
        self.cy << CHUNK_BITS
    }

    #[inline]
    pub const fn base_z(self) -> i32 {
        self.cz << CHUNK_BITS
    }

    #[inline]
    pub const fn column(self) -> ColumnKey {
        ColumnKey::new(self.cx, self.cz)
    }
}

impl From<(i32, i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkCoord> for (i32, i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cy, value.cz)
    }
}

/// Identity of a surface column: the chunk x/z it spans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub cx: i32,
    pub cz: i32,
}

impl ColumnKey {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub const fn from_world(wx: i32, wz: i32) -> Self {
        Self::new(wx >> CHUNK_BITS, wz >> CHUNK_BITS)
    }

    #[inline]
    pub const fn base_x(self) -> i32 {
        self.cx << CHUNK_BITS
    }

    #[inline]
    pub const fn base_z(self) -> i32 {
        self.cz << CHUNK_BITS
    }

    #[inline]
    pub const fn region(self) -> RegionKey {
        RegionKey {
            rx: self.cx >> REGION_BITS,
            rz: self.cz >> REGION_BITS,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RegionKey {
    pub rx: i32,
    pub rz: i32,
}
