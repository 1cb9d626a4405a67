pub type BlockId = u16;
pub type BlockState = u16;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block {
    pub id: BlockId,
    pub state: BlockState,
}

impl Block {
    pub const AIR: Block = Block { id: 0, state: 0 };

    #[inline]
    pub const fn new(id: BlockId) -> Self {
        Self { id, state: 0 }
    }

    /// Packs the block into a single word so it can live in an atomic cell.
    #[inline]
    pub const fn pack(self) -> u32 {
        ((self.id as u32) << 16) | self.state as u32
    }

    #[inline]
    pub const fn unpack(raw: u32) -> Self {
        Self {
            id: (raw >> 16) as u16,
            state: (raw & 0xFFFF) as u16,
        }
    }

    #[inline]
    pub fn is_air(self) -> bool {
        self.id == Self::AIR.id
    }
}
