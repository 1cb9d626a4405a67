/// Immutable copy of a column's heights, anchored at its world origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeightMapBuffer {
    pub origin_x: i32,
    pub origin_z: i32,
    pub size_x: usize,
    pub size_z: usize,
    heights: Box<[i32]>,
}

impl HeightMapBuffer {
    /// `heights` is row-major `(x, z)` and must hold `size_x * size_z` values.
    pub fn new(origin_x: i32, origin_z: i32, size_x: usize, size_z: usize, heights: Vec<i32>) -> Self {
        assert_eq!(heights.len(), size_x * size_z);
        Self {
            origin_x,
            origin_z,
            size_x,
            size_z,
            heights: heights.into_boxed_slice(),
        }
    }

    /// Height at world `(wx, wz)`, or `None` outside the buffer.
    pub fn get(&self, wx: i32, wz: i32) -> Option<i32> {
        let lx = wx.checked_sub(self.origin_x)?;
        let lz = wz.checked_sub(self.origin_z)?;
        if lx < 0 || lz < 0 || lx as usize >= self.size_x || lz as usize >= self.size_z {
            return None;
        }
        Some(self.heights[lx as usize * self.size_z + lz as usize])
    }

    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        &self.heights
    }
}
