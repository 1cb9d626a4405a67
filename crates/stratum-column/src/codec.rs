//! Column file codec.
//!
//! Layout, little endian:
//! - magic `SCOL`, format version `u8`
//! - lowest Y `i32`, highest Y `i32`
//! - heights: `CELLS` x `i32`, row-major `(x, z)`
//! - topmost blocks: `CELLS` x `u32` packed blocks, `u32::MAX` for unknown
//! - biome flag `u8`; when 1, `CELLS` x `u8` biome ids

use std::io::{self, Read, Write};

use stratum_blocks::Block;

use crate::biome::BiomeMap;
use crate::grid::CELLS;

const MAGIC: &[u8; 4] = b"SCOL";
const VERSION: u8 = 1;
const TOPMOST_UNKNOWN: u32 = u32::MAX;

/// Everything a column persists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnData {
    pub heights: Vec<i32>,
    pub lowest_y: i32,
    pub highest_y: i32,
    pub topmost: Vec<Option<Block>>,
    pub biome: Option<BiomeMap>,
}

pub fn write_column<W: Write + ?Sized>(out: &mut W, data: &ColumnData) -> io::Result<()> {
    if data.heights.len() != CELLS || data.topmost.len() != CELLS {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "column grids must hold one entry per cell",
        ));
    }
    let mut buf = Vec::with_capacity(4 + 1 + 8 + CELLS * 9 + 1);
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&data.lowest_y.to_le_bytes());
    buf.extend_from_slice(&data.highest_y.to_le_bytes());
    for h in &data.heights {
        buf.extend_from_slice(&h.to_le_bytes());
    }
    for b in &data.topmost {
        let raw = b.map_or(TOPMOST_UNKNOWN, Block::pack);
        buf.extend_from_slice(&raw.to_le_bytes());
    }
    match &data.biome {
        Some(map) => {
            buf.push(1);
            buf.extend_from_slice(map.as_slice());
        }
        None => buf.push(0),
    }
    out.write_all(&buf)
}

pub fn read_column<R: Read + ?Sized>(input: &mut R) -> io::Result<ColumnData> {
    let mut magic = [0u8; 4];
    input.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(invalid("bad column magic"));
    }
    let version = read_u8(input)?;
    if version != VERSION {
        return Err(invalid(format!("unsupported column version {version}")));
    }
    let lowest_y = read_i32(input)?;
    let highest_y = read_i32(input)?;
    let mut heights = Vec::with_capacity(CELLS);
    for _ in 0..CELLS {
        heights.push(read_i32(input)?);
    }
    let mut topmost = Vec::with_capacity(CELLS);
    for _ in 0..CELLS {
        let raw = read_u32(input)?;
        topmost.push((raw != TOPMOST_UNKNOWN).then(|| Block::unpack(raw)));
    }
    let biome = match read_u8(input)? {
        0 => None,
        1 => {
            let mut ids = vec![0u8; CELLS];
            input.read_exact(&mut ids)?;
            BiomeMap::from_ids(ids)
        }
        other => return Err(invalid(format!("bad biome flag {other}"))),
    };
    Ok(ColumnData {
        heights,
        lowest_y,
        highest_y,
        topmost,
        biome,
    })
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn read_u8<R: Read + ?Sized>(input: &mut R) -> io::Result<u8> {
    let mut b = [0u8; 1];
    input.read_exact(&mut b)?;
    Ok(b[0])
}

fn read_i32<R: Read + ?Sized>(input: &mut R) -> io::Result<i32> {
    let mut b = [0u8; 4];
    input.read_exact(&mut b)?;
    Ok(i32::from_le_bytes(b))
}

fn read_u32<R: Read + ?Sized>(input: &mut R) -> io::Result<u32> {
    let mut b = [0u8; 4];
    input.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}
