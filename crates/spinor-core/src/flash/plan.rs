//! Request splitting for program and erase sequences
//!
//! Pure arithmetic, no bus access. All sizes are powers of two.

/// One page-program command worth of a write request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChunk {
    /// Flash address of the first data byte
    pub address: u32,
    /// Offset of the chunk in the caller's buffer
    pub offset: usize,
    /// Data bytes in this chunk
    pub len: usize,
}

/// Iterator over the page-respecting chunks of a write
#[derive(Debug, Clone)]
pub struct PageChunks {
    address: u64,
    offset: usize,
    remaining: usize,
    page_size: u32,
}

/// Split `[address, address + len)` so that no chunk crosses a page boundary
pub fn page_chunks(address: u32, len: usize, page_size: u32) -> PageChunks {
    PageChunks {
        address: address as u64,
        offset: 0,
        remaining: len,
        page_size,
    }
}

impl Iterator for PageChunks {
    type Item = PageChunk;

    fn next(&mut self) -> Option<PageChunk> {
        if self.remaining == 0 {
            return None;
        }
        let page = self.page_size as u64;
        let room = (page - self.address % page) as usize;
        let len = core::cmp::min(self.remaining, room);
        let chunk = PageChunk {
            address: self.address as u32,
            offset: self.offset,
            len,
        };
        self.address += len as u64;
        self.offset += len;
        self.remaining -= len;
        Some(chunk)
    }
}

/// 0xFF padding needed to widen `[address, address + len)` to `alignment`
///
/// Returns `(pre, post)`: bytes before the first data byte down to the
/// previous boundary and bytes after the last data byte up to the next one.
pub fn padding(address: u32, len: usize, alignment: u32) -> (u32, u32) {
    let align = alignment as u64;
    let pre = (address as u64 % align) as u32;
    let end = address as u64 + len as u64;
    let post = ((align - end % align) % align) as u32;
    (pre, post)
}

/// Iterator over sector base addresses
#[derive(Debug, Clone)]
pub struct Sectors {
    next: u64,
    last: u64,
    sector_size: u64,
}

/// Sectors erased for a request at `address` of `len` bytes
///
/// Runs from the sector containing `address` to the sector containing
/// `address + len`, both inclusive. A request ending exactly on a sector
/// boundary therefore also erases the following sector. Sectors at or past
/// `capacity` are skipped.
pub fn covered_sectors(address: u64, len: u64, sector_size: u32, capacity: u64) -> Sectors {
    let ss = sector_size as u64;
    let first = address - address % ss;
    let end = address + len;
    let last = core::cmp::min(end - end % ss, capacity.saturating_sub(ss));
    Sectors {
        next: first,
        last,
        sector_size: ss,
    }
}

impl Iterator for Sectors {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next > self.last {
            return None;
        }
        let sector = self.next;
        self.next += self.sector_size;
        Some(sector as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn test_chunks_within_one_page() {
        let chunks: Vec<_> = page_chunks(0x10, 32, 256).collect();
        assert_eq!(
            chunks,
            vec![PageChunk {
                address: 0x10,
                offset: 0,
                len: 32
            }]
        );
    }

    #[test]
    fn test_chunks_split_at_page_boundary() {
        let chunks: Vec<_> = page_chunks(251, 10, 256).collect();
        assert_eq!(
            chunks,
            vec![
                PageChunk {
                    address: 251,
                    offset: 0,
                    len: 5
                },
                PageChunk {
                    address: 256,
                    offset: 5,
                    len: 5
                },
            ]
        );
    }

    #[test]
    fn test_chunks_span_many_pages() {
        let chunks: Vec<_> = page_chunks(0x80, 1024, 256).collect();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0].len, 0x80);
        assert!(chunks[1..4].iter().all(|c| c.len == 256 && c.address % 256 == 0));
        assert_eq!(chunks[4].len, 0x80);
        assert_eq!(chunks.iter().map(|c| c.len).sum::<usize>(), 1024);
    }

    #[test]
    fn test_chunks_empty() {
        assert_eq!(page_chunks(0, 0, 256).count(), 0);
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding(0x100, 16, 16), (0, 0));
        assert_eq!(padding(0x103, 2, 16), (3, 11));
        assert_eq!(padding(0x10F, 1, 16), (15, 0));
        assert_eq!(padding(0x42, 7, 1), (0, 0));
        assert_eq!(padding(0x41, 2, 2), (1, 1));
    }

    #[test]
    fn test_covered_sectors_over_erase() {
        let cap = 16 * 4096;
        let s: Vec<_> = covered_sectors(4097, 1, 4096, cap).collect();
        assert_eq!(s, vec![4096]);

        // an aligned length also reaches the following sector
        let s: Vec<_> = covered_sectors(0, 8192, 4096, cap).collect();
        assert_eq!(s, vec![0, 4096, 8192]);

        let s: Vec<_> = covered_sectors(4095, 2, 4096, cap).collect();
        assert_eq!(s, vec![0, 4096]);
    }

    #[test]
    fn test_covered_sectors_clamped_to_capacity() {
        let cap = 4 * 4096;
        let s: Vec<_> = covered_sectors(0, cap, 4096, cap).collect();
        assert_eq!(s, vec![0, 4096, 8192, 12288]);
    }
}
