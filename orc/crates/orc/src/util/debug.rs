//! Debug Utilities
//!
//! Helpers for diagnostics output.

/// Debug formatter for memory addresses
pub fn format_address(address: usize) -> String {
    format!("0x{:016X}", address)
}

/// Hex dump of `size` bytes starting at `start`, 16 bytes per line
///
/// # Safety
/// `start..start + size` must be readable memory.
pub unsafe fn dump_bytes(start: *const u8, size: usize) -> String {
    let mut out = String::new();

    for offset in (0..size).step_by(16) {
        out.push_str(&format_address(start as usize + offset));
        out.push(':');

        for j in offset..(offset + 16).min(size) {
            out.push_str(&format!(" {:02X}", *start.add(j)));
        }

        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_address() {
        assert_eq!(format_address(0x1000), "0x0000000000001000");
    }

    #[test]
    fn test_dump_bytes() {
        let bytes = [0xABu8; 20];
        let dump = unsafe { dump_bytes(bytes.as_ptr(), bytes.len()) };
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" AB AB AB AB AB AB AB AB AB AB AB AB AB AB AB AB"));
        assert!(lines[1].ends_with(": AB AB AB AB"));
    }
}
