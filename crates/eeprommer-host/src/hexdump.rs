//! Hex dump formatting for payload diagnostics.

/// Bytes shown per dump row.
pub const ROW_WIDTH: usize = 16;

/// Format `data` as a classic hex dump, one line per 16 bytes:
///
/// ```text
/// 0000  48 65 6c 6c 6f 2c 20 77  6f 72 6c 64 21 0a       |Hello, world!.|
/// ```
///
/// `base` is the offset printed for the first byte, so a dump of a read can
/// show file positions.
pub fn hexdump(data: &[u8], base: usize) -> String {
    let mut out = String::new();

    for (row, chunk) in data.chunks(ROW_WIDTH).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{:04x}  ", base + row * ROW_WIDTH));

        let encoded = hex::encode(chunk);
        for i in 0..ROW_WIDTH {
            match encoded.get(i * 2..i * 2 + 2) {
                Some(pair) => out.push_str(pair),
                None => out.push_str("  "),
            }
            out.push(' ');
            if i == ROW_WIDTH / 2 - 1 {
                out.push(' ');
            }
        }

        out.push('|');
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push('|');
    }

    out
}

/// Compact single-line hex for short payloads (`cd ab`).
pub fn hex_line(data: &[u8]) -> String {
    let encoded = hex::encode(data);
    let pairs: Vec<&str> = (0..data.len()).map(|i| &encoded[i * 2..i * 2 + 2]).collect();
    pairs.join(" ")
}
