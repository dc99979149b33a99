//! Symbolic permission strings (`rwxr-x---`) to numeric mode bits.

/// Parse a 9-character `rwxrwxrwx` permission string into mode bits.
///
/// Each position accepts its letter or `-`. Anything else, or any other
/// length, yields `None`; callers turn that into a configuration error rather
/// than silently using mode 0.
pub fn parse_symbolic_mode(perm: &str) -> Option<u32> {
    const LETTERS: [u8; 3] = [b'r', b'w', b'x'];

    let bytes = perm.as_bytes();
    if bytes.len() != 9 {
        return None;
    }

    let mut mode = 0u32;
    for (i, &b) in bytes.iter().enumerate() {
        let letter = LETTERS[i % 3];
        mode <<= 1;
        if b == letter {
            mode |= 1;
        } else if b != b'-' {
            return None;
        }
    }
    Some(mode)
}

/// Render mode bits back to the symbolic form (used in log lines).
pub fn render_symbolic_mode(mode: u32) -> String {
    const LETTERS: [char; 3] = ['r', 'w', 'x'];
    (0..9)
        .map(|i| {
            if mode & (1 << (8 - i)) != 0 {
                LETTERS[i % 3]
            } else {
                '-'
            }
        })
        .collect()
}
