//! Handle kind tags used by the tagged wire form.
//!
//! Tag 0 is never written, so a zeroed buffer does not decode as a handle.

/// Backing-store reference of an `ArrayBuffer` or `SharedArrayBuffer`.
pub const BUFFER: u8 = 1;

/// Opaque native pointer.
pub const EXTERNAL: u8 = 2;

/// Returns a human-readable name for a kind tag.
pub fn kind_name(tag: u8) -> &'static str {
    match tag {
        BUFFER => "BUFFER",
        EXTERNAL => "EXTERNAL",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(kind_name(BUFFER), "BUFFER");
        assert_eq!(kind_name(EXTERNAL), "EXTERNAL");
        assert_eq!(kind_name(0), "UNKNOWN");
    }
}
