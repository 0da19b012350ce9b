//! Capture-time extraction from embedded image metadata.

use std::io::Cursor;

use ::exif::{DateTime, In, Reader, Tag, Value};

/// Tags consulted for the capture time, most specific first.
const TIME_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Read the capture time of an image as `HH:MM`.
///
/// Any failure (no metadata, unsupported container, corrupt data, an
/// unparseable date) yields `None`; it never aborts the caller.
pub fn capture_time(bytes: &[u8]) -> Option<String> {
    let mut cursor = Cursor::new(bytes);
    let exif = Reader::new().read_from_container(&mut cursor).ok()?;

    TIME_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        let Value::Ascii(ref values) = field.value else {
            return None;
        };
        let parsed = DateTime::from_ascii(values.first()?).ok()?;
        (parsed.hour < 24 && parsed.minute < 60)
            .then(|| format!("{:02}:{:02}", parsed.hour, parsed.minute))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian TIFF with a single IFD0 `DateTime` entry.
    fn tiff_with_datetime(stamp: &[u8; 19]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"II");
        buf.extend_from_slice(&42u16.to_le_bytes());
        buf.extend_from_slice(&8u32.to_le_bytes());
        // IFD0 with one entry.
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&0x0132u16.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&20u32.to_le_bytes());
        buf.extend_from_slice(&26u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(stamp);
        buf.push(0);
        buf
    }

    #[test]
    fn test_reads_datetime_tag() {
        let image = tiff_with_datetime(b"2026:02:07 14:30:05");
        assert_eq!(capture_time(&image).as_deref(), Some("14:30"));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(capture_time(b""), None);
        assert_eq!(capture_time(b"definitely not an image"), None);
        assert_eq!(capture_time(&[0xFF, 0xD8, 0xFF, 0xD9]), None);
    }

    #[test]
    fn test_unparseable_stamp_is_none() {
        let image = tiff_with_datetime(b"not-a-date-at-all!!");
        assert_eq!(capture_time(&image), None);
    }
}
