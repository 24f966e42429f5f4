use crate::error::SortError;
use exif::{Exif, In, Reader, Tag, Value};
use log::debug;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;

/// What the metadata reader found for `DateTimeOriginal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExifDate {
    /// Raw tag value, not parsed.
    Present(String),
    /// No EXIF-bearing container, or the tag is absent.
    NotPresent,
    /// Container recognized but its EXIF block could not be decoded.
    Unreadable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Jpeg,
    Tiff,
}

impl Container {
    fn sniff(magic: &[u8]) -> Option<Self> {
        match magic {
            [0xFF, 0xD8, ..] => Some(Self::Jpeg),
            [b'I', b'I', 0x2A, 0x00] | [b'M', b'M', 0x00, 0x2A] => Some(Self::Tiff),
            _ => None,
        }
    }

    fn read_exif<R: io::BufRead + Seek>(self, reader: &mut R) -> Result<Exif, exif::Error> {
        match self {
            Self::Jpeg => Reader::new().read_from_container(reader),
            Self::Tiff => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                Reader::new().read_raw(data)
            }
        }
    }
}

/// Reads the raw `DateTimeOriginal` string of a JPEG or TIFF file.
///
/// Only failures to open or read the file are returned as errors; anything
/// wrong with the EXIF data itself becomes [`ExifDate::Unreadable`].
pub fn read_date_time_original(path: &Path) -> Result<ExifDate, SortError> {
    let file = File::open(path).map_err(|err| SortError::io(path, err))?;
    let mut buf = BufReader::new(file);

    let mut magic = Vec::with_capacity(4);
    (&mut buf)
        .take(4)
        .read_to_end(&mut magic)
        .map_err(|err| SortError::io(path, err))?;
    let Some(container) = Container::sniff(&magic) else {
        return Ok(ExifDate::NotPresent);
    };
    buf.rewind().map_err(|err| SortError::io(path, err))?;

    let exif = match container.read_exif(&mut buf) {
        Ok(exif) => exif,
        Err(exif::Error::Io(err)) if err.kind() != io::ErrorKind::UnexpectedEof => {
            return Err(SortError::io(path, err));
        }
        Err(exif::Error::NotFound(_)) => {
            debug!("{:?} container without EXIF block: {}", container, path.display());
            return Ok(ExifDate::NotPresent);
        }
        Err(err) => {
            debug!("unreadable EXIF in {}: {err}", path.display());
            return Ok(ExifDate::Unreadable);
        }
    };

    Ok(date_time_original(&exif))
}

fn date_time_original(exif: &Exif) -> ExifDate {
    let field = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .or_else(|| exif.fields().find(|f| f.tag == Tag::DateTimeOriginal));

    match field.map(|f| &f.value) {
        None => ExifDate::NotPresent,
        Some(Value::Ascii(parts)) => match parts.first() {
            Some(raw) => ExifDate::Present(String::from_utf8_lossy(raw).into_owned()),
            None => ExifDate::Unreadable,
        },
        Some(_) => ExifDate::Unreadable,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Minimal little-endian TIFF: IFD0 points at an Exif IFD holding
    /// a single `DateTimeOriginal` entry.
    pub fn tiff_with_date(date: &str) -> Vec<u8> {
        tiff_in_byte_order(date, false)
    }

    /// Same layout as [`tiff_with_date`], written as a Motorola (`MM`) file.
    pub fn tiff_with_date_be(date: &str) -> Vec<u8> {
        tiff_in_byte_order(date, true)
    }

    fn tiff_in_byte_order(date: &str, big_endian: bool) -> Vec<u8> {
        let u16_bytes = |v: u16| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        let u32_bytes = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };

        let mut value = date.as_bytes().to_vec();
        value.push(0);
        let exif_ifd: u32 = 8 + 2 + 12 + 4;
        let value_offset: u32 = exif_ifd + 2 + 12 + 4;

        let mut out = Vec::new();
        out.extend_from_slice(if big_endian { b"MM" } else { b"II" });
        out.extend_from_slice(&u16_bytes(42));
        out.extend_from_slice(&u32_bytes(8));

        // IFD0
        out.extend_from_slice(&u16_bytes(1));
        out.extend_from_slice(&u16_bytes(0x8769));
        out.extend_from_slice(&u16_bytes(4));
        out.extend_from_slice(&u32_bytes(1));
        out.extend_from_slice(&u32_bytes(exif_ifd));
        out.extend_from_slice(&u32_bytes(0));

        // Exif IFD
        out.extend_from_slice(&u16_bytes(1));
        out.extend_from_slice(&u16_bytes(0x9003));
        out.extend_from_slice(&u16_bytes(2));
        out.extend_from_slice(&u32_bytes(value.len() as u32));
        out.extend_from_slice(&u32_bytes(value_offset));
        out.extend_from_slice(&u32_bytes(0));

        out.extend_from_slice(&value);
        out
    }

    /// Wraps a TIFF block into an APP1 segment of an otherwise empty JPEG.
    pub fn jpeg_with_date(date: &str) -> Vec<u8> {
        let tiff = tiff_with_date(date);
        let segment_len = (2 + 6 + tiff.len()) as u16;

        let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
        out.extend_from_slice(&segment_len.to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }
}
