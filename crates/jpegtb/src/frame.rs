use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

/// End-of-image marker appended to every captured frame.
pub const END_OF_IMAGE: [u8; 2] = [0xff, 0xd9];

const START_OF_IMAGE: [u8; 2] = [0xff, 0xd8];
const START_OF_SCAN: u8 = 0xda;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("stream does not start with an SOI marker")]
    MissingStartOfImage,
    #[error("stream does not end with an EOI marker")]
    MissingEndOfImage,
    #[error("no start-of-scan segment found before end of stream")]
    MissingStartOfScan,
    #[error("expected a marker at offset {offset}, found {found:#04x}")]
    BadMarker { offset: usize, found: u8 },
    #[error("segment at offset {offset} runs past the end of the stream")]
    Truncated { offset: usize },
    #[error("header is empty")]
    EmptyHeader,
    #[error("failed to read header {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The fixed bytes wrapped around every captured payload.
///
/// The header holds everything up to and including the start-of-scan
/// segment, so it pins the frame dimensions and tables for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFormat {
    header: Arc<[u8]>,
}

impl FrameFormat {
    pub fn new(header: impl Into<Arc<[u8]>>) -> Result<Self, FrameError> {
        let header = header.into();
        if header.is_empty() {
            return Err(FrameError::EmptyHeader);
        }
        Ok(Self { header })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FrameError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| FrameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::new(bytes)
    }

    /// Takes the header of a complete reference stream.
    pub fn from_reference(stream: &[u8]) -> Result<Self, FrameError> {
        let (header, _) = split_jpeg(stream)?;
        Self::new(header)
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// `header ++ payload ++ EOI`
    pub fn assemble(&self, payload: &[u8]) -> Vec<u8> {
        let mut stream = Vec::with_capacity(self.header.len() + payload.len() + END_OF_IMAGE.len());
        stream.extend_from_slice(&self.header);
        stream.extend_from_slice(payload);
        stream.extend_from_slice(&END_OF_IMAGE);
        stream
    }
}

/// Splits a baseline JPEG stream into its header (SOI through the SOS
/// segment) and the entropy coded payload, dropping the trailing EOI.
pub fn split_jpeg(stream: &[u8]) -> Result<(&[u8], &[u8]), FrameError> {
    if !stream.starts_with(&START_OF_IMAGE) {
        return Err(FrameError::MissingStartOfImage);
    }
    if stream.len() < 4 || !stream.ends_with(&END_OF_IMAGE) {
        return Err(FrameError::MissingEndOfImage);
    }
    let body_end = stream.len() - END_OF_IMAGE.len();

    let mut offset = START_OF_IMAGE.len();
    while offset + 4 <= body_end {
        if stream[offset] != 0xff {
            return Err(FrameError::BadMarker {
                offset,
                found: stream[offset],
            });
        }
        let marker = stream[offset + 1];
        // Fill bytes may precede any marker.
        if marker == 0xff {
            offset += 1;
            continue;
        }
        let length = u16::from_be_bytes([stream[offset + 2], stream[offset + 3]]) as usize;
        let segment_end = offset + 2 + length;
        if length < 2 || segment_end > body_end {
            return Err(FrameError::Truncated { offset });
        }
        if marker == START_OF_SCAN {
            return Ok((&stream[..segment_end], &stream[segment_end..body_end]));
        }
        offset = segment_end;
    }
    Err(FrameError::MissingStartOfScan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![0xff, marker];
        out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn stream(scan: &[u8]) -> Vec<u8> {
        let mut out = START_OF_IMAGE.to_vec();
        out.extend(segment(0xe0, b"JFIF\0"));
        out.extend(segment(0xdb, &[0; 65]));
        out.extend(segment(START_OF_SCAN, &[1, 1, 0, 0, 63, 0]));
        out.extend_from_slice(scan);
        out.extend_from_slice(&END_OF_IMAGE);
        out
    }

    #[test]
    fn split_separates_header_and_payload() {
        let data = stream(&[0x12, 0x34, 0xff, 0x00, 0x56]);
        let (header, payload) = split_jpeg(&data).unwrap();
        assert_eq!(payload, &[0x12, 0x34, 0xff, 0x00, 0x56]);
        assert_eq!(header.len() + payload.len() + 2, data.len());
        assert_eq!(&header[header.len() - 10..header.len() - 8], &[0xff, START_OF_SCAN]);
    }

    #[test]
    fn assemble_restores_the_reference_stream() {
        let data = stream(&[0xaa; 17]);
        let format = FrameFormat::from_reference(&data).unwrap();
        let (_, payload) = split_jpeg(&data).unwrap();
        assert_eq!(format.assemble(payload), data);
    }

    #[test]
    fn split_rejects_malformed_streams() {
        assert!(matches!(
            split_jpeg(&[0x00, 0x01, 0xff, 0xd9]),
            Err(FrameError::MissingStartOfImage)
        ));
        assert!(matches!(
            split_jpeg(&[0xff, 0xd8, 0x00]),
            Err(FrameError::MissingEndOfImage)
        ));

        let mut no_scan = START_OF_IMAGE.to_vec();
        no_scan.extend(segment(0xdb, &[0; 4]));
        no_scan.extend_from_slice(&END_OF_IMAGE);
        assert!(matches!(
            split_jpeg(&no_scan),
            Err(FrameError::MissingStartOfScan)
        ));

        let mut truncated = START_OF_IMAGE.to_vec();
        truncated.extend_from_slice(&[0xff, 0xdb, 0x01, 0x00]);
        truncated.extend_from_slice(&END_OF_IMAGE);
        assert!(matches!(
            split_jpeg(&truncated),
            Err(FrameError::Truncated { offset: 2 })
        ));
    }

    #[test]
    fn empty_header_is_rejected() {
        assert!(matches!(
            FrameFormat::new(Vec::<u8>::new()),
            Err(FrameError::EmptyHeader)
        ));
    }

    #[test]
    fn header_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.bin");
        let data = stream(&[1, 2, 3]);
        let (header, _) = split_jpeg(&data).unwrap();
        std::fs::write(&path, header).unwrap();

        let format = FrameFormat::from_file(&path).unwrap();
        assert_eq!(format.header(), header);

        let missing = FrameFormat::from_file(dir.path().join("missing.bin"));
        assert!(matches!(missing, Err(FrameError::Io { .. })));
    }
}
