//! Tokio codec for announce lines

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::announce::{Announcement, MAX_ANNOUNCE_LENGTH};
use crate::error::ProtocolError;

/// Codec for encoding/decoding newline-terminated announce lines
#[derive(Debug)]
pub struct AnnounceCodec {
    lines: LinesCodec,
}

impl AnnounceCodec {
    /// Create a new codec limited to [`MAX_ANNOUNCE_LENGTH`] bytes per line
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_ANNOUNCE_LENGTH),
        }
    }
}

impl Default for AnnounceCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl From<LinesCodecError> for ProtocolError {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::MaxLineLengthExceeded => ProtocolError::LineTooLong {
                max: MAX_ANNOUNCE_LENGTH,
            },
            LinesCodecError::Io(e) => ProtocolError::Io(e),
        }
    }
}

impl Decoder for AnnounceCodec {
    type Item = Announcement;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.lines.decode(src)? {
            Some(line) => Announcement::parse(&line).map(Some),
            None => Ok(None), // Need more data
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // A peer may close without terminating its only line
        match self.lines.decode_eof(src)? {
            Some(line) => Announcement::parse(&line).map(Some),
            None => Ok(None),
        }
    }
}

impl Encoder<Announcement> for AnnounceCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Announcement, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.lines.encode(item.to_string(), dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_port_line() {
        let mut codec = AnnounceCodec::new();

        let mut buf = BytesMut::new();
        codec
            .encode(Announcement::port(9999, "worker-1"), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"PORT:9999:worker-1\n");

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, Announcement::port(9999, "worker-1"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_partial_read() {
        let mut codec = AnnounceCodec::new();
        let mut buf = BytesMut::from(&b"DIALOG:Secu"[..]);

        // Should return None (need more data)
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"rity Warning\n");
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, Announcement::dialog("Security Warning"));
    }

    #[test]
    fn test_codec_unterminated_line_at_eof() {
        let mut codec = AnnounceCodec::new();
        let mut buf = BytesMut::from(&b"PORT:1234:app"[..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        let decoded = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, Announcement::port(1234, "app"));
    }

    #[test]
    fn test_codec_line_too_long() {
        let mut codec = AnnounceCodec::new();
        let mut buf = BytesMut::from(vec![b'x'; MAX_ANNOUNCE_LENGTH + 1].as_slice());

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::LineTooLong { .. })));
    }

    #[test]
    fn test_codec_invalid_port_is_error() {
        let mut codec = AnnounceCodec::new();
        let mut buf = BytesMut::from(&b"PORT:99999:app\n"[..]);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::InvalidPort(_))));
    }
}
