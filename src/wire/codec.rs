use crate::error::WireError;
use crate::wire::message::Message;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Hard cap on a single framed message, per spec §4.1.
pub const MAX_FRAME_BYTES: usize = 1024;

/// Frames the Kierki wire protocol: CRLF-terminated ASCII lines, capped at
/// [`MAX_FRAME_BYTES`]. A line exceeding the cap without a `\r\n` terminator
/// is a framing error, never a panic.
#[derive(Debug, Default)]
pub struct KierkiCodec;

impl Decoder for KierkiCodec {
    type Item = Message;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(pos) = find_crlf(src) {
            let line = src.split_to(pos);
            src.advance(2); // drop the CRLF itself
            let text = std::str::from_utf8(&line)
                .map_err(|e| WireError::Malformed(format!("non-UTF8 frame: {e}")))?;
            return Message::parse(text).map(Some);
        }

        if src.len() > MAX_FRAME_BYTES {
            return Err(WireError::FrameTooLong);
        }

        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None if src.is_empty() => Ok(None),
            None => {
                // Unterminated trailing bytes on EOF: treated as peer close
                // per spec §4.1, not as a framing error.
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<Message> for KierkiCodec {
    type Error = WireError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.to_string();
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}

fn find_crlf(buf: &BytesMut) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
