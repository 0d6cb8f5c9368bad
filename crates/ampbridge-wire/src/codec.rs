use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Result, WireError};

/// Frame header: start sequence (4) + length (4) + checksum (4) + reserved (8) = 20 bytes.
pub const HEADER_SIZE: usize = 20;

/// Start sequence preceding every frame header.
pub const MAGIC: [u8; 4] = [0x18, 0x96, 0x18, 0x20];

/// Default maximum payload size: 64 KiB. Device messages are short ASCII
/// commands; anything larger means the stream is out of sync.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Additive checksum used by the device firmware: the wrapping sum of all
/// payload bytes. Not a CRC.
pub fn checksum(payload: &[u8]) -> u32 {
    payload
        .iter()
        .fold(0u32, |sum, &b| sum.wrapping_add(u32::from(b)))
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌─────────────────────┬───────────┬───────────┬───────────┬─────────────────┐
/// │ Start sequence (4B) │ Length    │ Checksum  │ Reserved  │ Payload         │
/// │ 0x18 0x96 0x18 0x20 │ (4B LE)   │ (4B LE)   │ (8B zero) │ (Length bytes)  │
/// └─────────────────────┴───────────┴───────────┴───────────┴─────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(WireError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(payload.len() as u32);
    dst.put_u32_le(checksum(payload));
    dst.put_slice(&[0u8; 8]);
    dst.put_slice(payload);
    Ok(())
}

/// Decode the next frame from a buffer of stream data.
///
/// Skips any bytes preceding the next start sequence, so a stream that lost
/// alignment (or delivered garbage between frames) resynchronizes by itself.
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
///
/// An implausible length field yields [`WireError::PayloadTooLarge`] and
/// consumes the offending start sequence, so the next call scans onward.
/// The header checksum is ignored unless `verify_checksum` is set; devices
/// in the field are known to send frames whose checksum doesn't add up.
pub fn decode_frame(
    src: &mut BytesMut,
    max_payload: usize,
    verify_checksum: bool,
) -> Result<Option<Bytes>> {
    let Some(start) = find_magic(src) else {
        // Keep a tail that could be a partial start sequence.
        let keep = src.len().min(MAGIC.len() - 1);
        src.advance(src.len() - keep);
        return Ok(None);
    };
    if start > 0 {
        tracing::trace!(discarded = start, "skipped bytes before start sequence");
        src.advance(start);
    }

    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let payload_len = u32::from_le_bytes(src[4..8].try_into().unwrap()) as usize;
    let header_checksum = u32::from_le_bytes(src[8..12].try_into().unwrap());

    if payload_len > max_payload {
        // Consume the start sequence so the next call rescans past it.
        src.advance(MAGIC.len());
        return Err(WireError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    if verify_checksum {
        let computed = checksum(&payload);
        if computed != header_checksum {
            return Err(WireError::ChecksumMismatch {
                header: header_checksum,
                computed,
            });
        }
    }

    Ok(Some(payload))
}

fn find_magic(buf: &[u8]) -> Option<usize> {
    buf.windows(MAGIC.len()).position(|window| window == MAGIC)
}

/// Frame codec for use with `tokio_util::codec::{FramedRead, FramedWrite}`.
///
/// Decoding is lenient by default: garbage between frames is skipped and
/// checksums are not verified. Both can be tuned with the builder methods.
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_payload_size: usize,
    verify_checksums: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            verify_checksums: false,
        }
    }

    /// Set the maximum accepted payload length. Default: 64 KiB.
    pub fn with_max_payload(mut self, max: usize) -> Self {
        self.max_payload_size = max;
        self
    }

    /// Reject frames whose header checksum doesn't match the payload.
    /// Off by default to tolerate firmware that emits junk checksums.
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Bytes;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        decode_frame(src, self.max_payload_size, self.verify_checksums)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // A trailing partial frame at stream end is not an error.
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = WireError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        encode_frame(item.as_bytes(), dst)
    }
}

impl Encoder<Bytes> for LineCodec {
    type Error = WireError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        let payload = b"MCU+PAS+RAKOIT:VOL&";

        encode_frame(payload, &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE + payload.len());

        let decoded = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, true)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.as_ref(), payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_layout() {
        let mut buf = BytesMut::new();
        encode_frame(b"A", &mut buf).unwrap();

        assert_eq!(&buf[0..4], &MAGIC);
        assert_eq!(&buf[4..8], &1u32.to_le_bytes()); // length
        assert_eq!(&buf[8..12], &0x41u32.to_le_bytes()); // checksum of "A"
        assert_eq!(&buf[12..20], &[0u8; 8]); // reserved
        assert_eq!(&buf[20..], b"A");
    }

    #[test]
    fn test_checksum_is_wrapping_byte_sum() {
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(b"MCU+PAS+RAKOIT:VOL&"), 1338);
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&MAGIC[..]);
        buf.put_u32_le(5);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, false).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, false).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_skips_leading_garbage() {
        let mut buf = BytesMut::from(&b"noise on the line"[..]);
        encode_frame(b"hello", &mut buf).unwrap();

        let decoded = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, false)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.as_ref(), b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_keeps_partial_start_sequence() {
        // Garbage followed by the first two bytes of the start sequence.
        let mut buf = BytesMut::from(&b"junk"[..]);
        buf.put_slice(&MAGIC[..2]);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, false)
            .unwrap()
            .is_none());

        // The rest of the frame arrives later.
        let mut full = BytesMut::new();
        encode_frame(b"later", &mut full).unwrap();
        buf.put_slice(&full[2..]);

        let decoded = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, false)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.as_ref(), b"later");
    }

    #[test]
    fn test_decode_recovers_after_oversized_length() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(1_000_000); // implausible for max_payload = 64
        buf.put_u32_le(0);
        buf.put_slice(&[0u8; 8]);
        encode_frame(b"ok", &mut buf).unwrap();

        let result = decode_frame(&mut buf, 64, false);
        assert!(matches!(result, Err(WireError::PayloadTooLarge { .. })));

        // The scanner moved past the bad header and finds the next frame.
        let decoded = decode_frame(&mut buf, 64, false).unwrap().unwrap();
        assert_eq!(decoded.as_ref(), b"ok");
    }

    #[test]
    fn test_decode_ignores_checksum_by_default() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();
        buf[8] ^= 0xFF; // corrupt the checksum

        let decoded = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, false)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.as_ref(), b"hello");
    }

    #[test]
    fn test_decode_verifies_checksum_on_request() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();
        buf[8] ^= 0xFF;

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, true);
        assert!(matches!(result, Err(WireError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_multiple_frames() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, true)
            .unwrap()
            .unwrap();
        assert_eq!(f1.as_ref(), b"first");

        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, true)
            .unwrap()
            .unwrap();
        assert_eq!(f2.as_ref(), b"second");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf).unwrap();

        let decoded = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD, true)
            .unwrap()
            .unwrap();
        assert!(decoded.is_empty());
    }

    #[tokio::test]
    async fn test_framed_roundtrip_over_duplex() {
        use futures_util::{SinkExt, StreamExt};
        use tokio_util::codec::{FramedRead, FramedWrite};

        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FramedWrite::new(client, LineCodec::new());
        let mut reader = FramedRead::new(server, LineCodec::new());

        writer.send("MCU+PAS+RAKOIT:VOL&".to_string()).await.unwrap();
        writer.send("MCU+PAS+RAKOIT:MUT&".to_string()).await.unwrap();

        let first = reader.next().await.unwrap().unwrap();
        assert_eq!(first.as_ref(), b"MCU+PAS+RAKOIT:VOL&");
        let second = reader.next().await.unwrap().unwrap();
        assert_eq!(second.as_ref(), b"MCU+PAS+RAKOIT:MUT&");
    }
}
