use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Streams any `encoding_rs` charset into UTF-8 for the tokenizer.
pub struct Transcoder {
    decoder: encoding_rs::Decoder,
}

impl Transcoder {
    pub fn new(encoding: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
        }
    }

    fn out_buffer(&self, len: usize, last: bool) -> Vec<u8> {
        let cap = if last {
            self.decoder.max_utf8_buffer_length(len)
        } else {
            self.decoder.max_utf8_buffer_length_without_replacement(len)
        };
        vec![0; cap.unwrap_or(len * 2)]
    }
}

impl Decoder for Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut out = self.out_buffer(src.len(), false);
        let (_result, read, written, _replaced) = self.decoder.decode_to_utf8(src, &mut out, false);

        // incomplete multi-byte sequence; wait for more input
        if read == 0 && written == 0 {
            return Ok(None);
        }

        src.advance(read);
        Ok(Some(BytesMut::from(&out[..written])))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() {
            return Ok(None);
        }

        let mut out = self.out_buffer(buf.len(), true);
        let (_result, _read, written, _replaced) = self.decoder.decode_to_utf8(buf, &mut out, true);
        buf.clear();

        if written > 0 {
            Ok(Some(BytesMut::from(&out[..written])))
        } else {
            Ok(None)
        }
    }
}
