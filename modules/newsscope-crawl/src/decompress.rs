use std::io::Read;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Some category pages arrive zstd- or gzip-compressed without a
/// negotiated `Content-Encoding` header. Detect by magic number and
/// decompress manually; anything else passes through untouched.
pub fn decompress_if_needed(body: &[u8], content_encoding_negotiated: bool) -> Vec<u8> {
    if content_encoding_negotiated {
        return body.to_vec();
    }

    if body.starts_with(&ZSTD_MAGIC) {
        if let Ok(decoded) = zstd::decode_all(body) {
            return decoded;
        }
        return body.to_vec();
    }

    if body.starts_with(&GZIP_MAGIC) {
        let mut decoder = flate2::read::GzDecoder::new(body);
        let mut out = Vec::new();
        if decoder.read_to_end(&mut out).is_ok() {
            return out;
        }
        return body.to_vec();
    }

    body.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_when_encoding_negotiated() {
        let body = vec![0x28, 0xB5, 0x2F, 0xFD, 1, 2, 3];
        assert_eq!(decompress_if_needed(&body, true), body);
    }

    #[test]
    fn passthrough_plain_html() {
        let body = b"<html></html>".to_vec();
        assert_eq!(decompress_if_needed(&body, false), body);
    }

    #[test]
    fn decompresses_gzip_magic() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<html>hello</html>").unwrap();
        let compressed = encoder.finish().unwrap();

        let result = decompress_if_needed(&compressed, false);
        assert_eq!(result, b"<html>hello</html>");
    }
}
