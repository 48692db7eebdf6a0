/*!
 * Tests for container detection and the layout codec
 */

use doctrans::document::{BlockId, BoundingBox, DocumentCodec, LayoutCodec, PageId, codec_for_bytes};
use doctrans::errors::ExtractError;

use crate::common::{decode_layout, image_block, layout_bytes, page, page_of_texts, text_block};

#[test]
fn test_codecForBytes_withLayoutSignature_shouldPickLayoutCodec() {
    let bytes = layout_bytes(vec![page_of_texts(0, &["Hello"])]);
    let codec = codec_for_bytes(&bytes).unwrap();
    assert_eq!(codec.name(), "dtl");
}

#[test]
fn test_codecForBytes_withGarbage_shouldBeUnsupported() {
    for input in [&b"PK\x03\x04"[..], b"%PS-Adobe-3.0", b""] {
        match codec_for_bytes(input) {
            Err(ExtractError::UnsupportedFormat(_)) => {}
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(codec) => panic!("unexpected codec {}", codec.name()),
        }
    }
}

#[test]
fn test_decode_withTruncatedBody_shouldBeCorrupt() {
    let result = LayoutCodec.decode(b"%DTL-1.0\n{bad");
    assert!(matches!(result, Err(ExtractError::CorruptDocument(_))));
}

#[test]
fn test_decode_withFutureMajorVersion_shouldBeCorrupt() {
    let result = LayoutCodec.decode(b"%DTL-9.0\n{\"pages\":[]}");
    assert!(matches!(result, Err(ExtractError::CorruptDocument(_))));
}

#[test]
fn test_decode_withOneBadPage_shouldKeepTheOthers() {
    let body = r#"%DTL-1.0
{"pages":[
 {"width":100,"height":100,"blocks":[]},
 {"width":-5,"height":100,"blocks":[]},
 {"width":100,"height":100,"blocks":[]}
]}"#;
    let decoded = LayoutCodec.decode(body.as_bytes()).unwrap();
    assert_eq!(decoded.document.page_count(), 2);
    assert_eq!(decoded.page_failures.len(), 1);
    assert_eq!(decoded.page_failures[0].0, PageId(1));
}

#[test]
fn test_encodeThenDecode_shouldKeepIdsAndImagePayloads() {
    let payload = [0x89u8, b'P', b'N', b'G', 0, 1, 2, 3];
    let source = page(
        0,
        vec![
            text_block(0, 0, BoundingBox::new(10.0, 10.0, 200.0, 30.0), "Caption"),
            image_block(0, 1, BoundingBox::new(10.0, 50.0, 100.0, 100.0), &payload),
        ],
    );

    let document = decode_layout(&layout_bytes(vec![source]));
    let page = &document.pages[0];
    assert_eq!(page.blocks[0].id(), BlockId::new(0, 0));
    assert_eq!(page.blocks[1].id(), BlockId::new(0, 1));
    assert_eq!(page.image_blocks().next().unwrap().payload.data, payload.to_vec());
}
