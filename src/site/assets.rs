//! Shared assets copied next to the generated pages.

pub const STYLESHEET: &str = include_str!("../../templates/assets/api-docs.css");
pub const SCRIPT: &str = include_str!("../../templates/assets/api-docs.js");

/// 1x1 32-bit ICO: header, one directory entry, BITMAPINFOHEADER, one pixel, AND mask
pub const FAVICON: [u8; 70] = [
    // ICONDIR
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
    // ICONDIRENTRY: 1x1, planes 1, 32 bpp, 48 bytes at offset 22
    0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x20, 0x00, 0x30, 0x00, 0x00, 0x00, 0x16, 0x00, 0x00,
    0x00,
    // BITMAPINFOHEADER (height doubled for the mask)
    0x28, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x20,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // BGRA pixel
    0xa8, 0x6b, 0x2f, 0xff,
    // AND mask row, padded to 4 bytes
    0x00, 0x00, 0x00, 0x00,
];

/// Relative path and contents of every asset
pub fn assets() -> [(&'static str, &'static [u8]); 3] {
    [
        ("assets/css/api-docs.css", STYLESHEET.as_bytes()),
        ("assets/js/api-docs.js", SCRIPT.as_bytes()),
        ("assets/img/favicon.ico", &FAVICON),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_favicon_header() {
        assert_eq!(&FAVICON[..4], &[0x00, 0x00, 0x01, 0x00]);
        let size = u32::from_le_bytes([FAVICON[14], FAVICON[15], FAVICON[16], FAVICON[17]]);
        let offset = u32::from_le_bytes([FAVICON[18], FAVICON[19], FAVICON[20], FAVICON[21]]);
        assert_eq!((offset + size) as usize, FAVICON.len());
    }

    #[test]
    fn test_asset_paths() {
        let paths: Vec<_> = assets().iter().map(|(path, _)| *path).collect();
        assert_eq!(
            paths,
            vec![
                "assets/css/api-docs.css",
                "assets/js/api-docs.js",
                "assets/img/favicon.ico"
            ]
        );
    }
}
