//! Share-link construction and parsing.
//!
//! The viewer page round-trips its selection through two query
//! parameters; QR encoding of the produced strings is owned by the
//! control surface, so everything here is plain string work.

pub const PRODUCT_PARAM: &str = "product";
pub const VARIANT_PARAM: &str = "variant";

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

pub fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for &byte in value.as_bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

pub fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Deep link reproducing the current selection when opened.
pub fn build_share_url(base: &str, product_id: &str, variant_asset: Option<&str>) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    let mut url = format!(
        "{base}{separator}{PRODUCT_PARAM}={}",
        percent_encode(product_id)
    );
    if let Some(asset) = variant_asset {
        url.push('&');
        url.push_str(VARIANT_PARAM);
        url.push('=');
        url.push_str(&percent_encode(asset));
    }
    url
}

/// Selection restored from a shared link.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ShareParams {
    pub product: Option<String>,
    pub variant: Option<String>,
}

/// Accepts a full URL or a bare query string; the first occurrence of a
/// parameter wins, later duplicates are ignored.
pub fn parse_share_query(input: &str) -> ShareParams {
    let without_fragment = input.split('#').next().unwrap_or(input);
    let query = match without_fragment.find('?') {
        Some(idx) => &without_fragment[idx + 1..],
        None if without_fragment.contains('=') => without_fragment,
        None => "",
    };

    let mut params = ShareParams::default();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match percent_decode(key).as_str() {
            PRODUCT_PARAM if params.product.is_none() => {
                params.product = Some(percent_decode(value));
            }
            VARIANT_PARAM if params.variant.is_none() => {
                params.variant = Some(percent_decode(value));
            }
            _ => {}
        }
    }
    params
}

/// Absolute URL handed to the QR encoder when the platform cannot start
/// an AR session directly. Already-absolute references pass through;
/// root-relative ones resolve against the base origin, relative ones
/// against the base directory.
pub fn build_ar_payload(base: &str, asset: &str) -> String {
    if asset.contains("://") {
        return asset.to_string();
    }
    if let Some(rooted) = asset.strip_prefix('/') {
        return format!("{}/{}", origin_of(base), rooted);
    }
    format!("{}/{}", directory_of(base), asset)
}

fn origin_of(base: &str) -> &str {
    match base.find("://") {
        Some(scheme_end) => {
            let rest = &base[scheme_end + 3..];
            match rest.find('/') {
                Some(path_start) => &base[..scheme_end + 3 + path_start],
                None => base,
            }
        }
        None => base,
    }
}

fn directory_of(base: &str) -> &str {
    let cut = match base.find(['?', '#']) {
        Some(idx) => &base[..idx],
        None => base,
    };
    let path_start = cut.find("://").map(|idx| idx + 3).unwrap_or(0);
    match cut[path_start..].rfind('/') {
        Some(idx) => &cut[..path_start + idx],
        None => cut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_url_carries_both_parameters() {
        let url = build_share_url(
            "https://shop.example/viewer",
            "sofa1",
            Some("sofa_cream.glb"),
        );
        assert_eq!(
            url,
            "https://shop.example/viewer?product=sofa1&variant=sofa_cream.glb"
        );
    }

    #[test]
    fn base_with_existing_query_appends_with_ampersand() {
        let url = build_share_url("https://shop.example/viewer?lang=en", "sofa1", None);
        assert_eq!(url, "https://shop.example/viewer?lang=en&product=sofa1");
    }

    #[test]
    fn round_trip_survives_characters_needing_escapes() {
        let asset = "models/sofa cream&co.glb";
        let url = build_share_url("https://shop.example/viewer", "sofa 1", Some(asset));
        let params = parse_share_query(&url);
        assert_eq!(params.product.as_deref(), Some("sofa 1"));
        assert_eq!(params.variant.as_deref(), Some(asset));
    }

    #[test]
    fn parse_accepts_bare_query_strings() {
        let params = parse_share_query("product=lamp1&variant=lamp.glb");
        assert_eq!(params.product.as_deref(), Some("lamp1"));
        assert_eq!(params.variant.as_deref(), Some("lamp.glb"));
    }

    #[test]
    fn first_duplicate_parameter_wins() {
        let params = parse_share_query("?product=first&product=second");
        assert_eq!(params.product.as_deref(), Some("first"));
    }

    #[test]
    fn fragments_and_unknown_parameters_are_ignored() {
        let params = parse_share_query("https://x.example/v?theme=night&product=sofa1#ar");
        assert_eq!(params.product.as_deref(), Some("sofa1"));
        assert_eq!(params.variant, None);
    }

    #[test]
    fn plus_decodes_as_space() {
        let params = parse_share_query("product=arc+lamp");
        assert_eq!(params.product.as_deref(), Some("arc lamp"));
    }

    #[test]
    fn ar_payload_passes_absolute_urls_through() {
        assert_eq!(
            build_ar_payload("https://shop.example/viewer", "https://cdn.example/s.glb"),
            "https://cdn.example/s.glb"
        );
    }

    #[test]
    fn ar_payload_resolves_rooted_refs_against_the_origin() {
        assert_eq!(
            build_ar_payload("https://shop.example/ar/viewer.html", "/models/s.glb"),
            "https://shop.example/models/s.glb"
        );
    }

    #[test]
    fn ar_payload_resolves_relative_refs_against_the_base_directory() {
        assert_eq!(
            build_ar_payload("https://shop.example/ar/viewer.html", "models/s.glb"),
            "https://shop.example/ar/models/s.glb"
        );
        assert_eq!(
            build_ar_payload("https://shop.example", "s.glb"),
            "https://shop.example/s.glb"
        );
    }
}
