//! Advertisement data helpers used by the scanner binding.

use heapless::String;

const AD_SHORTENED_LOCAL_NAME: u8 = 0x08;
const AD_COMPLETE_LOCAL_NAME: u8 = 0x09;

/// Iterate over the `(ad_type, payload)` structures of raw advertising data.
///
/// Stops at the first zero-length or overrunning structure.
pub fn ad_structures(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut i = 0;
    core::iter::from_fn(move || {
        let len = *data.get(i)? as usize;
        if len == 0 || i + len >= data.len() {
            return None;
        }
        let ad_type = data[i + 1];
        let payload = &data[i + 2..i + 1 + len];
        i += len + 1;
        Some((ad_type, payload))
    })
}

/// Extract the local name from advertisement or scan-response data.
///
/// A complete local name wins over a shortened one.  Non-UTF-8 names are
/// ignored; names longer than 32 bytes are truncated on a char boundary.
pub fn extract_local_name(data: &[u8]) -> Option<String<32>> {
    let mut shortened = None;
    for (ad_type, payload) in ad_structures(data) {
        match ad_type {
            AD_COMPLETE_LOCAL_NAME => return to_name(payload),
            AD_SHORTENED_LOCAL_NAME if shortened.is_none() => shortened = to_name(payload),
            _ => {}
        }
    }
    shortened
}

fn to_name(bytes: &[u8]) -> Option<String<32>> {
    let text = core::str::from_utf8(bytes).ok()?;
    let mut name = String::new();
    for c in text.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    Some(name)
}
