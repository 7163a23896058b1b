//! IP Webcam stream URL handling.

/// Path the IP Webcam app serves its MJPEG stream on
const VIDEO_PATH: &str = "/video";

/// True if `address` starts with `<scheme>://`, where scheme follows
/// RFC 3986 (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`).
fn has_scheme(address: &str) -> bool {
    let Some((scheme, _)) = address.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Video stream URL for an IP Webcam address.
///
/// `192.168.1.50:8080` becomes `http://192.168.1.50:8080/video`. An address
/// that already carries a scheme only gets `/video` appended, with no
/// separator normalisation (`https://cam.local/` → `https://cam.local//video`).
pub fn stream_url(address: &str) -> String {
    if has_scheme(address) {
        format!("{address}{VIDEO_PATH}")
    } else {
        format!("http://{address}{VIDEO_PATH}")
    }
}
