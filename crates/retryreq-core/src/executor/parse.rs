//! Pull the service request id out of response header lines.

/// Header names that carry the request id, in preference order.
const REQUEST_ID_HEADERS: [&str; 2] = ["x-amzn-requestid", "x-amz-request-id"];

/// Returns the request id from collected header lines, or an empty string.
///
/// With redirects or `100 Continue`, several header blocks may be collected;
/// the last value wins so the final response is reported.
pub(crate) fn request_id(lines: &[String]) -> String {
    for name in REQUEST_ID_HEADERS {
        let mut found = None;
        for line in lines {
            if let Some((k, v)) = line.trim().split_once(':') {
                if k.trim().eq_ignore_ascii_case(name) {
                    found = Some(v.trim().to_string());
                }
            }
        }
        if let Some(id) = found {
            return id;
        }
    }
    String::new()
}
