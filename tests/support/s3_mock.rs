//! Canned S3 responses for wiremock.

use std::fmt::Write as _;

use wiremock::ResponseTemplate;

/// `ListObjectsV2` page with the given `(key, size)` entries.
///
/// A `next_token` marks the page as truncated.
pub fn list_page(prefix: &str, entries: &[(&str, u64)], next_token: Option<&str>) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
    );
    write!(
        body,
        "<Name>dataset</Name><Prefix>{prefix}</Prefix><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys>",
        entries.len()
    )
    .unwrap();
    match next_token {
        Some(token) => write!(
            body,
            "<IsTruncated>true</IsTruncated><NextContinuationToken>{token}</NextContinuationToken>"
        )
        .unwrap(),
        None => body.push_str("<IsTruncated>false</IsTruncated>"),
    }
    for (key, size) in entries {
        write!(
            body,
            "<Contents><Key>{key}</Key><Size>{size}</Size><StorageClass>STANDARD</StorageClass></Contents>"
        )
        .unwrap();
    }
    body.push_str("</ListBucketResult>");
    body
}

/// S3 error document.
pub fn error_body(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Error><Code>{code}</Code><Message>{message}</Message><RequestId>test</RequestId></Error>"#
    )
}

/// XML response with the given status.
pub fn xml(status: u16, body: String) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body, "application/xml")
}
