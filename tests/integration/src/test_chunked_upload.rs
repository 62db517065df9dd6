//! S5 — `aws-chunked` streaming upload (`spec.md` §8).

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Utc;
    use http::{Method, StatusCode};

    use s3store_auth::canonical::{
        build_canonical_headers, build_canonical_query_string, build_canonical_request, build_canonical_uri,
        build_signed_headers_string, build_string_to_sign, parse_query_params, QueryOrder,
    };
    use s3store_auth::datecodec::format_aws_timestamp;

    use crate::{derive_signing_key, sign, sign_chunk, signed_request, Harness, ACCESS_KEY, REGION, SECRET_KEY};

    const STREAMING_MARKER: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD";

    #[tokio::test]
    async fn test_should_decode_and_store_three_chunk_streaming_upload() {
        let harness = Harness::new();
        let now = Utc::now();
        harness.send(signed_request(Method::PUT, "/b1", "", &[], b"", now)).await;

        let date = format_aws_timestamp(now);
        let extra_headers = [
            ("content-encoding", "aws-chunked"),
            ("x-amz-content-sha256", STREAMING_MARKER),
            ("x-amz-decoded-content-length", "11"),
        ];

        let mut headers: std::collections::BTreeMap<String, Vec<String>> = std::collections::BTreeMap::new();
        headers.insert("host".to_owned(), vec!["localhost".to_owned()]);
        headers.insert("x-amz-date".to_owned(), vec![date.clone()]);
        for (name, value) in extra_headers {
            headers.entry(name.to_owned()).or_insert_with(Vec::new).push(value.to_owned());
        }

        let mut signed_header_names: Vec<String> = headers.keys().cloned().collect();
        signed_header_names.sort();
        let canonical_headers = build_canonical_headers(&signed_header_names, &headers);
        let signed_headers_str = build_signed_headers_string(&signed_header_names);
        let canonical_uri = build_canonical_uri("/b1/c");
        let query_params = parse_query_params("");
        let canonical_query = build_canonical_query_string(&query_params, QueryOrder::Sorted, false);
        let canonical_request =
            build_canonical_request("PUT", &canonical_uri, &canonical_query, &canonical_headers, &signed_headers_str, STREAMING_MARKER);

        let credential_scope = format!("{}/{REGION}/s3/aws4_request", &date[..8]);
        let string_to_sign = build_string_to_sign(&date, &credential_scope, &canonical_request);
        let signing_key = derive_signing_key(SECRET_KEY, &date[..8], REGION, "s3");
        let seed_signature = sign(&signing_key, &string_to_sign);

        let mut body = Vec::new();
        let mut previous = seed_signature.clone();
        for chunk in [&b"Hel"[..], &b"lo "[..], &b"Wor"[..], &b"ld"[..]] {
            let sig = sign_chunk(&signing_key, &date, &credential_scope, &previous, chunk);
            body.extend_from_slice(format!("{:x};chunk-signature={sig}\r\n", chunk.len()).as_bytes());
            body.extend_from_slice(chunk);
            body.extend_from_slice(b"\r\n");
            previous = sig;
        }
        let final_sig = sign_chunk(&signing_key, &date, &credential_scope, &previous, b"");
        body.extend_from_slice(format!("0;chunk-signature={final_sig}\r\n\r\n").as_bytes());

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={ACCESS_KEY}/{credential_scope}, SignedHeaders={signed_headers_str}, Signature={seed_signature}"
        );

        let mut builder = http::Request::builder().method(Method::PUT).uri("/b1/c");
        for (name, values) in &headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        builder = builder.header("authorization", authorization);
        let req = builder.body(Bytes::from(body)).expect("builds chunked request");

        let resp = harness.send(req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let get = signed_request(Method::GET, "/b1/c", "", &[], b"", now);
        let mut get_resp = harness.send(get).await;
        assert_eq!(std::mem::take(get_resp.body_mut()), Bytes::from_static(b"Hello World"));
    }
}
