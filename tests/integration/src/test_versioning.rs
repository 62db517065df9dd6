//! S3 — versioning lifecycle (`spec.md` §8).

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use http::{Method, StatusCode};

    use crate::{signed_request, Harness};

    #[tokio::test]
    async fn test_should_track_versions_and_latest_flag_through_put_and_delete() {
        let harness = Harness::new();
        let now = Utc::now();

        harness.send(signed_request(Method::PUT, "/b", "", &[], b"", now)).await;
        let enable = signed_request(
            Method::PUT,
            "/b",
            "versioning",
            &[],
            b"<VersioningConfiguration><Status>Enabled</Status></VersioningConfiguration>",
            now,
        );
        assert_eq!(harness.send(enable).await.status(), StatusCode::OK);

        let mut version_ids = Vec::new();
        for body in [&b"A"[..], &b"B"[..], &b"C"[..]] {
            let put = signed_request(Method::PUT, "/b/x", "", &[], body, now);
            let resp = harness.send(put).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let version_id = resp.headers().get("x-amz-version-id").unwrap().to_str().unwrap().to_owned();
            assert_eq!(version_id.len(), 32);
            assert!(!version_ids.contains(&version_id));
            version_ids.push(version_id);
        }

        let list = signed_request(Method::GET, "/b", "versions", &[], b"", now);
        let resp = harness.send(list).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = crate::read_body(&resp);
        assert_eq!(body.matches("<Version>").count(), 3);
        assert_eq!(body.matches("<IsLatest>true</IsLatest>").count(), 1);

        let get = signed_request(Method::GET, "/b/x", "", &[], b"", now);
        let mut resp = harness.send(get).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(std::mem::take(resp.body_mut()), bytes::Bytes::from_static(b"C"));

        let delete = signed_request(Method::DELETE, "/b/x", "", &[], b"", now);
        let resp = harness.send(delete).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers().get("x-amz-delete-marker").unwrap(), "true");

        let get = signed_request(Method::GET, "/b/x", "", &[], b"", now);
        let resp = harness.send(get).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(crate::read_body(&resp).contains("NoSuchKey"));

        let list = signed_request(Method::GET, "/b", "versions", &[], b"", now);
        let resp = harness.send(list).await;
        let body = crate::read_body(&resp);
        assert_eq!(body.matches("<Version>").count(), 3);
        assert_eq!(body.matches("<DeleteMarker>").count(), 1);
    }
}
