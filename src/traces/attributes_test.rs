#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::body::Body;
    use axum::http::Request;

    use crate::traces::attributes::{
        extract, origin_ip, RequestView, ATTR_HTTP_HOST, ATTR_HTTP_METHOD, ATTR_HTTP_URL,
        ATTR_LANGUAGE, ATTR_ORIGIN_IP, ATTR_SPAN_KIND,
    };

    fn view_with_ips(forwarded_for: &str, real_ip: &str) -> RequestView {
        RequestView {
            forwarded_for: forwarded_for.to_string(),
            real_ip: real_ip.to_string(),
            ..RequestView::default()
        }
    }

    #[test]
    fn test_origin_ip_prefers_leftmost_forwarded_address() {
        let view = view_with_ips("1.2.3.4, 5.6.7.8", "9.9.9.9");
        assert_eq!("1.2.3.4", origin_ip(&view));
    }

    #[test]
    fn test_origin_ip_trims_single_forwarded_address() {
        let view = view_with_ips("  1.2.3.4  ", "");
        assert_eq!("1.2.3.4", origin_ip(&view));
    }

    #[test]
    fn test_origin_ip_leading_comma_returns_whole_trimmed_value() {
        // A comma in the first position does not split the chain.
        let view = view_with_ips(",5.6.7.8", "");
        assert_eq!(",5.6.7.8", origin_ip(&view));
    }

    #[test]
    fn test_origin_ip_falls_back_to_real_ip() {
        let view = view_with_ips("", "9.9.9.9");
        assert_eq!("9.9.9.9", origin_ip(&view));
    }

    #[test]
    fn test_origin_ip_empty_when_no_headers() {
        let view = view_with_ips("", "");
        assert_eq!("", origin_ip(&view));
    }

    #[test]
    fn test_extract_merges_global_tags_with_request_attributes() {
        let view = RequestView {
            method: "GET".to_string(),
            path: "/foo".to_string(),
            host: "example.com".to_string(),
            forwarded_for: "1.2.3.4".to_string(),
            real_ip: String::new(),
        };
        let mut global_tags = HashMap::new();
        global_tags.insert("env".to_string(), "prod".to_string());

        let attributes = extract(&view, &global_tags);

        assert_eq!(Some("prod"), attributes.get("env").map(String::as_str));
        assert_eq!(Some("GET"), attributes.get(ATTR_HTTP_METHOD).map(String::as_str));
        assert_eq!(Some("/foo"), attributes.get(ATTR_HTTP_URL).map(String::as_str));
        assert_eq!(
            Some("example.com"),
            attributes.get(ATTR_HTTP_HOST).map(String::as_str)
        );
        assert_eq!(Some("1.2.3.4"), attributes.get(ATTR_ORIGIN_IP).map(String::as_str));
        assert_eq!(Some("go"), attributes.get(ATTR_LANGUAGE).map(String::as_str));
        assert_eq!(Some("client"), attributes.get(ATTR_SPAN_KIND).map(String::as_str));
    }

    #[test]
    fn test_request_derived_value_wins_over_colliding_global_tag() {
        let view = RequestView {
            method: "POST".to_string(),
            ..RequestView::default()
        };
        let mut global_tags = HashMap::new();
        global_tags.insert(ATTR_HTTP_METHOD.to_string(), "FAKE".to_string());

        let attributes = extract(&view, &global_tags);

        assert_eq!(Some("POST"), attributes.get(ATTR_HTTP_METHOD).map(String::as_str));
    }

    #[test]
    fn test_capture_samples_method_path_host_and_ip_headers() {
        let req = Request::builder()
            .method("PUT")
            .uri("/api/v1/thing?x=1")
            .header("host", "svc.internal:8080")
            .header("x-forwarded-for", "10.0.0.1, 10.0.0.2")
            .header("x-real-ip", "10.0.0.3")
            .body(Body::empty())
            .unwrap();

        let view = RequestView::capture(&req);

        assert_eq!("PUT", view.method);
        assert_eq!("/api/v1/thing", view.path, "query string is not part of http.url");
        assert_eq!("svc.internal:8080", view.host);
        assert_eq!("10.0.0.1, 10.0.0.2", view.forwarded_for);
        assert_eq!("10.0.0.3", view.real_ip);
    }

    #[test]
    fn test_capture_with_absent_headers_yields_empty_strings() {
        let req = Request::builder()
            .method("GET")
            .uri("/bare")
            .body(Body::empty())
            .unwrap();

        let view = RequestView::capture(&req);

        assert_eq!("", view.host);
        assert_eq!("", view.forwarded_for);
        assert_eq!("", view.real_ip);
        assert_eq!("", origin_ip(&view));
    }
}
