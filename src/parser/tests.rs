//! Tests for the parsers.

#[cfg(test)]
mod tests {
    use crate::parser::{
        find_head_end, parse_request_head, Error, HeaderMap, HttpVersion, Method, ParsedTarget,
        PathPattern, Segment,
    };

    #[test]
    fn test_parse_simple_get_request() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request_head(request).unwrap();
        assert_eq!(result.method, Method::GET);
        assert_eq!(result.target, "/index.html");
        assert_eq!(result.version, HttpVersion::Http11);
        assert_eq!(result.headers.get("Host").unwrap(), "example.com");
    }

    #[test]
    fn test_parse_request_with_multiple_headers() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nUser-Agent: test\r\nAccept: */*\r\n\r\n";
        let result = parse_request_head(request).unwrap();
        assert_eq!(result.headers.len(), 3);
        assert_eq!(result.headers.get("User-Agent").unwrap(), "test");
        assert_eq!(result.headers.get("Accept").unwrap(), "*/*");
    }

    #[test]
    fn test_case_insensitive_headers() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request_head(request).unwrap();
        assert!(result.headers.contains("host"));
        assert!(result.headers.contains("HOST"));
        assert!(result.headers.contains("Host"));
    }

    #[test]
    fn test_repeated_headers_are_kept_in_order() {
        let request = b"GET / HTTP/1.1\r\nHost: a\r\nX-Tag: one\r\nx-tag: two\r\n\r\n";
        let result = parse_request_head(request).unwrap();
        let tags: Vec<&str> = result.headers.get_all("X-TAG").collect();
        assert_eq!(tags, vec!["one", "two"]);
    }

    #[test]
    fn test_missing_host_header() {
        let request = b"GET /index.html HTTP/1.1\r\n\r\n";
        let result = parse_request_head(request);
        assert!(matches!(result, Err(Error::MissingHeader(ref h)) if h == "Host"));
    }

    #[test]
    fn test_invalid_method() {
        let request = b"INVALID /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request_head(request);
        assert!(matches!(result, Err(Error::InvalidMethod(ref m)) if m == "INVALID"));
    }

    #[test]
    fn test_invalid_http_version() {
        let request = b"GET /index.html HTTP/2\r\nHost: example.com\r\n\r\n";
        let result = parse_request_head(request);
        assert!(matches!(result, Err(Error::InvalidVersion(ref v)) if v == "HTTP/2"));
    }

    #[test]
    fn test_invalid_header_format() {
        let request = b"GET /index.html HTTP/1.1\r\nInvalidHeader\r\n\r\n";
        let result = parse_request_head(request);
        assert!(matches!(result, Err(Error::InvalidHeaderFormat)));
    }

    #[test]
    fn test_empty_request() {
        let result = parse_request_head(b"");
        assert!(matches!(result, Err(Error::EmptyRequest)));
    }

    #[test]
    fn test_incomplete_request_line() {
        let result = parse_request_head(b"GET\r\n");
        assert!(matches!(result, Err(Error::MalformedRequestLine(_))));
    }

    #[test]
    fn test_all_methods() {
        let methods = [
            ("GET", Method::GET),
            ("HEAD", Method::HEAD),
            ("POST", Method::POST),
            ("PUT", Method::PUT),
            ("DELETE", Method::DELETE),
            ("CONNECT", Method::CONNECT),
            ("OPTIONS", Method::OPTIONS),
            ("TRACE", Method::TRACE),
            ("PATCH", Method::PATCH),
        ];

        for (name, expected_method) in methods {
            let request = format!("{name} /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n");
            let result = parse_request_head(request.as_bytes()).unwrap();
            assert_eq!(result.method, expected_method);
            assert_eq!(expected_method.to_string(), name);
        }
    }

    #[test]
    fn test_http10_without_host() {
        // HTTP/1.0 doesn't require a Host header
        let request = b"GET /index.html HTTP/1.0\r\n\r\n";
        let result = parse_request_head(request).unwrap();
        assert_eq!(result.version, HttpVersion::Http10);
        assert!(result.headers.is_empty());
    }

    #[test]
    fn test_mixed_line_endings() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\nUser-Agent: test\r\n\r\n";
        let result = parse_request_head(request).unwrap();
        assert_eq!(result.headers.get("Host").unwrap(), "example.com");
        assert_eq!(result.headers.get("User-Agent").unwrap(), "test");
    }

    #[test]
    fn test_headers_with_multiple_colons() {
        let request = b"GET / HTTP/1.1\r\nHost: example.com\r\nX-Test: value:with:colons\r\n\r\n";
        let result = parse_request_head(request).unwrap();
        assert_eq!(result.headers.get("X-Test").unwrap(), "value:with:colons");
    }

    #[test]
    fn test_content_length() {
        let request = b"POST / HTTP/1.1\r\nHost: a\r\nContent-Length: 12\r\n\r\n";
        assert_eq!(parse_request_head(request).unwrap().content_length().unwrap(), 12);

        let request = b"POST / HTTP/1.1\r\nHost: a\r\n\r\n";
        assert_eq!(parse_request_head(request).unwrap().content_length().unwrap(), 0);

        let request = b"POST / HTTP/1.1\r\nHost: a\r\nContent-Length: -3\r\n\r\n";
        let result = parse_request_head(request).unwrap().content_length();
        assert!(matches!(result, Err(Error::InvalidContentLength(_))));
    }

    #[test]
    fn test_find_head_end() {
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\nHost: a\r\n\r\nbody"), Some(27));
        assert_eq!(find_head_end(b"GET / HTTP/1.0\n\nbody"), Some(16));
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\nHost: a\r\n"), None);
    }

    #[test]
    fn test_header_map_insert_replaces_all() {
        let mut headers: HeaderMap = [("Set-Cookie", "a=1"), ("set-cookie", "b=2")].into_iter().collect();
        assert_eq!(headers.get_all("Set-Cookie").count(), 2);

        headers.insert("SET-COOKIE", "c=3");
        let values: Vec<&str> = headers.get_all("set-cookie").collect();
        assert_eq!(values, vec!["c=3"]);
        assert_eq!(headers.remove("Set-Cookie"), 1);
        assert!(headers.is_empty());
    }

    // Path patterns

    #[test]
    fn test_pattern_literal_and_named_wildcard() {
        let pp = PathPattern::parse("/hello/{lang}").unwrap();
        assert_eq!(pp.segments, vec![Segment::literal("hello"), Segment::wildcard("lang")]);
        assert!(!pp.suffix_wildcard);
    }

    #[test]
    fn test_pattern_leading_slash_is_optional() {
        assert_eq!(
            PathPattern::parse("a/{b}/c").unwrap(),
            PathPattern::parse("/a/{b}/c").unwrap()
        );
    }

    #[test]
    fn test_pattern_anonymous_wildcards() {
        let pp = PathPattern::parse("/a/*/{}/b").unwrap();
        assert_eq!(
            pp.segments,
            vec![
                Segment::literal("a"),
                Segment::wildcard(""),
                Segment::wildcard(""),
                Segment::literal("b"),
            ]
        );
        assert!(pp.param_bindings().is_empty());
    }

    #[test]
    fn test_pattern_suffix_wildcard() {
        let pp = PathPattern::parse("/hello/**").unwrap();
        assert_eq!(pp.segments, vec![Segment::literal("hello")]);
        assert!(pp.suffix_wildcard);

        let pp = PathPattern::parse("/**").unwrap();
        assert!(pp.segments.is_empty());
        assert!(pp.suffix_wildcard);
    }

    #[test]
    fn test_pattern_root() {
        assert_eq!(PathPattern::parse("/").unwrap(), PathPattern::root());
        assert_eq!(PathPattern::parse("").unwrap(), PathPattern::root());
    }

    #[test]
    fn test_pattern_doubled_slash_is_empty_literal() {
        let pp = PathPattern::parse("/a//b").unwrap();
        assert_eq!(
            pp.segments,
            vec![Segment::literal("a"), Segment::literal(""), Segment::literal("b")]
        );
    }

    #[test]
    fn test_pattern_trailing_slash_adds_nothing() {
        assert_eq!(PathPattern::parse("/a/").unwrap(), PathPattern::parse("/a").unwrap());
        assert_eq!(PathPattern::parse("/{x}/").unwrap(), PathPattern::parse("/{x}").unwrap());
    }

    #[test]
    fn test_pattern_param_bindings() {
        let pp = PathPattern::parse("/users/{user}/*/posts/{post}").unwrap();
        assert_eq!(
            pp.param_bindings(),
            vec![(1, "user".to_string()), (4, "post".to_string())]
        );
    }

    #[test]
    fn test_pattern_malformed() {
        for pattern in ["/a/**/b", "/a/**/", "/***", "/{name", "/a/{", "/{x}y", "/*x", "/a/*b/c"] {
            let result = PathPattern::parse(pattern);
            assert!(
                matches!(result, Err(Error::MalformedPattern { .. })),
                "{pattern} should be rejected"
            );
        }
    }

    #[test]
    fn test_pattern_malformed_reports_offset() {
        match PathPattern::parse("/a/**/b") {
            Err(Error::MalformedPattern { offset, .. }) => assert_eq!(offset, 4),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_pattern_builder_and_display() {
        let pp = PathPattern::root().literal("files").wildcard("owner").anonymous().globstar();
        assert_eq!(pp.to_string(), "/files/{owner}/*/**");
        assert_eq!(PathPattern::parse(&pp.to_string()).unwrap(), pp);
        assert_eq!(PathPattern::root().to_string(), "/");
    }

    // Request targets

    #[test]
    fn test_target_path_and_query() {
        let t = ParsedTarget::parse("/hello/en?a=2&b=3");
        assert!(t.success);
        assert_eq!(t.path_raw, "/hello/en");
        assert_eq!(t.path, "/hello/en");
        assert_eq!(t.path_segments, vec!["hello", "en"]);
        assert_eq!(t.query_raw, "a=2&b=3");
        assert_eq!(t.query, "a=2&b=3");
        assert_eq!(
            t.query_params,
            vec![("a".to_string(), "2".to_string()), ("b".to_string(), "3".to_string())]
        );
    }

    #[test]
    fn test_target_encoded_delimiters_are_not_structural() {
        let t = ParsedTarget::parse("%2Fa%3Fb");
        assert!(t.success);
        assert_eq!(t.decoded, "/a?b");
        assert_eq!(t.path, "/a?b");
        assert_eq!(t.path_segments, vec!["/a?b"]);
        assert_eq!(t.query_raw, "");
        assert!(t.query_params.is_empty());
    }

    #[test]
    fn test_target_percent_decoding_in_segments_and_query() {
        let t = ParsedTarget::parse("/caf%C3%A9/a%2Fb?q%3D=x%26y&n=%41");
        assert!(t.success);
        assert_eq!(t.path_segments, vec!["café", "a/b"]);
        assert_eq!(t.path_raw, "/caf%C3%A9/a%2Fb");
        assert_eq!(t.query_raw, "q%3D=x%26y&n=%41");
        assert_eq!(
            t.query_params,
            vec![("q=".to_string(), "x&y".to_string()), ("n".to_string(), "A".to_string())]
        );
    }

    #[test]
    fn test_target_plus_is_space_only_in_query() {
        let t = ParsedTarget::parse("/a+b?q=rust+lang");
        assert_eq!(t.path_segments, vec!["a+b"]);
        assert_eq!(t.query, "q=rust lang");
        assert_eq!(t.decoded, "/a+b?q=rust+lang");
        assert_eq!(t.query_params, vec![("q".to_string(), "rust lang".to_string())]);
    }

    #[test]
    fn test_target_duplicate_keys_and_missing_values() {
        let t = ParsedTarget::parse("/?tag=a&flag&tag=b&=v&&");
        assert!(t.success);
        assert_eq!(
            t.query_params,
            vec![
                ("tag".to_string(), "a".to_string()),
                ("flag".to_string(), String::new()),
                ("tag".to_string(), "b".to_string()),
                (String::new(), "v".to_string()),
                (String::new(), String::new()),
                (String::new(), String::new()),
            ]
        );
    }

    #[test]
    fn test_target_empty_query_fragments_are_kept() {
        let t = ParsedTarget::parse("/?a=1&&b=2&");
        assert!(t.success);
        assert_eq!(
            t.query_params,
            vec![
                ("a".to_string(), "1".to_string()),
                (String::new(), String::new()),
                ("b".to_string(), "2".to_string()),
                (String::new(), String::new()),
            ]
        );

        // A bare `?` is one empty fragment
        let t = ParsedTarget::parse("/path?");
        assert_eq!(t.query_raw, "");
        assert_eq!(t.query_params, vec![(String::new(), String::new())]);
    }

    #[test]
    fn test_target_trailing_and_doubled_slashes() {
        assert_eq!(ParsedTarget::parse("/").path_segments, vec![""]);
        assert_eq!(ParsedTarget::parse("/a/").path_segments, vec!["a", ""]);
        assert_eq!(ParsedTarget::parse("/a//b").path_segments, vec!["a", "", "b"]);
    }

    #[test]
    fn test_target_malformed_escapes() {
        for raw in ["/%zz", "/a%2", "/a%", "/?q=%g1", "/%C3%28"] {
            let t = ParsedTarget::parse(raw);
            assert!(!t.success, "{raw} should be rejected");
        }
    }

    #[test]
    fn test_target_lowercase_hex() {
        let t = ParsedTarget::parse("/%7e%7E");
        assert!(t.success);
        assert_eq!(t.path, "/~~");
    }
}
