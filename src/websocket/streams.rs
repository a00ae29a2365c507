//! Initial stream extraction
//!
//! Clients may name the streams they want at connect time:
//! `/ws?stream=btcusd.trades,ethusd.trades&stream=order`.

/// Query parameter carrying a comma separated list of streams
pub const STREAM_PARAM: &str = "stream";

/// Parse the streams requested in an upgrade request target
///
/// Every `stream` parameter contributes its comma separated values, in the
/// order they appear. Pairs without `=` or with another key are skipped.
/// A target without a query string yields no streams.
pub fn parse_streams_from_uri(target: &str) -> Vec<String> {
    let mut streams = Vec::new();

    let Some((_, query)) = target.split_once('?') else {
        return streams;
    };

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key != STREAM_PARAM {
            continue;
        }
        streams.extend(value.split(',').map(str::to_string));
    }

    streams
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_stream_params() {
        assert_eq!(
            parse_streams_from_uri("/ws?stream=btc,eth&stream=ltc"),
            vec!["btc", "eth", "ltc"]
        );
    }

    #[test]
    fn test_no_query() {
        assert!(parse_streams_from_uri("/ws").is_empty());
        assert!(parse_streams_from_uri("").is_empty());
    }

    #[test]
    fn test_empty_query() {
        assert!(parse_streams_from_uri("/ws?").is_empty());
    }

    #[test]
    fn test_skips_malformed_and_foreign_pairs() {
        let streams = parse_streams_from_uri("/ws?token&foo=bar&stream=a&streams=b&stream=c,d");
        assert_eq!(streams, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_concatenation_matches_segments() {
        let segments: Vec<Vec<&str>> = vec![vec!["a.trades"], vec!["b", "c", "d"], vec!["e", "f"]];
        let query = segments
            .iter()
            .map(|s| format!("stream={}", s.join(",")))
            .collect::<Vec<_>>()
            .join("&");

        let expected: Vec<String> = segments
            .iter()
            .flatten()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(parse_streams_from_uri(&format!("/api/v2/ws?{}", query)), expected);
    }

    #[test]
    fn test_splits_only_on_first_separators() {
        // Everything after the first '?' and first '=' belongs to the value.
        assert_eq!(parse_streams_from_uri("/ws?stream=a=b"), vec!["a=b"]);
        assert_eq!(parse_streams_from_uri("/ws?stream=a?b"), vec!["a?b"]);
    }
}
