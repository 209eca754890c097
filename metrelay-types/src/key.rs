//! Metric key naming.

/// Separator between the parts of a metric key.
pub const KEY_SEPARATOR: char = '-';

/// Join key parts with the `-` separator.
///
/// Keys follow `<entity>-<metricName>[-<suffix>]`. Empty parts are skipped so
/// an optional suffix can be passed as `""`.
///
/// ```rust
/// use metrelay_types::metric_key;
///
/// assert_eq!(metric_key(["my-lb", "RequestCount", "minute"]), "my-lb-RequestCount-minute");
/// assert_eq!(metric_key(["node-1", "heapUsedPercent", ""]), "node-1-heapUsedPercent");
/// ```
pub fn metric_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = String::new();
    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            continue;
        }
        if !key.is_empty() {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(part);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_hyphens() {
        assert_eq!(metric_key(["a", "b", "c"]), "a-b-c");
    }

    #[test]
    fn skips_empty_parts() {
        assert_eq!(metric_key(["", "b", ""]), "b");
        assert_eq!(metric_key(Vec::<String>::new()), "");
    }

    #[test]
    fn accepts_owned_strings() {
        let entity = String::from("elasticsearch");
        let host = String::from("es-01");
        assert_eq!(
            metric_key([entity, host, "heapUsedPercent".to_string()]),
            "elasticsearch-es-01-heapUsedPercent"
        );
    }
}
