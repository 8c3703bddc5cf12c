use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RESPONSE_PATTERN: Regex = Regex::new(r"(?s)<response>(.*?)</response>").unwrap();
    static ref TOPIC_PATTERN: Regex = Regex::new(r"(?s)<topic>(.*?)</topic>").unwrap();
}

/// Splits raw model output into `(answer, topic)`.
///
/// Each field is the text strictly between its opening and closing tag,
/// newlines included. The first match wins; a missing tag pair yields `None`.
pub fn split_response(output: &str) -> (Option<String>, Option<String>) {
    (
        first_capture(&RESPONSE_PATTERN, output),
        first_capture(&TOPIC_PATTERN, output),
    )
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
