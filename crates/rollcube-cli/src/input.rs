use std::io::{self, BufRead};

use rollcube::hostinfo::Event;
use thiserror::Error;

/// Failure to read or decode the event stream
#[derive(Debug, Error)]
pub enum InputError {
    /// A line could not be decoded
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// The underlying reader failed
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
}

/// Decodes one event per line: `timestamp source dest operation is_request payload`
///
/// Blank lines and lines starting with `#` are skipped.
pub struct EventReader<R> {
    lines: io::Lines<R>,
    line: usize,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<Event, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Some(parse_event(trimmed).map_err(|message| InputError::Parse {
                line: self.line,
                message,
            }));
        }
    }
}

fn parse_event(line: &str) -> Result<Event, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [timestamp, source, dest, operation, is_request, payload] = fields[..] else {
        return Err(format!("expected 6 fields, found {}", fields.len()));
    };
    Ok(Event {
        timestamp: timestamp
            .parse()
            .map_err(|_| format!("invalid timestamp '{timestamp}'"))?,
        source: parse_host(source)?,
        dest: parse_host(dest)?,
        operation: operation
            .parse()
            .map_err(|_| format!("invalid operation '{operation}'"))?,
        is_request: parse_flag(is_request)?,
        payload: payload
            .parse()
            .map_err(|_| format!("invalid payload '{payload}'"))?,
    })
}

fn parse_host(field: &str) -> Result<u32, String> {
    let parsed = match field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => field.parse(),
    };
    parsed.map_err(|_| format!("invalid host '{field}'"))
}

fn parse_flag(field: &str) -> Result<bool, String> {
    match field.to_ascii_lowercase().as_str() {
        "1" | "true" | "request" => Ok(true),
        "0" | "false" | "response" => Ok(false),
        _ => Err(format!("invalid request flag '{field}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(input: &str) -> Vec<Result<Event, InputError>> {
        EventReader::new(input.as_bytes()).collect()
    }

    #[test]
    fn parse_events_test() {
        let events = read("# header\n\n100 0x0a000001 167772162 6 request 512\n101 1 2 7 0 64\n");
        assert_eq!(events.len(), 2);
        let first = events[0].as_ref().unwrap();
        assert_eq!(first.timestamp, 100);
        assert_eq!(first.source, 0x0a00_0001);
        assert_eq!(first.dest, 167_772_162);
        assert!(first.is_request);
        assert_eq!(first.payload, 512);
        assert!(!events[1].as_ref().unwrap().is_request);
    }

    #[test]
    fn errors_name_the_line_test() {
        let events = read("100 1 2 6 1 50\n\n101 1 2 6 maybe 50\n");
        match &events[1] {
            Err(InputError::Parse { line, message }) => {
                assert_eq!(*line, 3);
                assert!(message.contains("maybe"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn field_count_test() {
        let events = read("100 1 2 6 1\n");
        assert!(matches!(&events[0], Err(InputError::Parse { line: 1, .. })));
        assert!(parse_host("0xzz").is_err());
        assert!(parse_event("1 1 1 300 1 1").is_err());
    }
}
