use std::io::BufRead;

use crate::error::FmError;

const LINEBUF_LEN: usize = 2048;

/// One dataset line before densification. Feature indices are zero-based here.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseSample {
    pub label: i32,
    pub features: Vec<(usize, f32)>,
}

impl SparseSample {
    /// Number of features implied by this line (highest 1-based index)
    pub fn max_feature_index(&self) -> usize {
        self.features.iter().map(|(i, _)| i + 1).max().unwrap_or(0)
    }

    pub fn to_dense(&self, feature_count: usize) -> Vec<f32> {
        let mut x = vec![0.0; feature_count];
        for (index, value) in &self.features {
            x[*index] = *value;
        }
        x
    }
}

/*
Line format:
    label index:value index:value ...
label is an integer, index is 1-based, omitted indices are 0.0.
Tokens are separated by any whitespace.
*/
pub struct DataParser {
    source_name: String,
    line_buf: Vec<u8>,
    pub line_number: usize,
}

impl DataParser {
    pub fn new(source_name: &str) -> DataParser {
        DataParser {
            source_name: source_name.to_string(),
            line_buf: Vec::with_capacity(LINEBUF_LEN),
            line_number: 0,
        }
    }

    /// Ok(None) at end of input. Errors that are `is_recoverable()` concern only the
    /// current line, the caller may keep reading.
    pub fn next_sample(
        &mut self,
        input_bufread: &mut dyn BufRead,
    ) -> Result<Option<SparseSample>, FmError> {
        self.line_buf.truncate(0);
        match input_bufread.read_until(b'\n', &mut self.line_buf) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(FmError::io(&self.source_name, e)),
        };
        self.line_number += 1;
        // invalid UTF-8 is a problem of this line only
        let line = std::str::from_utf8(&self.line_buf).map_err(|e| FmError::DataFormat {
            line: self.line_number,
            reason: format!("not valid UTF-8 ({})", e),
        })?;
        parse_line(line, self.line_number).map(Some)
    }
}

pub fn parse_line(line: &str, line_number: usize) -> Result<SparseSample, FmError> {
    let format_error = |reason: String| FmError::DataFormat {
        line: line_number,
        reason,
    };

    let mut tokens = line.split_whitespace();
    let label_str = match tokens.next() {
        Some(s) => s,
        None => return Err(format_error("empty line".to_string())),
    };
    let label: i32 = label_str
        .parse()
        .map_err(|_| format_error(format!("can't parse label \"{}\"", label_str)))?;

    let mut features = Vec::new();
    for token in tokens {
        let (index_str, value_str) = match token.split_once(':') {
            Some(pair) => pair,
            None => return Err(format_error(format!("expected index:value, got \"{}\"", token))),
        };
        let index: usize = match index_str.parse() {
            Ok(i) if i >= 1 => i,
            _ => return Err(format_error(format!("invalid feature index \"{}\"", index_str))),
        };
        let value: f32 = match value_str.parse::<f32>() {
            Ok(v) if v.is_finite() => v,
            _ => return Err(format_error(format!("invalid feature value \"{}\"", value_str))),
        };
        features.push((index - 1, value));
    }

    Ok(SparseSample { label, features })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line() {
        let s = parse_line("1 1:1.0 3:-2.5\n", 1).unwrap();
        assert_eq!(s.label, 1);
        assert_eq!(s.features, vec![(0, 1.0), (2, -2.5)]);
        assert_eq!(s.max_feature_index(), 3);
        assert_eq!(s.to_dense(4), vec![1.0, 0.0, -2.5, 0.0]);

        // tabs and a label without features
        let s = parse_line("-1\t2:0.5", 1).unwrap();
        assert_eq!(s.label, -1);
        assert_eq!(s.features, vec![(1, 0.5)]);
        let s = parse_line("0", 1).unwrap();
        assert_eq!(s.max_feature_index(), 0);
    }

    #[test]
    fn test_malformed_lines() {
        for line in ["", "   \n", "a 1:1.0", "1 0:1.0", "1 x:1.0", "1 2", "1 2:abc", "1 2:nan", "1.5 1:1"].iter() {
            match parse_line(line, 7) {
                Err(FmError::DataFormat { line, .. }) => assert_eq!(line, 7),
                other => panic!("line {:?} should fail, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_parser_skips_bad_lines() {
        let mut input = Cursor::new("1 1:1.0\nbad\n0 2:2.0\n");
        let mut pa = DataParser::new("inline");
        let mut good = 0;
        let mut bad = 0;
        loop {
            match pa.next_sample(&mut input) {
                Ok(None) => break,
                Ok(Some(_)) => good += 1,
                Err(e) => {
                    assert!(e.is_recoverable());
                    bad += 1;
                }
            }
        }
        assert_eq!((good, bad), (2, 1));
        assert_eq!(pa.line_number, 3);
    }

    #[test]
    fn test_invalid_utf8_only_drops_its_line() {
        let mut input = Cursor::new(&b"1 1:1.0\n0 2:1.0 \xff\xfe\n1 3:1.0\n"[..]);
        let mut pa = DataParser::new("inline");
        assert!(pa.next_sample(&mut input).unwrap().is_some());
        match pa.next_sample(&mut input) {
            Err(FmError::DataFormat { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected a data format error, got {:?}", other),
        }
        let s = pa.next_sample(&mut input).unwrap().unwrap();
        assert_eq!(s.features, vec![(2, 1.0)]);
        assert!(pa.next_sample(&mut input).unwrap().is_none());
    }
}
