//! Incremental `multipart/form-data` parser.
//!
//! Chunks are pushed as they arrive from the transport; fields are emitted into a
//! [`FormData`] as soon as their closing delimiter has been seen, so only the part
//! currently being read is buffered.

use axum::body::Bytes;

use crate::decode::form::{FormData, FormFile, FormValue};
use crate::error::ActionError;

const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;

/// Extract the boundary parameter from a multipart content type.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let (mime, params) = content_type.split_once(';')?;
    if !mime.trim().eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params
        .split(';')
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|boundary| !boundary.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    AfterDelimiter,
    Headers,
    Body,
    Done,
}

#[derive(Debug, Default)]
struct PartHeaders {
    name: Option<String>,
    filename: Option<String>,
    content_type: Option<String>,
}

/// Push parser for one multipart body.
#[derive(Debug)]
pub struct MultipartParser {
    delimiter: Vec<u8>,
    buffer: Vec<u8>,
    state: State,
    part: PartHeaders,
    data: Vec<u8>,
    form: FormData,
    max_header_size: usize,
}

impl MultipartParser {
    pub fn new(boundary: &str) -> Self {
        let mut delimiter = b"\r\n--".to_vec();
        delimiter.extend_from_slice(boundary.as_bytes());
        Self {
            delimiter,
            // The first delimiter has no leading line break.
            buffer: b"\r\n".to_vec(),
            state: State::Preamble,
            part: PartHeaders::default(),
            data: Vec::new(),
            form: FormData::new(),
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
        }
    }

    pub fn from_content_type(content_type: &str) -> Result<Self, ActionError> {
        boundary_from_content_type(content_type)
            .map(|boundary| Self::new(&boundary))
            .ok_or_else(|| ActionError::malformed("multipart body without a boundary"))
    }

    pub fn with_max_header_size(mut self, max: usize) -> Self {
        self.max_header_size = max;
        self
    }

    /// Feed the next chunk of the body.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), ActionError> {
        if self.state == State::Done {
            return Ok(());
        }
        self.buffer.extend_from_slice(chunk);
        self.drive()
    }

    /// Complete parsing after the last chunk.
    pub fn finish(mut self) -> Result<FormData, ActionError> {
        self.drive()?;
        if self.state != State::Done {
            return Err(ActionError::malformed("unexpected end of multipart body"));
        }
        Ok(self.form)
    }

    fn drive(&mut self) -> Result<(), ActionError> {
        loop {
            let progressed = match self.state {
                State::Preamble => self.skip_preamble(),
                State::AfterDelimiter => self.after_delimiter()?,
                State::Headers => self.read_headers()?,
                State::Body => self.read_body()?,
                State::Done => {
                    self.buffer.clear();
                    return Ok(());
                }
            };
            if !progressed {
                return Ok(());
            }
        }
    }

    fn skip_preamble(&mut self) -> bool {
        match find(&self.buffer, &self.delimiter) {
            Some(idx) => {
                self.buffer.drain(..idx + self.delimiter.len());
                self.state = State::AfterDelimiter;
                true
            }
            None => {
                let keep = self.delimiter.len().saturating_sub(1);
                let discard = self.buffer.len().saturating_sub(keep);
                self.buffer.drain(..discard);
                false
            }
        }
    }

    fn after_delimiter(&mut self) -> Result<bool, ActionError> {
        if self.buffer.len() < 2 {
            return Ok(false);
        }
        match &self.buffer[..2] {
            b"--" => {
                self.state = State::Done;
            }
            b"\r\n" => {
                self.buffer.drain(..2);
                self.state = State::Headers;
            }
            _ => return Err(ActionError::malformed("invalid multipart delimiter")),
        }
        Ok(true)
    }

    fn read_headers(&mut self) -> Result<bool, ActionError> {
        // A part without headers starts with the blank line directly.
        let (block_len, consumed) = if self.buffer.starts_with(b"\r\n") {
            (0, 2)
        } else {
            match find(&self.buffer, b"\r\n\r\n") {
                Some(idx) => (idx, idx + 4),
                None if self.buffer.len() > self.max_header_size => {
                    return Err(ActionError::malformed("multipart part headers too large"));
                }
                None => return Ok(false),
            }
        };
        if block_len > self.max_header_size {
            return Err(ActionError::malformed("multipart part headers too large"));
        }

        let block = std::str::from_utf8(&self.buffer[..block_len])
            .map_err(|_| ActionError::malformed("multipart part headers are not valid UTF-8"))?;
        self.part = parse_part_headers(block);
        self.buffer.drain(..consumed);
        self.state = State::Body;
        Ok(true)
    }

    fn read_body(&mut self) -> Result<bool, ActionError> {
        match find(&self.buffer, &self.delimiter) {
            Some(idx) => {
                self.data.extend_from_slice(&self.buffer[..idx]);
                self.buffer.drain(..idx + self.delimiter.len());
                self.emit_part()?;
                self.state = State::AfterDelimiter;
                Ok(true)
            }
            None => {
                let keep = self.delimiter.len().saturating_sub(1);
                let ready = self.buffer.len().saturating_sub(keep);
                self.data.extend(self.buffer.drain(..ready));
                Ok(false)
            }
        }
    }

    fn emit_part(&mut self) -> Result<(), ActionError> {
        let part = std::mem::take(&mut self.part);
        let data = std::mem::take(&mut self.data);
        let Some(name) = part.name else {
            tracing::trace!("Skipping multipart part without a name");
            return Ok(());
        };

        let value = match part.filename {
            Some(filename) => FormValue::File(FormFile {
                filename,
                content_type: part.content_type,
                data: Bytes::from(data),
            }),
            None => FormValue::Text(String::from_utf8(data).map_err(|_| {
                ActionError::malformed(format!("multipart field {name:?} is not valid UTF-8"))
            })?),
        };
        self.form.append(name, value);
        Ok(())
    }
}

fn parse_part_headers(block: &str) -> PartHeaders {
    let mut headers = PartHeaders::default();
    for line in block.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').skip(1) {
                if let Some((k, v)) = param.trim().split_once('=') {
                    let v = v.trim().trim_matches('"').to_string();
                    match k.trim() {
                        "name" => headers.name = Some(v),
                        "filename" => headers.filename = Some(v),
                        _ => {}
                    }
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            headers.content_type = Some(value.trim().to_string());
        }
    }
    headers
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
