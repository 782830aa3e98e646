use crate::types::RawValue;

/// Text format decoders for the structured PostgreSQL literals: arrays,
/// composites, bytea and booleans
pub struct TextDecoder;

impl TextDecoder {
    /// Parse a boolean the way `boolin` does (case-insensitive, unambiguous prefixes)
    pub fn parse_bool(value: &str) -> Result<bool, String> {
        let lowered = value.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "t" | "tr" | "tru" | "true" | "y" | "ye" | "yes" | "on" | "1" => Ok(true),
            "f" | "fa" | "fal" | "fals" | "false" | "n" | "no" | "of" | "off" | "0" => Ok(false),
            _ => Err(format!("invalid input syntax for type boolean: \"{value}\"")),
        }
    }

    /// Parse bytea text output in either the hex (`\x...`) or escape format
    pub fn parse_bytea(value: &str) -> Result<Vec<u8>, String> {
        if let Some(digits) = value.strip_prefix("\\x") {
            let compact: String = digits.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            return hex::decode(compact).map_err(|e| format!("invalid hexadecimal data: {e}"));
        }

        let bytes = value.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'\\' {
                out.push(bytes[i]);
                i += 1;
                continue;
            }
            match bytes.get(i + 1..i + 4) {
                Some([b'\\', ..]) => {
                    out.push(b'\\');
                    i += 2;
                }
                Some(&[a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7']) => {
                    out.push(((a - b'0') << 6) | ((b - b'0') << 3) | (c - b'0'));
                    i += 4;
                }
                _ if bytes.get(i + 1) == Some(&b'\\') => {
                    out.push(b'\\');
                    i += 2;
                }
                _ => return Err("invalid input syntax for type bytea".to_string()),
            }
        }
        Ok(out)
    }

    /// Split an array literal such as `{1,2,NULL}`, `{{a,b},{c,d}}` or
    /// `[0:1]={x,y}` into raw text elements. Sub-arrays come back as nested
    /// `Sequence`s, unquoted `NULL` as `RawValue::Null`.
    pub fn parse_array(literal: &str, delimiter: u8, max_dimensions: usize) -> Result<Vec<RawValue>, String> {
        let mut scanner = Scanner::new(literal);
        scanner.skip_whitespace();

        if scanner.peek() == Some(b'[') {
            scanner.skip_dimension_decoration()?;
        }
        if scanner.bump() != Some(b'{') {
            return Err(format!("malformed array literal: \"{literal}\""));
        }

        let items = scanner.array_level(delimiter, 1, max_dimensions)?;
        scanner.skip_whitespace();
        if !scanner.at_end() {
            return Err(format!(
                "malformed array literal: \"{literal}\": junk after closing right brace"
            ));
        }
        Ok(items)
    }

    /// Split a composite literal such as `(1,"a b",)` into raw text fields.
    /// An empty unquoted field is NULL; `""` is the empty string. `field_count`
    /// disambiguates `()`, which is one NULL field unless the type has none.
    pub fn parse_record(literal: &str, field_count: usize) -> Result<Vec<RawValue>, String> {
        let mut scanner = Scanner::new(literal);
        scanner.skip_whitespace();
        if scanner.bump() != Some(b'(') {
            return Err(format!("malformed record literal: \"{literal}\": missing left parenthesis"));
        }

        let mut fields = Vec::with_capacity(field_count);
        if field_count == 0 && scanner.peek() == Some(b')') {
            scanner.bump();
        } else {
            loop {
                fields.push(scanner.record_field()?);
                match scanner.bump() {
                    Some(b',') => continue,
                    Some(b')') => break,
                    _ => {
                        return Err(format!(
                            "malformed record literal: \"{literal}\": unexpected end of input"
                        ));
                    }
                }
            }
        }

        scanner.skip_whitespace();
        if !scanner.at_end() {
            return Err(format!(
                "malformed record literal: \"{literal}\": junk after right parenthesis"
            ));
        }
        Ok(fields)
    }
}

/// Byte cursor over a literal. All structural characters are ASCII, so
/// scanning bytes never splits a multi-byte character.
struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Consume `[lo:hi][lo:hi]...=`; the bounds carry no information the
    /// element structure doesn't
    fn skip_dimension_decoration(&mut self) -> Result<(), String> {
        while self.peek() == Some(b'[') {
            self.pos += 1;
            let start = self.pos;
            while self.peek().is_some_and(|b| b != b']') {
                self.pos += 1;
            }
            let bounds = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default();
            if self.bump() != Some(b']') || !valid_bounds(bounds) {
                return Err(format!("malformed array dimension decoration: [{bounds}]"));
            }
            self.skip_whitespace();
        }
        if self.bump() != Some(b'=') {
            return Err("missing \"=\" after array dimensions".to_string());
        }
        self.skip_whitespace();
        Ok(())
    }

    /// Parse the contents of one `{...}` level; the opening brace is already consumed
    fn array_level(&mut self, delimiter: u8, depth: usize, max_dimensions: usize) -> Result<Vec<RawValue>, String> {
        if depth > max_dimensions {
            return Err(format!(
                "number of array dimensions ({depth}) exceeds the maximum allowed ({max_dimensions})"
            ));
        }

        let mut items = Vec::new();
        let mut nested: Option<bool> = None;

        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(items);
        }

        loop {
            self.skip_whitespace();
            let is_sub_array = self.peek() == Some(b'{');
            if *nested.get_or_insert(is_sub_array) != is_sub_array {
                return Err("multidimensional arrays must have sub-arrays with matching dimensions".to_string());
            }

            let item = match self.peek() {
                Some(b'{') => {
                    self.pos += 1;
                    RawValue::Sequence(self.array_level(delimiter, depth + 1, max_dimensions)?)
                }
                Some(b'"') => {
                    self.pos += 1;
                    RawValue::text(self.quoted()?)
                }
                Some(b) if b == delimiter || b == b'}' => {
                    return Err("unexpected delimiter in array literal".to_string());
                }
                Some(_) => {
                    let (text, escaped) = self.unquoted(&[delimiter, b'}'])?;
                    if !escaped && text.eq_ignore_ascii_case("NULL") {
                        RawValue::Null
                    } else {
                        RawValue::text(text)
                    }
                }
                None => return Err("unexpected end of array literal".to_string()),
            };
            items.push(item);

            self.skip_whitespace();
            match self.bump() {
                Some(b'}') => break,
                Some(b) if b == delimiter => continue,
                Some(b) => return Err(format!("unexpected \"{}\" in array literal", char::from(b))),
                None => return Err("unexpected end of array literal".to_string()),
            }
        }

        if nested == Some(true) {
            let mut lengths = items.iter().map(|item| match item {
                RawValue::Sequence(inner) => inner.len(),
                _ => 0,
            });
            if let Some(first) = lengths.next() {
                if lengths.any(|len| len != first) {
                    return Err(
                        "multidimensional arrays must have sub-arrays with matching dimensions".to_string(),
                    );
                }
            }
        }
        Ok(items)
    }

    /// Body of a double-quoted element; the opening quote is already consumed
    fn quoted(&mut self) -> Result<String, String> {
        let mut buf = Vec::new();
        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(b) => buf.push(b),
                    None => return Err("unexpected end of input after backslash".to_string()),
                },
                Some(b) => buf.push(b),
                None => return Err("unterminated quoted string".to_string()),
            }
        }
        into_string(buf)
    }

    /// An unquoted element up to one of `stops`, with backslash escapes
    /// applied and trailing unescaped whitespace dropped. Also reports
    /// whether any escape was seen, since `\NULL` is a string.
    fn unquoted(&mut self, stops: &[u8]) -> Result<(String, bool), String> {
        let mut buf = Vec::new();
        let mut escaped = false;
        let mut significant = 0;
        while let Some(b) = self.peek() {
            if stops.contains(&b) {
                break;
            }
            self.pos += 1;
            if b == b'\\' {
                let next = self
                    .bump()
                    .ok_or_else(|| "unexpected end of input after backslash".to_string())?;
                buf.push(next);
                escaped = true;
                significant = buf.len();
            } else {
                buf.push(b);
                if !b.is_ascii_whitespace() {
                    significant = buf.len();
                }
            }
        }
        buf.truncate(significant);
        Ok((into_string(buf)?, escaped))
    }

    /// One composite field, stopping before the `,` or `)` that ends it.
    /// Quotes may open and close anywhere inside the field, and `""` inside
    /// quotes is a literal quote.
    fn record_field(&mut self) -> Result<RawValue, String> {
        if matches!(self.peek(), Some(b',') | Some(b')')) {
            return Ok(RawValue::Null);
        }

        let mut buf = Vec::new();
        let mut in_quotes = false;
        while let Some(b) = self.peek() {
            match (in_quotes, b) {
                (false, b',') | (false, b')') => break,
                (_, b'\\') => {
                    self.pos += 1;
                    let next = self
                        .bump()
                        .ok_or_else(|| "unexpected end of input after backslash".to_string())?;
                    buf.push(next);
                    continue;
                }
                (false, b'"') => in_quotes = true,
                (true, b'"') => {
                    if self.input.get(self.pos + 1) == Some(&b'"') {
                        buf.push(b'"');
                        self.pos += 1;
                    } else {
                        in_quotes = false;
                    }
                }
                (_, b) => buf.push(b),
            }
            self.pos += 1;
        }
        if in_quotes {
            return Err("unterminated quoted string in record literal".to_string());
        }
        Ok(RawValue::text(into_string(buf)?))
    }
}

fn valid_bounds(bounds: &str) -> bool {
    let is_int = |s: &str| {
        let digits = s.strip_prefix('-').unwrap_or(s);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    };
    match bounds.split_once(':') {
        Some((lower, upper)) => is_int(lower.trim()) && is_int(upper.trim()),
        None => is_int(bounds.trim()),
    }
}

fn into_string(buf: Vec<u8>) -> Result<String, String> {
    String::from_utf8(buf).map_err(|e| format!("invalid UTF-8 in literal: {e}"))
}
