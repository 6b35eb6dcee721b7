//! Recursive-descent object parser
//!
//! Turns a token stream into [`Object`] values. Document-level concerns
//! (xref discovery, stream payload extraction, object streams) live in
//! [`crate::pdf::reader`]; this module only knows the object grammar.

use crate::error::{Error, ParseErrorKind, Result};
use crate::pdf::lexer::{LexBuf, Lexer, Token};
use crate::pdf::object::{Array, Dict, Name, Object, ObjRef, PdfString, StringKind};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    buf: LexBuf,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            buf: LexBuf::new(),
        }
    }

    /// Parse starting at a byte offset into `data`.
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self {
            lexer: Lexer::at(data, offset),
            buf: LexBuf::new(),
        }
    }

    pub fn pos(&self) -> usize {
        self.lexer.pos()
    }

    pub fn seek(&mut self, pos: usize) {
        self.lexer.seek(pos);
    }

    /// Parse the next object, folding `num gen R` into a reference.
    pub fn parse_object(&mut self) -> Result<Object> {
        let token = self.next_token()?;
        if token == Token::Int {
            let num = self.buf.int_value;
            // Look ahead for "gen R"
            let mark = self.lexer.pos();
            if self.next_token().ok() == Some(Token::Int) {
                let gen = self.buf.int_value;
                if self.next_token().ok() == Some(Token::R) {
                    if num >= 0 && num <= u32::MAX as i64 && (0..=u16::MAX as i64).contains(&gen) {
                        return Ok(Object::Ref(ObjRef::new(num as u32, gen as u16)));
                    }
                    return Err(self.error(ParseErrorKind::BadObjectHeader));
                }
            }
            self.lexer.seek(mark);
            return Ok(Object::Int(num));
        }
        self.parse_value(token)
    }

    fn parse_value(&mut self, token: Token) -> Result<Object> {
        match token {
            Token::Null => Ok(Object::Null),
            Token::True => Ok(Object::Bool(true)),
            Token::False => Ok(Object::Bool(false)),
            Token::Int => Ok(Object::Int(self.buf.int_value)),
            Token::Real => Ok(Object::Real(self.buf.real_value)),
            Token::String => Ok(Object::String(PdfString::new(
                self.buf.bytes.clone(),
                StringKind::Literal,
            ))),
            Token::HexString => Ok(Object::String(PdfString::new(
                self.buf.bytes.clone(),
                StringKind::Hex,
            ))),
            Token::Name => Ok(Object::Name(Name::from_string(self.buf.as_latin1()))),
            Token::OpenArray => self.parse_array(),
            Token::OpenDict => self.parse_dict().map(Object::Dict),
            _ => Err(self.error(ParseErrorKind::BadObjectHeader)),
        }
    }

    fn parse_array(&mut self) -> Result<Object> {
        let mut arr = Array::new();
        loop {
            let mark = self.lexer.pos();
            let token = self.next_token()?;
            match token {
                Token::CloseArray => return Ok(Object::Array(arr)),
                Token::Eof => return Err(self.error(ParseErrorKind::BadObjectHeader)),
                _ => {
                    self.lexer.seek(mark);
                    arr.push(self.parse_object()?);
                }
            }
        }
    }

    pub fn parse_dict(&mut self) -> Result<Dict> {
        let mut dict = Dict::new();
        loop {
            let token = self.next_token()?;
            match token {
                Token::CloseDict => return Ok(dict),
                Token::Name => {
                    let key = Name::from_string(self.buf.as_latin1());
                    let value = self.parse_object()?;
                    dict.insert(key, value);
                }
                _ => return Err(self.error(ParseErrorKind::BadObjectHeader)),
            }
        }
    }

    /// Parse an indirect object header: `num gen obj`.
    pub fn parse_object_header(&mut self) -> Result<ObjRef> {
        let num = self.expect_int()?;
        let gen = self.expect_int()?;
        self.expect_token(Token::Obj)?;
        if num < 0 || num > u32::MAX as i64 || !(0..=u16::MAX as i64).contains(&gen) {
            return Err(self.error(ParseErrorKind::BadObjectHeader));
        }
        Ok(ObjRef::new(num as u32, gen as u16))
    }

    /// Next token without consuming it.
    pub fn peek_token(&mut self) -> Result<Token> {
        let mark = self.lexer.pos();
        let token = self.next_token()?;
        self.lexer.seek(mark);
        Ok(token)
    }

    pub fn expect_token(&mut self, expected: Token) -> Result<()> {
        let token = self.next_token()?;
        if token != expected {
            return Err(self.error(ParseErrorKind::BadObjectHeader));
        }
        Ok(())
    }

    pub fn expect_int(&mut self) -> Result<i64> {
        match self.next_token()? {
            Token::Int => Ok(self.buf.int_value),
            _ => Err(self.error(ParseErrorKind::BadObjectHeader)),
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.lexer.lex(&mut self.buf)
    }

    /// After the `stream` keyword: skip the single mandated line break and
    /// return the offset of the first payload byte.
    pub fn stream_data_start(&mut self) -> usize {
        let data = self.lexer.data();
        let mut pos = self.lexer.pos();
        if pos < data.len() && data[pos] == b'\r' {
            pos += 1;
        }
        if pos < data.len() && data[pos] == b'\n' {
            pos += 1;
        }
        self.lexer.seek(pos);
        pos
    }

    fn error(&self, kind: ParseErrorKind) -> Error {
        Error::parse(self.lexer.pos(), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::object::DictExt;

    fn parse(data: &[u8]) -> Object {
        Parser::new(data).parse_object().unwrap()
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse(b"null"), Object::Null);
        assert_eq!(parse(b"true"), Object::Bool(true));
        assert_eq!(parse(b"false"), Object::Bool(false));
        assert_eq!(parse(b"42"), Object::Int(42));
        assert_eq!(parse(b"-17"), Object::Int(-17));
        assert!(matches!(parse(b"3.5"), Object::Real(v) if (v - 3.5).abs() < 1e-9));
    }

    #[test]
    fn test_parse_strings_keep_encoding_hint() {
        let lit = parse(b"(Hello)");
        let hex = parse(b"<48656C6C6F>");
        let s = lit.as_string().unwrap();
        assert_eq!(s.as_bytes(), b"Hello");
        assert_eq!(s.kind(), StringKind::Literal);
        let s = hex.as_string().unwrap();
        assert_eq!(s.as_bytes(), b"Hello");
        assert_eq!(s.kind(), StringKind::Hex);
    }

    #[test]
    fn test_parse_reference() {
        let obj = parse(b"5 2 R");
        assert_eq!(obj.as_ref_obj(), Some(ObjRef::new(5, 2)));
    }

    #[test]
    fn test_two_ints_are_not_a_reference() {
        let mut p = Parser::new(b"5 2 7");
        assert_eq!(p.parse_object().unwrap(), Object::Int(5));
        assert_eq!(p.parse_object().unwrap(), Object::Int(2));
        assert_eq!(p.parse_object().unwrap(), Object::Int(7));
    }

    #[test]
    fn test_parse_array_with_refs() {
        let obj = parse(b"[1 2 0 R /Name (str)]");
        let arr = obj.as_array().unwrap();
        assert_eq!(arr.len(), 4);
        assert_eq!(arr[0], Object::Int(1));
        assert_eq!(arr[1].as_ref_obj(), Some(ObjRef::new(2, 0)));
    }

    #[test]
    fn test_parse_nested_dict() {
        let obj = parse(b"<< /Type /Catalog /Pages 3 0 R /Sub << /A [1 2] >> >>");
        let dict = obj.as_dict().unwrap();
        assert!(dict.is_type("Catalog"));
        assert_eq!(dict.get_ref("Pages"), Some(ObjRef::new(3, 0)));
        let sub = dict.get_key("Sub").unwrap().as_dict().unwrap();
        assert_eq!(sub.get_key("A").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_object_header() {
        let mut p = Parser::new(b"12 0 obj << >> endobj");
        let r = p.parse_object_header().unwrap();
        assert_eq!(r, ObjRef::new(12, 0));
        let obj = p.parse_object().unwrap();
        assert!(obj.as_dict().unwrap().is_empty());
        p.expect_token(Token::EndObj).unwrap();
    }

    #[test]
    fn test_unterminated_array_fails() {
        assert!(Parser::new(b"[1 2").parse_object().is_err());
    }

    #[test]
    fn test_dict_key_must_be_name() {
        assert!(Parser::new(b"<< 1 2 >>").parse_object().is_err());
    }

    #[test]
    fn test_stream_data_start_skips_newline() {
        let data = b"stream\r\nDATA";
        let mut p = Parser::new(data);
        assert_eq!(p.next_token().unwrap(), Token::Stream);
        let start = p.stream_data_start();
        assert_eq!(&data[start..start + 4], b"DATA");
    }
}
