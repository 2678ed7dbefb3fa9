//! XML-RPC wire codec
//!
//! Requests are written by hand (the grammar is tiny); responses are tokenized
//! with `quick-xml` and walked by a small recursive-descent parser. Values are
//! represented as [`serde_json::Value`] on both sides.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::{Map, Number, Value};

use crate::error::{ClientError, Result};

/// Encode a `methodCall` document
#[must_use]
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Null => out.push_str("<nil/>"),
        Value::Bool(b) => {
            out.push_str(if *b { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" });
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i32::try_from(i).is_ok() {
                    out.push_str(&format!("<int>{i}</int>"));
                } else {
                    out.push_str(&format!("<i8>{i}</i8>"));
                }
            } else if let Some(u) = n.as_u64() {
                out.push_str(&format!("<i8>{u}</i8>"));
            } else {
                out.push_str(&format!("<double>{}</double>", n.as_f64().unwrap_or_default()));
            }
        }
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Object(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Decode a `methodResponse` document
///
/// # Errors
/// Returns [`ClientError::Fault`] when the server answered with a fault,
/// [`ClientError::Xml`] for malformed XML and [`ClientError::InvalidResponse`]
/// when the document is not a method response.
pub fn decode_response(xml: &str) -> Result<Value> {
    let mut parser = Parser::new(tokenize(xml)?);

    parser.expect_open("methodResponse")?;
    match parser.peek_structural() {
        Some(Token::Open(name)) if name == "fault" => {
            parser.advance();
            let fault = parser.value()?;
            parser.expect_close("fault")?;
            parser.expect_close("methodResponse")?;
            Err(fault_from_value(fault))
        }
        Some(Token::Open(name)) if name == "params" => {
            parser.advance();
            parser.expect_open("param")?;
            let value = parser.value()?;
            parser.expect_close("param")?;
            parser.expect_close("params")?;
            parser.expect_close("methodResponse")?;
            Ok(value)
        }
        other => Err(ClientError::InvalidResponse(format!(
            "expected <params> or <fault>, found {other:?}"
        ))),
    }
}

fn fault_from_value(value: Value) -> ClientError {
    let code = value
        .get("faultCode")
        .and_then(Value::as_i64)
        .unwrap_or_default();
    let message = match value.get("faultString") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "unknown fault".to_string(),
    };
    ClientError::Fault { code, message }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
}

fn tokenize(xml: &str) -> Result<Vec<Token>> {
    let mut reader = Reader::from_str(xml);
    let mut tokens = Vec::new();

    loop {
        match reader
            .read_event()
            .map_err(|e| ClientError::Xml(e.to_string()))?
        {
            Event::Start(e) => tokens.push(Token::Open(tag_name(e.name().as_ref()))),
            Event::End(e) => tokens.push(Token::Close(tag_name(e.name().as_ref()))),
            Event::Empty(e) => tokens.push(Token::Empty(tag_name(e.name().as_ref()))),
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| ClientError::Xml(e.to_string()))?;
                push_text(&mut tokens, &text);
            }
            Event::CData(c) => {
                let bytes = c.into_inner();
                push_text(&mut tokens, &String::from_utf8_lossy(&bytes));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(tokens)
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

// Adjacent text and CDATA sections form one text node
fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Text(previous)) = tokens.last_mut() {
        previous.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn skip_whitespace(&mut self) {
        while let Some(Token::Text(text)) = self.peek() {
            if !text.trim().is_empty() {
                break;
            }
            self.advance();
        }
    }

    fn peek_structural(&mut self) -> Option<&Token> {
        self.skip_whitespace();
        self.peek()
    }

    fn take_text(&mut self) -> String {
        match self.peek() {
            Some(Token::Text(text)) => {
                let text = text.clone();
                self.advance();
                text
            }
            _ => String::new(),
        }
    }

    fn expect_open(&mut self, name: &str) -> Result<()> {
        match self.peek_structural() {
            Some(Token::Open(found)) if found == name => {
                self.advance();
                Ok(())
            }
            other => Err(ClientError::InvalidResponse(format!(
                "expected <{name}>, found {other:?}"
            ))),
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<()> {
        match self.peek_structural() {
            Some(Token::Close(found)) if found == name => {
                self.advance();
                Ok(())
            }
            other => Err(ClientError::InvalidResponse(format!(
                "expected </{name}>, found {other:?}"
            ))),
        }
    }

    /// Parse one `<value>` element
    fn value(&mut self) -> Result<Value> {
        match self.peek_structural() {
            Some(Token::Empty(name)) if name == "value" => {
                self.advance();
                return Ok(Value::String(String::new()));
            }
            Some(Token::Open(name)) if name == "value" => self.advance(),
            other => {
                return Err(ClientError::InvalidResponse(format!(
                    "expected <value>, found {other:?}"
                )));
            }
        }

        // A value without a type element is a string
        let text = self.take_text();
        if let Some(Token::Close(name)) = self.peek()
            && name == "value"
        {
            self.advance();
            return Ok(Value::String(text));
        }
        if !text.trim().is_empty() {
            return Err(ClientError::InvalidResponse(format!(
                "unexpected text inside <value>: {text:?}"
            )));
        }

        let value = self.typed()?;
        self.expect_close("value")?;
        Ok(value)
    }

    fn typed(&mut self) -> Result<Value> {
        let token = self.peek().cloned();
        self.advance();
        match token {
            Some(Token::Empty(name)) => match name.as_str() {
                "nil" => Ok(Value::Null),
                "string" | "base64" | "dateTime.iso8601" => Ok(Value::String(String::new())),
                "array" => Ok(Value::Array(Vec::new())),
                "struct" => Ok(Value::Object(Map::new())),
                other => Err(ClientError::InvalidResponse(format!(
                    "empty <{other}/> is not a value"
                ))),
            },
            Some(Token::Open(name)) => {
                let value = match name.as_str() {
                    "array" => self.array()?,
                    "struct" => self.structure()?,
                    "nil" => Value::Null,
                    scalar => {
                        let text = self.take_text();
                        scalar_value(scalar, &text)?
                    }
                };
                self.expect_close(&name)?;
                Ok(value)
            }
            other => Err(ClientError::InvalidResponse(format!(
                "expected a type element, found {other:?}"
            ))),
        }
    }

    fn array(&mut self) -> Result<Value> {
        match self.peek_structural() {
            Some(Token::Empty(name)) if name == "data" => {
                self.advance();
                return Ok(Value::Array(Vec::new()));
            }
            _ => self.expect_open("data")?,
        }

        let mut items = Vec::new();
        while !matches!(self.peek_structural(), Some(Token::Close(name)) if name == "data") {
            items.push(self.value()?);
        }
        self.expect_close("data")?;
        Ok(Value::Array(items))
    }

    fn structure(&mut self) -> Result<Value> {
        let mut members = Map::new();
        while !matches!(self.peek_structural(), Some(Token::Close(name)) if name == "struct") {
            self.expect_open("member")?;
            self.expect_open("name")?;
            let name = self.take_text();
            self.expect_close("name")?;
            let value = self.value()?;
            self.expect_close("member")?;
            members.insert(name, value);
        }
        Ok(Value::Object(members))
    }
}

fn scalar_value(kind: &str, text: &str) -> Result<Value> {
    let invalid = |what: &str| ClientError::InvalidResponse(format!("invalid {what}: {text:?}"));

    match kind {
        "int" | "i4" | "i8" => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid(kind)),
        "boolean" => match text.trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            _ => Err(invalid(kind)),
        },
        "double" => text
            .trim()
            .parse::<f64>()
            .map(|f| Number::from_f64(f).map_or(Value::Null, Value::Number))
            .map_err(|_| invalid(kind)),
        "string" | "dateTime.iso8601" => Ok(Value::String(text.to_string())),
        "base64" => Ok(Value::String(text.trim().to_string())),
        other => Err(ClientError::InvalidResponse(format!(
            "unsupported value type <{other}>"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?>\n<methodResponse>\n<params>\n<param>\n{value}\n</param>\n</params>\n</methodResponse>\n"
        )
    }

    #[test]
    fn test_encode_login_call() {
        let xml = encode_call("login", &[json!("u"), json!("p&<")]);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\"?><methodCall><methodName>login</methodName><params>\
             <param><value><string>u</string></value></param>\
             <param><value><string>p&amp;&lt;</string></value></param>\
             </params></methodCall>"
        );
    }

    #[test]
    fn test_encode_scalars() {
        let xml = encode_call("m", &[json!(7), json!(5_000_000_000_i64), json!(true), json!(null)]);
        assert!(xml.contains("<value><int>7</int></value>"));
        assert!(xml.contains("<value><i8>5000000000</i8></value>"));
        assert!(xml.contains("<value><boolean>1</boolean></value>"));
        assert!(xml.contains("<value><nil/></value>"));
    }

    #[test]
    fn test_encode_nested() {
        let xml = encode_call("m", &[json!({"tags": ["a"]})]);
        assert!(xml.contains(
            "<struct><member><name>tags</name><value><array><data>\
             <value><string>a</string></value></data></array></value></member></struct>"
        ));
    }

    #[test]
    fn test_decode_login_response() {
        let xml = response(
            "<value><array><data>\
             <value><string>sid123</string></value>\
             <value><struct>\
               <member><name>id</name><value><int>42</int></value></member>\
               <member><name>username</name><value><string>u</string></value></member>\
             </struct></value>\
             </data></array></value>",
        );
        let value = decode_response(&xml).unwrap();
        assert_eq!(value, json!(["sid123", {"id": 42, "username": "u"}]));
    }

    #[test]
    fn test_decode_untyped_and_entities() {
        let xml = response("<value>  a &amp; b  </value>");
        assert_eq!(decode_response(&xml).unwrap(), json!("  a & b  "));
    }

    #[test]
    fn test_decode_scalar_types() {
        let xml = response(
            "<value><struct>\
             <member><name>on</name><value><boolean>1</boolean></value></member>\
             <member><name>ratio</name><value><double>0.5</double></value></member>\
             <member><name>when</name><value><dateTime.iso8601>20160101T00:00:00</dateTime.iso8601></value></member>\
             <member><name>none</name><value><nil/></value></member>\
             <member><name>empty</name><value><string/></value></member>\
             <member><name>i4</name><value><i4>-3</i4></value></member>\
             </struct></value>",
        );
        assert_eq!(
            decode_response(&xml).unwrap(),
            json!({
                "on": true,
                "ratio": 0.5,
                "when": "20160101T00:00:00",
                "none": null,
                "empty": "",
                "i4": -3
            })
        );
    }

    #[test]
    fn test_decode_empty_array() {
        let xml = response("<value><array><data></data></array></value>");
        assert_eq!(decode_response(&xml).unwrap(), json!([]));

        let xml = response("<value><array><data/></array></value>");
        assert_eq!(decode_response(&xml).unwrap(), json!([]));
    }

    #[test]
    fn test_decode_cdata() {
        let xml = response("<value><string><![CDATA[<raw>]]></string></value>");
        assert_eq!(decode_response(&xml).unwrap(), json!("<raw>"));
    }

    #[test]
    fn test_decode_fault() {
        let xml = "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
                   <member><name>faultCode</name><value><int>1</int></value></member>\
                   <member><name>faultString</name><value><string>LoginError</string></value></member>\
                   </struct></value></fault></methodResponse>";
        match decode_response(xml) {
            Err(ClientError::Fault { code, message }) => {
                assert_eq!(code, 1);
                assert_eq!(message, "LoginError");
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_response("<html><body>502</body></html>"),
            Err(ClientError::InvalidResponse(_))
        ));
        assert!(decode_response("<methodResponse><params>").is_err());
    }

    #[test]
    fn test_decode_unknown_type() {
        let xml = response("<value><blob>x</blob></value>");
        assert!(matches!(
            decode_response(&xml),
            Err(ClientError::InvalidResponse(_))
        ));
    }
}
