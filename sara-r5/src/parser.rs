//! Extraction of structured records from raw response text.
//!
//! Responses are scanned positionally, field by field, straight from the
//! received bytes. Nothing here allocates beyond the returned records.

use std::net::Ipv4Addr;

use tracing::{debug, trace};

use crate::at;
use crate::error::{Result, SaraError};
use crate::types::{OperatorStats, OperatorStatus, PdpContext, PdpType, SocketHandle};

/// Cursor over response bytes with `scanf`-like field readers.
struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Optionally signed decimal integer, leading whitespace allowed.
    fn int(&mut self) -> Option<i64> {
        self.skip_whitespace();
        let start = self.pos;
        let negative = match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                true
            }
            Some(b'+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };

        let digits_start = self.pos;
        let mut value: i64 = 0;
        while let Some(d) = self.peek().filter(u8::is_ascii_digit) {
            let next = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(i64::from(d - b'0')));
            let Some(next) = next else {
                self.pos = start;
                return None;
            };
            value = next;
            self.pos += 1;
        }
        if self.pos == digits_start {
            self.pos = start;
            return None;
        }

        Some(if negative { -value } else { value })
    }

    fn literal(&mut self, expected: &[u8]) -> Option<()> {
        let rest = &self.input[self.pos..];
        if rest.starts_with(expected) {
            self.pos += expected.len();
            Some(())
        } else {
            None
        }
    }

    /// Non-empty run of bytes up to the next `"`, which is not consumed.
    fn until_quote(&mut self) -> Option<&'a [u8]> {
        let rest = &self.input[self.pos..];
        let len = rest.iter().position(|&b| b == b'"').unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }

    fn octet(&mut self) -> Option<u8> {
        self.int().and_then(|v| u8::try_from(v).ok())
    }
}

fn bounded_text(bytes: &[u8], max: usize) -> String {
    String::from_utf8_lossy(&bytes[..bytes.len().min(max)]).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Scans a whole `(stat,"long","short","numeric",act)` tuple from the start
/// of `input`. Returns the record and the number of bytes consumed.
fn scan_operator(input: &[u8]) -> Option<(OperatorStats, usize)> {
    let mut s = Scanner::new(input);
    s.literal(b"(")?;
    let status = s.int().and_then(OperatorStatus::from_code)?;
    s.literal(b",\"")?;
    let long_name = s.until_quote()?;
    s.literal(b"\",\"")?;
    let short_name = s.until_quote()?;
    s.literal(b"\",\"")?;
    let numeric_id = s.int().and_then(|v| u32::try_from(v).ok())?;
    s.literal(b"\",")?;
    let access_technology = s.int().and_then(|v| u8::try_from(v).ok())?;
    s.literal(b")")?;

    let operator = OperatorStats {
        status,
        long_name: bounded_text(long_name, at::LONG_OPERATOR_LEN),
        short_name: bounded_text(short_name, at::SHORT_OPERATOR_LEN),
        numeric_id,
        access_technology,
    };
    Some((operator, s.pos))
}

/// Parses the tuple list of an `AT+COPS=?` response.
///
/// At most `max` parenthesised spans are examined. A span that does not
/// carry all five fields is skipped but still counts towards `max`.
pub fn parse_operators(response: &[u8], max: usize) -> Vec<OperatorStats> {
    let mut operators = Vec::new();
    let mut rest = response;

    for _ in 0..max {
        let Some(open) = rest.iter().position(|&b| b == b'(') else {
            break;
        };
        let tuple = &rest[open..];

        if let Some((op, consumed)) = scan_operator(tuple) {
            operators.push(op);
            rest = &tuple[consumed..];
            continue;
        }

        // An unparseable entry ends at its first ')'.
        let Some(close) = tuple.iter().position(|&b| b == b')') else {
            break;
        };
        trace!(
            span = %String::from_utf8_lossy(&tuple[..close]),
            "Skipping unparseable operator entry"
        );
        rest = &tuple[close + 1..];
    }

    debug!(count = operators.len(), "Parsed operators");
    operators
}

/// Scans `cid,"type","apn","a.b.c.d` from the start of `record`.
fn scan_pdp_context(record: &[u8]) -> Option<PdpContext> {
    let mut s = Scanner::new(record);
    let cid = s.int().and_then(|v| i32::try_from(v).ok())?;
    s.literal(b",\"")?;
    let pdp_type = s.until_quote()?;
    s.literal(b"\",\"")?;
    let apn = s.until_quote()?;
    s.literal(b"\",\"")?;
    let a = s.octet()?;
    s.literal(b".")?;
    let b = s.octet()?;
    s.literal(b".")?;
    let c = s.octet()?;
    s.literal(b".")?;
    let d = s.octet()?;

    Some(PdpContext {
        cid,
        pdp_type: PdpType::from_wire(pdp_type),
        apn: bounded_text(apn, at::APN_LEN),
        address: Ipv4Addr::new(a, b, c, d),
    })
}

/// Parses up to `max` `+CGDCONT:` records out of an `AT+CGDCONT?` response.
///
/// The first record is the active context. Returns
/// [`SaraError::NoResponse`] if no record could be parsed.
pub fn parse_pdp_contexts(response: &[u8], max: usize) -> Result<Vec<PdpContext>> {
    let marker = at::PDP_CONTEXT_MARKER.as_bytes();
    let mut contexts = Vec::new();
    let mut rest = response;

    for _ in 0..max {
        let Some(idx) = find(rest, marker) else {
            break;
        };
        rest = &rest[idx + marker.len()..];
        let spaces = rest.iter().take_while(|&&b| b == b' ').count();
        rest = &rest[spaces..];

        if let Some(context) = scan_pdp_context(rest) {
            contexts.push(context);
        }
    }

    if contexts.is_empty() {
        return Err(SaraError::NoResponse);
    }
    debug!(count = contexts.len(), "Parsed PDP contexts");
    Ok(contexts)
}

/// Extracts the handle from a `+USOCR: <n>` reply.
pub fn parse_socket_handle(response: &[u8]) -> Result<SocketHandle> {
    let marker = at::SOCKET_CREATE_MARKER.as_bytes();
    let idx = find(response, marker).ok_or(SaraError::InvalidSocket)?;
    let mut s = Scanner::new(&response[idx + marker.len()..]);
    let handle = s.int().ok_or(SaraError::InvalidSocket)?;
    SocketHandle::try_from(handle)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn operator_tuple_fields_are_verbatim() {
        let text = b"\r\n+COPS: (2,\"Vodafone ES\",\"VOD\",\"21401\",7)\r\n\r\nOK\r\n";
        let ops = parse_operators(text, 3);
        assert_eq!(
            ops,
            vec![OperatorStats {
                status: OperatorStatus::Current,
                long_name: "Vodafone ES".into(),
                short_name: "VOD".into(),
                numeric_id: 21401,
                access_technology: 7,
            }]
        );
    }

    #[test]
    fn operators_in_order_and_bounded() {
        let text = b"+COPS: (1,\"313 100\",\"313 100\",\"313100\",8),\
            (2,\"AT&T\",\"AT&T\",\"310410\",8),\
            (3,\"T-Mobile\",\"TMO\",\"310260\",7),,(0-4),(0-2)";
        let ops = parse_operators(text, 2);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].status, OperatorStatus::Available);
        assert_eq!(ops[0].numeric_id, 313100);
        assert_eq!(ops[1].long_name, "AT&T");

        let ops = parse_operators(text, 5);
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[2].status, OperatorStatus::Forbidden);
    }

    #[test]
    fn malformed_span_counts_towards_max() {
        let text = b"(2,\"A\",\"B\",\"1\",7),(garbage),(1,\"C\",\"D\",\"2\",7)";
        let ops = parse_operators(text, 2);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].long_name, "A");

        let ops = parse_operators(text, 3);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].long_name, "C");
    }

    #[test]
    fn operator_names_are_truncated() {
        let text = b"(1,\"An Operator With A Very Long Name\",\"SHORTNAME123\",\"1\",0)";
        let ops = parse_operators(text, 1);
        assert_eq!(ops[0].long_name, "An Operator With A Very L");
        assert_eq!(ops[0].short_name, "SHORTNAME1");
    }

    #[test]
    fn no_operators() {
        assert!(parse_operators(b"\r\nOK\r\n", 3).is_empty());
        assert!(parse_operators(b"(unterminated", 3).is_empty());
        assert!(parse_operators(b"", 0).is_empty());
    }

    #[test]
    fn operator_name_with_parenthesis() {
        let text = b"(2,\"Foo (Bar)\",\"FB\",\"12345\",7),(1,\"X\",\"Y\",\"1\",7)";
        let ops = parse_operators(text, 3);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].long_name, "Foo (Bar)");
        assert_eq!(ops[0].numeric_id, 12345);
        assert_eq!(ops[1].long_name, "X");
    }

    #[test]
    fn unbounded_max_does_not_reserve() {
        assert!(parse_operators(b"\r\nOK\r\n", usize::MAX).is_empty());
        let ops = parse_operators(b"(2,\"A\",\"B\",\"1\",7)", usize::MAX);
        assert_eq!(ops.len(), 1);

        assert!(matches!(
            parse_pdp_contexts(b"\r\nOK\r\n", usize::MAX),
            Err(SaraError::NoResponse)
        ));
        let text = b"+CGDCONT: 1,\"IP\",\"apn\",\"1.2.3.4\"";
        assert_eq!(parse_pdp_contexts(text, usize::MAX).unwrap().len(), 1);
    }

    #[test]
    fn pdp_context_record() {
        let text = b"+CGDCONT: 1,\"IP\",\"internet\",\"10.0.0.5\",0,0,0,2,0,0,0,0,0,0";
        let contexts = parse_pdp_contexts(text, 3).unwrap();
        assert_eq!(
            contexts,
            vec![PdpContext {
                cid: 1,
                pdp_type: PdpType::Ip,
                apn: "internet".into(),
                address: Ipv4Addr::new(10, 0, 0, 5),
            }]
        );
    }

    #[test]
    fn several_pdp_contexts() {
        let text = b"\r\n+CGDCONT: 1,\"IPV4V6\",\"payandgo.o2.co.uk\",\"10.160.182.234\",0,0\r\n\
            +CGDCONT: 2,\"NONIP\",\"iot\",\"0.0.0.0\",0,0\r\n\
            +CGDCONT: 3,\"PPP\",\"x\",\"1.2.3.4\"\r\n\
            +CGDCONT: 4,\"IP\",\"y\",\"1.2.3.4\"\r\n\r\nOK\r\n";
        let contexts = parse_pdp_contexts(text, 3).unwrap();
        assert_eq!(contexts.len(), 3);
        assert_eq!(contexts[0].pdp_type, PdpType::Ipv4v6);
        assert_eq!(contexts[0].address, Ipv4Addr::new(10, 160, 182, 234));
        assert_eq!(contexts[1].pdp_type, PdpType::NonIp);
        assert_eq!(contexts[2].pdp_type, PdpType::Invalid);
    }

    #[test]
    fn pdp_context_empty_fields_are_skipped() {
        let text = b"+CGDCONT: 1,\"\",\"apn\",\"1.2.3.4\"\r\n+CGDCONT: 2,\"IP\",\"\",\"1.2.3.4\"";
        assert!(matches!(
            parse_pdp_contexts(text, 3),
            Err(SaraError::NoResponse)
        ));
    }

    #[test]
    fn pdp_context_octet_out_of_range() {
        let text = b"+CGDCONT: 1,\"IP\",\"apn\",\"1.2.3.256\"";
        assert!(parse_pdp_contexts(text, 3).is_err());
    }

    #[test]
    fn socket_handle_reply() {
        let handle = parse_socket_handle(b"\r\n+USOCR: 3\r\n\r\nOK\r\n").unwrap();
        assert_eq!(handle.get(), 3);
        assert!(matches!(
            parse_socket_handle(b"\r\nOK\r\n"),
            Err(SaraError::InvalidSocket)
        ));
        assert!(matches!(
            parse_socket_handle(b"+USOCR: \r\n"),
            Err(SaraError::InvalidSocket)
        ));
        assert!(matches!(
            parse_socket_handle(b"+USOCR: 6"),
            Err(SaraError::InvalidSocket)
        ));
    }

    #[test]
    fn scanner_ints() {
        assert_eq!(Scanner::new(b"  -42,").int(), Some(-42));
        assert_eq!(Scanner::new(b"+7").int(), Some(7));
        assert_eq!(Scanner::new(b"x").int(), None);
        assert_eq!(Scanner::new(b"-").int(), None);
        assert_eq!(Scanner::new(b"99999999999999999999").int(), None);
    }

    fn operator() -> impl Strategy<Value = OperatorStats> {
        (
            0u8..4,
            "[A-Za-z0-9 &-]{1,25}",
            "[A-Za-z0-9]{1,10}",
            any::<u32>(),
            any::<u8>(),
        )
            .prop_map(|(status, long_name, short_name, numeric_id, act)| {
                OperatorStats {
                    status: OperatorStatus::from_code(status.into())
                        .unwrap_or(OperatorStatus::Unknown),
                    long_name,
                    short_name,
                    numeric_id,
                    access_technology: act,
                }
            })
    }

    fn render(op: &OperatorStats) -> String {
        format!(
            "({},\"{}\",\"{}\",\"{}\",{})",
            op.status.code(),
            op.long_name,
            op.short_name,
            op.numeric_id,
            op.access_technology
        )
    }

    proptest! {
        #[test]
        fn operator_list_yields_every_tuple(
            ops in prop::collection::vec(operator(), 0..6),
            extra in 0usize..3,
        ) {
            let joined: Vec<String> = ops.iter().map(render).collect();
            let text = format!(
                "+COPS: {},,(0-4),(0-2)\r\n\r\nOK\r\n",
                joined.join(",")
            );
            let parsed = parse_operators(text.as_bytes(), ops.len() + extra);
            prop_assert_eq!(parsed, ops);
        }

        #[test]
        fn parsers_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            let _ = parse_operators(&bytes, 3);
            let _ = parse_pdp_contexts(&bytes, 3);
            let _ = parse_socket_handle(&bytes);
        }

        #[test]
        fn socket_handle_in_range(handle in 0u8..6) {
            let text = format!("\r\n+USOCR: {handle}\r\n\r\nOK\r\n");
            let parsed = parse_socket_handle(text.as_bytes()).unwrap();
            prop_assert_eq!(parsed.get(), handle);
        }
    }
}
