//! FITS header card parsing and the ordered keyword-record header.

use std::io::{Read, Seek};

use log::{debug, warn};

use crate::block::{BlockReader, CARD_SIZE};
use crate::error::{Error, Result};
use crate::value::{format_value, parse_value, Value};

// ── Types ──

/// One parsed 80-byte header card.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRecord {
    /// Keyword name, trimmed, at most 8 characters.
    pub name: String,
    /// The typed value, if the card carries one.
    pub value: Option<Value>,
    /// Text after the first unquoted `/`, or the free text of a commentary card.
    pub comment: Option<String>,
}

impl KeywordRecord {
    pub fn new(name: impl Into<String>, value: Option<Value>, comment: Option<String>) -> Self {
        KeywordRecord {
            name: name.into(),
            value,
            comment,
        }
    }

    /// The name with any trailing index removed (`NAXIS2` → `NAXIS`).
    pub fn base_name(&self) -> &str {
        split_trailing_digits(&self.name).0
    }

    /// The trailing index of an indexed keyword (`NAXIS2` → `2`).
    pub fn sequence_number(&self) -> Option<u32> {
        split_trailing_digits(&self.name).1
    }

    /// Returns `true` if this card is the END keyword.
    pub fn is_end(&self) -> bool {
        self.name == "END"
    }

    pub fn string_value(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    pub fn bool_value(&self) -> Option<bool> {
        self.value.as_ref().and_then(Value::as_bool)
    }

    pub fn int_value(&self) -> Option<i64> {
        self.value.as_ref().and_then(Value::as_integer)
    }

    pub fn double_value(&self) -> Option<f64> {
        match self.value {
            Some(Value::Float(f)) => Some(f),
            _ => None,
        }
    }
}

impl core::fmt::Display for KeywordRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)?;
        if let Some(value) = &self.value {
            write!(f, " = {value}")?;
        }
        if let Some(comment) = &self.comment {
            write!(f, " / {comment}")?;
        }
        Ok(())
    }
}

/// Strip the maximal run of trailing ASCII digits from `name`.
///
/// Returns the base name and the parsed number if any digits were removed.
pub fn split_trailing_digits(name: &str) -> (&str, Option<u32>) {
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if base.len() == name.len() {
        return (name, None);
    }
    (base, name[base.len()..].parse().ok())
}

// ── Parsing ──

/// Keywords whose columns 9-80 are free-form text.
const COMMENTARY_KEYWORDS: [&str; 2] = ["COMMENT", "HISTORY"];

fn card_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Parse a single 80-byte card image.
///
/// Returns `None` for blank cards, whose name field is empty.
pub fn parse_card(card: &[u8; CARD_SIZE]) -> Option<KeywordRecord> {
    let name = String::from(card_text(&card[..8]).trim());
    if name.is_empty() {
        return None;
    }

    if COMMENTARY_KEYWORDS.contains(&name.as_str()) {
        let text = card_text(&card[8..]);
        let text = text.trim();
        let comment = (!text.is_empty()).then(|| String::from(text));
        return Some(KeywordRecord::new(name, None, comment));
    }

    let (value, comment) = parse_value(&card[10..]);
    Some(KeywordRecord::new(name, value, comment))
}

/// Serialize a record into an 80-byte card image.
///
/// Text that does not fit in 80 columns is cut off; the comment is dropped
/// first.
pub fn format_card(record: &KeywordRecord) -> [u8; CARD_SIZE] {
    let mut text = format!("{:<8.8}", record.name);

    if COMMENTARY_KEYWORDS.contains(&record.name.as_str()) {
        if let Some(comment) = &record.comment {
            text.push_str("  ");
            text.push_str(comment);
        }
    } else {
        text.push_str(if record.value.is_some() { "= " } else { "  " });
        if let Some(value) = &record.value {
            text.push_str(&format_value(value));
        }
        if let Some(comment) = &record.comment {
            text.push_str(" / ");
            text.push_str(comment);
        }
    }

    let mut buf = [b' '; CARD_SIZE];
    for (dst, src) in buf.iter_mut().zip(text.bytes()) {
        *dst = src;
    }
    buf
}

/// The ordered keyword records of one header.
///
/// Order is file order; duplicated and indexed keywords keep their relative
/// position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitsHeader {
    records: Vec<KeywordRecord>,
}

impl FitsHeader {
    pub fn new(records: Vec<KeywordRecord>) -> Self {
        FitsHeader { records }
    }

    pub fn records(&self) -> &[KeywordRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeywordRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records matching `keyword`, in file order.
    ///
    /// An unindexed query (`NAXIS`) matches every record with that base name
    /// (`NAXIS`, `NAXIS1`, `NAXIS2`, ...). An indexed query (`NAXIS2`) matches
    /// that exact name only.
    pub fn records_for_keyword(&self, keyword: &str) -> Vec<&KeywordRecord> {
        let indexed = split_trailing_digits(keyword).1.is_some();
        self.records
            .iter()
            .filter(|r| {
                if indexed {
                    r.name == keyword
                } else {
                    r.base_name() == keyword
                }
            })
            .collect()
    }

    /// The first record named exactly `keyword`.
    pub fn record(&self, keyword: &str) -> Option<&KeywordRecord> {
        self.records.iter().find(|r| r.name == keyword)
    }

    pub fn value(&self, keyword: &str) -> Option<&Value> {
        self.record(keyword).and_then(|r| r.value.as_ref())
    }

    pub fn integer(&self, keyword: &str) -> Option<i64> {
        self.value(keyword).and_then(Value::as_integer)
    }

    pub fn float(&self, keyword: &str) -> Option<f64> {
        self.value(keyword).and_then(Value::as_f64)
    }

    pub fn logical(&self, keyword: &str) -> Option<bool> {
        self.value(keyword).and_then(Value::as_bool)
    }

    pub fn string(&self, keyword: &str) -> Option<&str> {
        self.value(keyword).and_then(Value::as_str)
    }

    /// Distinct base keyword names in order of first appearance.
    pub fn keywords(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for record in &self.records {
            let base = record.base_name();
            if !names.contains(&base) {
                names.push(base);
            }
        }
        names
    }

    /// Check that the header opens with `SIMPLE = T`.
    pub fn validate_simple(&self) -> Result<()> {
        match self.records.first() {
            Some(r) if r.name == "SIMPLE" && r.bool_value() == Some(true) => Ok(()),
            _ => Err(Error::MalformedHeader("header does not start with SIMPLE = T")),
        }
    }
}

impl<'a> IntoIterator for &'a FitsHeader {
    type Item = &'a KeywordRecord;
    type IntoIter = core::slice::Iter<'a, KeywordRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Read the primary header starting at block 0.
///
/// Returns the header and the index of the first block after it, where the
/// primary data begins. Consumption stops after the block holding the END
/// card, or at the first block containing a byte outside printable ASCII;
/// such a block is not part of the header and its cards are not parsed.
pub fn parse_header<R: Read + Seek>(reader: &mut BlockReader<R>) -> Result<(FitsHeader, usize)> {
    let mut records = Vec::new();
    let mut index = 0;

    loop {
        let block = reader
            .read_block(index)?
            .ok_or(Error::MalformedHeader("no END card before end of file"))?;

        if !block.is_printable() {
            if index == 0 {
                return Err(Error::MalformedHeader("first block is not a header block"));
            }
            warn!("header ended without END card at non-printable block {index}");
            break;
        }

        for card in block.cards() {
            let Some(record) = parse_card(card) else {
                continue;
            };
            if record.is_end() {
                debug!(
                    "parsed {} header records from {} blocks",
                    records.len(),
                    index + 1
                );
                return Ok((FitsHeader::new(records), index + 1));
            }
            records.push(record);
        }
        index += 1;
    }

    debug!("parsed {} header records from {index} blocks", records.len());
    Ok((FitsHeader::new(records), index))
}
