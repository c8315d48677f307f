use crate::error::AvrokitErr;
use integer_encoding::VarIntReader;
use integer_encoding::VarIntWriter;
use std::io::{Error, ErrorKind, Read, Write};
use std::str;

pub(crate) fn decode_string<R: Read>(reader: &mut R) -> Result<String, AvrokitErr> {
    let buf = decode_bytes(reader)?;
    let s = str::from_utf8(&buf).map_err(|_e| {
        let err = Error::new(ErrorKind::InvalidData, "Failed decoding string from bytes");
        AvrokitErr::DecodeFailed(err)
    })?;
    Ok(s.to_string())
}

pub(crate) fn decode_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>, AvrokitErr> {
    let len = decode_long(reader)?;
    if len < 0 {
        return Err(AvrokitErr::DecodeFailed(Error::new(
            ErrorKind::InvalidData,
            "negative byte length",
        )));
    }
    let mut byte_buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut byte_buf)
        .map_err(AvrokitErr::DecodeFailed)?;
    Ok(byte_buf)
}

pub(crate) fn decode_long<R: Read>(reader: &mut R) -> Result<i64, AvrokitErr> {
    reader.read_varint().map_err(AvrokitErr::DecodeFailed)
}

pub(crate) fn decode_int<R: Read>(reader: &mut R) -> Result<i32, AvrokitErr> {
    reader.read_varint().map_err(AvrokitErr::DecodeFailed)
}

pub fn encode_long<W: Write>(value: i64, writer: &mut W) -> Result<usize, AvrokitErr> {
    writer.write_varint(value).map_err(AvrokitErr::EncodeFailed)
}

pub fn encode_int<W: Write>(value: i32, writer: &mut W) -> Result<usize, AvrokitErr> {
    writer.write_varint(value).map_err(AvrokitErr::EncodeFailed)
}

pub fn encode_raw_bytes<W: Write>(value: &[u8], writer: &mut W) -> Result<(), AvrokitErr> {
    writer.write_all(value).map_err(AvrokitErr::EncodeFailed)
}

pub(crate) fn encode_len_prefixed<W: Write>(value: &[u8], writer: &mut W) -> Result<(), AvrokitErr> {
    encode_long(value.len() as i64, writer)?;
    encode_raw_bytes(value, writer)
}
