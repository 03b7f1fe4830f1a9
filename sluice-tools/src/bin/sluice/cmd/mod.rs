pub mod devmem;
pub mod probe;
pub mod read;
pub mod write;

/// Parse a possibly `0x`-prefixed address or length argument.
pub fn parse_u32(raw: &str) -> Result<u32, std::num::ParseIntError> {
    parse_int::parse(raw)
}
