use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{self as ch, char};
use nom::combinator::{all_consuming, map, rest, value};
use nom::number::complete::float;
use nom::sequence::{delimited, preceded};
use nom::{Finish, IResult};

use crate::message::MessageType;
use crate::types::DeviceId;

type Input<'a> = &'a str;

/// Run `parser` over the complete token, None if anything is left over.
pub(crate) fn parse_all<'a, O, F>(parser: F, token: Input<'a>) -> Option<O>
where
    F: FnMut(Input<'a>) -> IResult<Input<'a>, O>,
{
    all_consuming(parser)(token)
        .finish()
        .ok()
        .map(|(_, out)| out)
}

/// `(<decimal>)`, the first token of every device event.
pub(crate) fn device_id(input: Input) -> IResult<Input, DeviceId> {
    delimited(char('('), ch::u32, char(')'))(input)
}

/// `ID:---` or `ID:<decimal>`, sent by legacy firmware only.
pub(crate) fn message_id(input: Input) -> IResult<Input, Option<u32>> {
    preceded(
        tag("ID:"),
        alt((value(None, tag("---")), map(ch::u32, Some))),
    )(input)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum EventToken<'a> {
    Plain(MessageType),
    /// `SET:` or `INT:`, with whatever followed the colon.
    Temperature(MessageType, &'a str),
}

pub(crate) fn event_token(input: Input) -> IResult<Input, EventToken> {
    use EventToken::{Plain, Temperature};
    alt((
        value(Plain(MessageType::Sensor), tag("SENSOR")),
        value(Plain(MessageType::Tamper), tag("TAMPER")),
        value(Plain(MessageType::Beacon), tag("BEACON")),
        value(Plain(MessageType::Button), tag("BUTTON")),
        value(Plain(MessageType::Arm), tag("ARM:1")),
        value(Plain(MessageType::Disarm), tag("ARM:0")),
        map(preceded(tag("SET:"), rest), |t| Temperature(MessageType::Set, t)),
        map(preceded(tag("INT:"), rest), |t| Temperature(MessageType::Int, t)),
    ))(input)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum AttributeName {
    LowBattery,
    Activation,
    Blackout,
}

/// Matches the name part of a `NAME:<int>` attribute, returning the value text.
pub(crate) fn attribute_name(input: Input) -> IResult<Input, AttributeName> {
    alt((
        value(AttributeName::LowBattery, tag("LB:")),
        value(AttributeName::Activation, tag("ACT:")),
        value(AttributeName::Blackout, tag("BLACKOUT:")),
    ))(input)
}

pub(crate) fn attribute_value(token: Input) -> Option<i32> {
    parse_all(ch::i32, token)
}

pub(crate) fn temperature(field: Input) -> Option<f32> {
    parse_all(float, field)
}

pub(crate) fn decimal_u8(field: Input) -> Option<u8> {
    parse_all(ch::u8, field)
}

pub(crate) fn decimal_u32(field: Input) -> Option<u32> {
    parse_all(ch::u32, field)
}

/// Characters `from..to` of `s`, clamped to its length.
pub(crate) fn span(s: &str, from: usize, to: usize) -> &str {
    let offset = |n: usize| s.char_indices().nth(n).map_or(s.len(), |(i, _)| i);
    let (start, end) = (offset(from), offset(to));
    &s[start..end.max(start)]
}
