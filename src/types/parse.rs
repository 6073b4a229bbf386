//! Wire type name parser using nom.
//!
//! Accepts both spellings the server uses:
//!
//! ```text
//! Nullable(Array(Decimal(38, 9)))      wrapper style
//! array(numeric(38, 9) null) not null  suffix style
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_till, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, value},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use super::{ColumnKind, WireColumn, DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE};

/// Parse a complete type name. `None` if anything is left over.
pub(super) fn parse_type(input: &str) -> Option<WireColumn> {
    match column_type(input) {
        Ok((rest, column)) if rest.trim().is_empty() => Some(column),
        _ => None,
    }
}

/// A type followed by an optional `null` / `not null` suffix.
fn column_type(input: &str) -> IResult<&str, WireColumn> {
    let (input, _) = multispace0(input)?;
    let (input, mut column) = alt((nullable, array, tuple_type, decimal, datetime64, scalar))(input)?;
    let (input, suffix) = null_suffix(input)?;
    if let Some(nullable) = suffix {
        column.nullable |= nullable;
    }
    Ok((input, column))
}

/// `( inner )` with optional whitespace around the inner parser.
fn parens<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(
        pair(multispace0, char('(')),
        inner,
        pair(multispace0, char(')')),
    )
}

fn number(input: &str) -> IResult<&str, u32> {
    preceded(multispace0, map_res(digit1, |digits: &str| digits.parse::<u32>()))(input)
}

fn nullable(input: &str) -> IResult<&str, WireColumn> {
    map(preceded(tag_no_case("nullable"), parens(column_type)), |mut column| {
        column.nullable = true;
        column
    })(input)
}

fn array(input: &str) -> IResult<&str, WireColumn> {
    map(preceded(tag_no_case("array"), parens(column_type)), WireColumn::array_of)(input)
}

fn tuple_type(input: &str) -> IResult<&str, WireColumn> {
    map(
        preceded(
            tag_no_case("tuple"),
            parens(separated_list1(pair(multispace0, char(',')), column_type)),
        ),
        WireColumn::tuple_of,
    )(input)
}

/// `Decimal`, `Decimal(p)`, `Decimal(p, s)` and the `NUMERIC` spellings.
fn decimal(input: &str) -> IResult<&str, WireColumn> {
    let (input, _) = alt((tag_no_case("decimal"), tag_no_case("numeric")))(input)?;
    let (input, args) = opt(parens(pair(
        number,
        opt(preceded(pair(multispace0, char(',')), number)),
    )))(input)?;

    let (precision, scale) = match args {
        Some((precision, scale)) => (precision, scale.unwrap_or(0)),
        None => (DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE),
    };
    Ok((input, WireColumn::decimal(precision, scale)))
}

/// `DateTime64(p)` or `DateTime64(p, 'Zone')`; the zone is ignored.
fn datetime64(input: &str) -> IResult<&str, WireColumn> {
    let (input, _) = tag_no_case("datetime64")(input)?;
    let (input, digits) = opt(parens(tuple((
        number,
        opt(preceded(char(','), take_till(|c: char| c == ')'))),
    ))))(input)?;

    let mut column = WireColumn::of(ColumnKind::Timestamp);
    column.scale = digits.map(|(precision, _)| precision);
    Ok((input, column))
}

/// One or more words resolved through the alias table. Stops before a
/// `null` / `not null` suffix.
fn scalar(input: &str) -> IResult<&str, WireColumn> {
    let mut words: Vec<&str> = Vec::new();
    let mut rest = input;
    loop {
        let (after_space, _) = multispace0(rest)?;
        let Ok((after, word)) = identifier(after_space) else {
            break;
        };
        let is_suffix = word.eq_ignore_ascii_case("null") || word.eq_ignore_ascii_case("not");
        if !words.is_empty() && is_suffix {
            break;
        }
        words.push(word);
        rest = after;
    }

    if words.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Alpha,
        )));
    }
    let kind = ColumnKind::from_alias(&words.join(" ")).unwrap_or(ColumnKind::Unknown);
    Ok((rest, WireColumn::of(kind)))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// `Some(true)` for `null`, `Some(false)` for `not null`.
fn null_suffix(input: &str) -> IResult<&str, Option<bool>> {
    opt(preceded(
        multispace0,
        alt((
            value(
                false,
                tuple((tag_no_case("not"), multispace1, tag_no_case("null"))),
            ),
            value(true, tag_no_case("null")),
        )),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> WireColumn {
        WireColumn::parse("c", raw)
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse("Int32").kind, ColumnKind::Integer);
        assert_eq!(parse("integer").kind, ColumnKind::Integer);
        assert_eq!(parse("double precision").kind, ColumnKind::Double);
        assert_eq!(parse("String").kind, ColumnKind::Text);
        assert_eq!(parse("Something(1)").kind, ColumnKind::Unknown);
        assert_eq!(parse("geography").kind, ColumnKind::Unknown);
        assert_eq!(parse("NULL").kind, ColumnKind::Nothing);
    }

    #[test]
    fn test_nullable_wrapper() {
        let column = parse("Nullable(Int64)");
        assert_eq!(column.kind, ColumnKind::BigInt);
        assert!(column.nullable);
        assert!(!parse("Int64").nullable);
    }

    #[test]
    fn test_null_suffix() {
        let column = parse("text null");
        assert_eq!(column.kind, ColumnKind::Text);
        assert!(column.nullable);

        let column = parse("double precision not null");
        assert_eq!(column.kind, ColumnKind::Double);
        assert!(!column.nullable);
    }

    #[test]
    fn test_decimal() {
        let column = parse("Decimal(38, 9)");
        assert_eq!(column.kind, ColumnKind::Decimal);
        assert_eq!((column.precision, column.scale), (Some(38), Some(9)));

        let column = parse("numeric(10,2) null");
        assert_eq!((column.precision, column.scale), (Some(10), Some(2)));
        assert!(column.nullable);

        let column = parse("NUMERIC");
        assert_eq!(column.type_name(), "DECIMAL(38,0)");

        let column = parse("Decimal(12)");
        assert_eq!((column.precision, column.scale), (Some(12), Some(0)));
    }

    #[test]
    fn test_nested_arrays() {
        let column = parse("Array(Array(Nullable(Int32)))");
        assert_eq!(column.kind, ColumnKind::Array);
        assert_eq!(column.array_depth(), 2);
        assert_eq!(column.base_kind(), ColumnKind::Integer);
        assert_eq!(column.type_name(), "ARRAY(ARRAY(INTEGER))");
        let inner = column.element.as_ref().and_then(|e| e.element.as_ref()).unwrap();
        assert!(inner.nullable);

        let column = parse("array(array(int null) null) null");
        assert_eq!(column.array_depth(), 2);
        assert!(column.nullable);
    }

    #[test]
    fn test_tuple() {
        let column = parse("Tuple(Int32, Nullable(String), Array(Float64))");
        assert_eq!(column.kind, ColumnKind::Tuple);
        assert_eq!(column.fields.len(), 3);
        assert!(column.fields[1].nullable);
        assert_eq!(column.type_name(), "TUPLE(INTEGER, TEXT, ARRAY(DOUBLE PRECISION))");
    }

    #[test]
    fn test_datetime64() {
        let column = parse("DateTime64(6)");
        assert_eq!(column.kind, ColumnKind::Timestamp);
        assert_eq!(column.scale, Some(6));

        let column = parse("DateTime64(3, 'Europe/Berlin')");
        assert_eq!(column.scale, Some(3));

        assert_eq!(parse("DateTime").kind, ColumnKind::Timestamp);
    }
}
