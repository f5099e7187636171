use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{char, none_of},
    combinator::{map, opt, value},
    multi::{many0, separated_list1},
    sequence::delimited,
    IResult, Parser,
};

use crate::error::DivebombError;
use crate::preprocess::table::{Column, RawTable};

/// Parse delimited text (header row, then one row per sample) into a table.
///
/// Fields may be double-quoted, with `""` standing for a literal quote.
/// Blank lines are skipped. Every row must have as many fields as the header.
pub fn read_delimited(input: &str, delimiter: char) -> Result<RawTable, DivebombError> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_line, header) = lines.next().ok_or(DivebombError::Parse {
        line: 1,
        message: "missing header row".to_string(),
    })?;
    let names: Vec<String> = parse_line(header, header_line, delimiter)?
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    for (line_number, line) in lines {
        let fields = parse_line(line, line_number, delimiter)?;
        if fields.len() != names.len() {
            return Err(DivebombError::Parse {
                line: line_number,
                message: format!("expected {} fields, found {}", names.len(), fields.len()),
            });
        }
        for (column, field) in cells.iter_mut().zip(fields) {
            column.push(field);
        }
    }

    names
        .into_iter()
        .zip(cells)
        .try_fold(RawTable::new(), |table, (name, column)| {
            table.with_column(name, Column::infer(column))
        })
}

fn parse_line(line: &str, line_number: usize, delimiter: char) -> Result<Vec<String>, DivebombError> {
    match fields(line, delimiter) {
        Ok(("", parsed)) => Ok(parsed),
        Ok((remaining, _)) => Err(DivebombError::Parse {
            line: line_number,
            message: format!("unexpected characters: '{}'", remaining),
        }),
        Err(e) => Err(DivebombError::Parse {
            line: line_number,
            message: format!("parse error: {:?}", e),
        }),
    }
}

fn fields(input: &str, delimiter: char) -> IResult<&str, Vec<String>> {
    separated_list1(char(delimiter), |i| field(i, delimiter)).parse(input)
}

fn field(input: &str, delimiter: char) -> IResult<&str, String> {
    alt((quoted_field, |i| bare_field(i, delimiter))).parse(input)
}

fn quoted_field(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('"'),
            many0(alt((value('"', tag("\"\"")), none_of("\"")))),
            char('"'),
        ),
        |chars: Vec<char>| chars.into_iter().collect(),
    )
    .parse(input)
}

fn bare_field(input: &str, delimiter: char) -> IResult<&str, String> {
    let stop: String = [delimiter, '"'].into_iter().collect();
    let result = map(opt(is_not(stop.as_str())), |s: Option<&str>| {
        s.unwrap_or("").to_string()
    })
    .parse(input);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_numeric_table() {
        let table = read_delimited("time,depth\n0,0.0\n1,2.5\n2,5.0\n", ',').unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            table.column("depth"),
            Some(&Column::Numeric(vec![0.0, 2.5, 5.0]))
        );
    }

    #[test]
    fn test_read_quoted_and_text() {
        let input = "\"Time, UTC\",depth\r\n\"2023-06-01 12:00:00\",1\n\"2023-06-01 12:00:01\",\"2\"\n";
        let table = read_delimited(input, ',').unwrap();
        assert_eq!(table.column_names()[0], "Time, UTC");
        assert!(matches!(table.column("Time, UTC"), Some(Column::Text(_))));
        assert_eq!(table.column("depth"), Some(&Column::Numeric(vec![1.0, 2.0])));
    }

    #[test]
    fn test_escaped_quotes() {
        assert_eq!(
            parse_line("\"say \"\"hi\"\"\",2", 1, ',').unwrap(),
            vec!["say \"hi\"".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn test_bare_field_stops_at_delimiter() {
        assert_eq!(bare_field("12.5;3", ';'), Ok((";3", "12.5".to_string())));
        assert_eq!(bare_field("ab\"c", ','), Ok(("\"c", "ab".to_string())));
        assert_eq!(bare_field(",x", ','), Ok((",x", String::new())));
    }

    #[test]
    fn test_other_delimiter_and_empty_fields() {
        let table = read_delimited("time;depth;note\n0;1;\n\n1;;x\n", ';').unwrap();
        assert_eq!(table.row_count(), 2);
        match table.column("depth") {
            Some(Column::Numeric(values)) => {
                assert_eq!(values[0], 1.0);
                assert!(values[1].is_nan());
            }
            other => panic!("expected numeric depth, got {other:?}"),
        }
    }

    #[test]
    fn test_field_count_mismatch() {
        let err = read_delimited("time,depth\n0,1\n1,2,3\n", ',').unwrap_err();
        assert_eq!(
            err,
            DivebombError::Parse {
                line: 3,
                message: "expected 2 fields, found 3".to_string()
            }
        );
    }

    #[test]
    fn test_unterminated_quote() {
        let err = read_delimited("time,depth\n\"0,1\n", ',').unwrap_err();
        assert!(matches!(err, DivebombError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            read_delimited("\n\n", ','),
            Err(DivebombError::Parse { line: 1, .. })
        ));
    }
}
