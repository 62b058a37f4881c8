//! GFM table recognition. A table opens when the line under a would-be
//! paragraph is a delimiter row with the same column count as the
//! paragraph's last line; body rows then continue the table directly.

use crate::arena_tree::NodeId;
use crate::nodes::{make_block, NodeValue, TableAlignment};
use crate::parser::Parser;
use crate::strings::trim;

pub(crate) fn try_opening_block(
    parser: &mut Parser,
    container: NodeId,
    line: &[u8],
) -> Option<NodeId> {
    let aligns = match parser.tree[container].value {
        NodeValue::Paragraph => None,
        NodeValue::Table(ref aligns) => Some(aligns.clone()),
        _ => return None,
    };

    match aligns {
        None => try_opening_header(parser, container, line),
        Some(aligns) => try_opening_row(parser, container, &aligns, line),
    }
}

fn try_opening_header(
    parser: &mut Parser,
    container: NodeId,
    line: &[u8],
) -> Option<NodeId> {
    let aligns = delimiter_row(&line[parser.first_nonspace..])?;

    // The header is the last line the paragraph has accumulated so far.
    let (header_start, header_line) = {
        let content = &parser.tree[container].content;
        let trimmed = match content.last() {
            Some(b'\n') => &content[..content.len() - 1],
            _ => &content[..],
        };
        let start = match trimmed.iter().rposition(|&b| b == b'\n') {
            Some(ix) => ix + 1,
            None => 0,
        };
        (start, trimmed[start..].to_vec())
    };

    let header_row = row(&header_line)?;
    if header_row.len() != aligns.len() {
        return None;
    }

    log::debug!(
        "table opened with {} columns at line {}",
        aligns.len(),
        parser.line_number
    );

    let table = parser
        .tree
        .alloc(make_block(NodeValue::Table(aligns.clone())));
    parser.tree.insert_after(container, table);

    if header_start == 0 {
        // The paragraph was only ever the header line.
        parser.tree.detach(container);
    } else {
        parser.tree[container].content.truncate(header_start);
    }

    let header = parser.add_child(table, NodeValue::TableRow(true));
    for (i, cell_text) in header_row.into_iter().enumerate() {
        let cell = parser.add_child(header, NodeValue::TableCell(aligns[i]));
        parser.tree[cell].content = cell_text;
    }

    let adv = line.len() - 1 - parser.offset;
    parser.advance_offset(line, adv, false);

    Some(table)
}

fn try_opening_row(
    parser: &mut Parser,
    container: NodeId,
    aligns: &[TableAlignment],
    line: &[u8],
) -> Option<NodeId> {
    if parser.blank {
        return None;
    }

    let this_row = row(&line[parser.first_nonspace..])?;
    let new_row = parser.add_child(container, NodeValue::TableRow(false));

    for i in 0..aligns.len() {
        let cell = parser.add_child(new_row, NodeValue::TableCell(aligns[i]));
        if let Some(text) = this_row.get(i) {
            parser.tree[cell].content = text.clone();
        }
    }

    let adv = line.len() - 1 - parser.offset;
    parser.advance_offset(line, adv, false);

    Some(new_row)
}

/// Parses a delimiter row (`| :-- | --: |` and friends) into column
/// alignments.
fn delimiter_row(line: &[u8]) -> Option<Vec<TableAlignment>> {
    let cells = row(line)?;
    let mut aligns = Vec::with_capacity(cells.len());

    for cell in &cells {
        if cell.is_empty() {
            return None;
        }
        let left = cell[0] == b':';
        let right = cell[cell.len() - 1] == b':';
        let dashes = &cell[left as usize..cell.len() - right as usize];
        if dashes.is_empty() || dashes.iter().any(|&b| b != b'-') {
            return None;
        }
        aligns.push(if left && right {
            TableAlignment::Center
        } else if left {
            TableAlignment::Left
        } else if right {
            TableAlignment::Right
        } else {
            TableAlignment::None
        });
    }

    Some(aligns)
}

/// Splits a line into trimmed cell texts on unescaped pipes. The whole
/// line must be consumed for the row to count.
fn row(line: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut end = line.len();
    while end > 0 && crate::strings::is_line_end_char(line[end - 1]) {
        end -= 1;
    }
    let line = &line[..end];
    if line.is_empty() {
        return None;
    }

    let mut v = vec![];
    let mut cell: Vec<u8> = vec![];
    let mut offset = 0;
    let mut seen_pipe = false;

    if line[0] == b'|' {
        offset = 1;
        seen_pipe = true;
    }

    let mut i = offset;
    while i < line.len() {
        match line[i] {
            b'\\' if i + 1 < line.len() => {
                // `\|` yields a literal pipe inside the cell; any other
                // escape passes through for the inline parser.
                if line[i + 1] == b'|' {
                    cell.push(b'|');
                } else {
                    cell.push(b'\\');
                    cell.push(line[i + 1]);
                }
                i += 2;
            }
            b'|' => {
                seen_pipe = true;
                trim(&mut cell);
                v.push(std::mem::take(&mut cell));
                i += 1;
            }
            c => {
                cell.push(c);
                i += 1;
            }
        }
    }

    if !cell.iter().all(|&b| b == b' ' || b == b'\t') || v.is_empty() {
        trim(&mut cell);
        v.push(cell);
    }

    if !seen_pipe || v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// Whether a line continues an open table (parses as a row).
pub(crate) fn matches(line: &[u8]) -> bool {
    row(line).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_split_on_unescaped_pipes() {
        assert_eq!(
            row(b"| a | b |\n"),
            Some(vec![b"a".to_vec(), b"b".to_vec()])
        );
        assert_eq!(
            row(b"a|b\n"),
            Some(vec![b"a".to_vec(), b"b".to_vec()])
        );
        assert_eq!(
            row(b"| a \\| b |\n"),
            Some(vec![b"a | b".to_vec()])
        );
        assert_eq!(row(b"plain text\n"), None);
    }

    #[test]
    fn delimiter_rows() {
        assert_eq!(
            delimiter_row(b"|:-|-:|\n"),
            Some(vec![TableAlignment::Left, TableAlignment::Right])
        );
        assert_eq!(
            delimiter_row(b"| :-: | --- |\n"),
            Some(vec![TableAlignment::Center, TableAlignment::None])
        );
        assert_eq!(delimiter_row(b"| a | b |\n"), None);
    }
}
