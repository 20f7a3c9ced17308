//! HTML rendering of a validated batch.
//!
//! Highlighting is a presentation aid derived from the structured error
//! state (status columns and cell flags). It is never computed
//! independently and never the sole carrier of error state.

use crate::field::FieldName;
use crate::record::{Record, RowStatus};
use crate::table::column_header;
use std::fmt::Write;

/// Renders a batch as a standalone HTML table with flagged cells
/// highlighted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    /// Create a new renderer.
    #[inline]
    #[must_use = "creates a renderer instance"]
    pub const fn new() -> Self {
        Self
    }

    /// Render the batch to an HTML document.
    #[must_use = "returns the rendered HTML"]
    pub fn render(&self, records: &[Record]) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <style>\n\
             table { border-collapse: collapse; font-family: sans-serif; font-size: 12px; }\n\
             th, td { border: 1px solid #999; padding: 2px 6px; }\n\
             td.error { background: #ff0000; color: #fff; }\n\
             </style>\n</head>\n<body>\n<table>\n<tr>",
        );

        for column in column_header() {
            let _ = write!(html, "<th>{}</th>", escape(&column));
        }
        html.push_str("</tr>\n");

        for record in records {
            html.push_str("<tr>");
            let _ = write!(html, "<td>{}</td>", escape(&record.image));
            for field in FieldName::ALL {
                let class = if cell_is_error(record, field) {
                    " class=\"error\""
                } else {
                    ""
                };
                let _ = write!(html, "<td{class}>{}</td>", escape(record.get(field)));
            }
            let _ = write!(html, "<td>{}</td>", record.blad_status);
            let rev_class = if record.rev_status == RowStatus::Error {
                " class=\"error\""
            } else {
                ""
            };
            let _ = write!(html, "<td{rev_class}>{}</td>", escape(&record.final_rev));
            let _ = write!(html, "<td>{}</td>", escape(&record.rev_date));
            let _ = write!(html, "<td>{}</td>", record.rev_status);
            html.push_str("</tr>\n");
        }

        html.push_str("</table>\n</body>\n</html>\n");
        html
    }
}

/// Whether a cell renders highlighted: its field is flagged, or it is one
/// of the revision columns on a revision-inconsistent row, or the sheet
/// column on a sheet-mismatched row.
fn cell_is_error(record: &Record, field: FieldName) -> bool {
    if record.is_flagged(field) {
        return true;
    }
    match field {
        FieldName::Andr => record.rev_status == RowStatus::Error,
        FieldName::Blad => record.blad_status == RowStatus::Error,
        _ => false,
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
