//! Document emission.
//!
//! Two output forms.  The archive form writes each document as a length-
//! prefixed data record, optionally preceded by a header record carrying
//! the document number; because the byte length comes first, no delimiter
//! can be confused with content.  The tab-separated form writes one
//! document per line.  Both walk the finished occurrence array start to
//! finish, substituting each rank with its representation.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::displaylevel;
use crate::posting::Posting;
use crate::termrep::TermRepTable;

/// Which output format a path selects: `.tsv` / `.TSV` for tab-separated,
/// anything else for the archive form.
pub fn is_tsv_output(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("tsv") | Some("TSV")
    )
}

/// Write the corpus in archive form.  Returns the number of documents
/// written.
pub fn write_archive(
    path: &Path,
    occurrences: &[Posting],
    table: &TermRepTable,
    include_docnums: bool,
) -> Result<u64> {
    let file =
        File::create(path).with_context(|| format!("can't open {} for writing", path.display()))?;
    let mut out = BufWriter::new(file);

    let mut doc_buffer: Vec<u8> = Vec::with_capacity(1 << 16);
    let mut docs_written = 0u64;

    for (p, posting) in occurrences.iter().enumerate() {
        if !doc_buffer.is_empty() {
            doc_buffer.push(b' ');
        }
        doc_buffer.extend_from_slice(table.term(posting.rank()));

        if posting.is_final() || p == occurrences.len() - 1 {
            if include_docnums {
                let header = format!("Doc{docs_written:08}");
                write!(out, " {}H ", header.len())?;
                out.write_all(header.as_bytes())?;
            }
            doc_buffer.push(b'\n');
            write!(out, " {}D ", doc_buffer.len())?;
            out.write_all(&doc_buffer)?;
            doc_buffer.clear();
            docs_written += 1;
        }
    }

    out.flush().context("flush failed")?;
    displaylevel!(2, "{} documents written to {}\n", docs_written, path.display());
    Ok(docs_written)
}

/// Write the corpus in tab-separated form: words space-separated, each
/// line closed with a static weight column and, optionally, a document
/// number column.  Returns the number of documents written.
pub fn write_tsv(
    path: &Path,
    occurrences: &[Posting],
    table: &TermRepTable,
    include_docnums: bool,
) -> Result<u64> {
    let file =
        File::create(path).with_context(|| format!("can't open {} for writing", path.display()))?;
    let mut out = BufWriter::new(file);

    let mut docs_written = 0u64;
    let mut at_line_start = true;

    for (p, posting) in occurrences.iter().enumerate() {
        if !at_line_start {
            out.write_all(b" ")?;
        }
        out.write_all(table.term(posting.rank()))?;
        at_line_start = false;

        if posting.is_final() || p == occurrences.len() - 1 {
            if include_docnums {
                writeln!(out, "\t1\tDoc{docs_written}")?;
            } else {
                out.write_all(b"\t1\n")?;
            }
            docs_written += 1;
            at_line_start = true;
        }
    }

    out.flush().context("flush failed")?;
    displaylevel!(2, "{} documents written to {}\n", docs_written, path.display());
    Ok(docs_written)
}
